//! The client lease database interface.

use crate::{config::IaKind, error::Error, lease::LeaseIa};

/// Persistent or volatile storage of the client's identity associations.
///
/// Records are keyed by the IA kind and IAID.
pub trait Storage {
    fn get_ia(&self, kind: IaKind, iaid: u32) -> Result<Option<LeaseIa>, Error>;

    fn add_ia(&mut self, ia: LeaseIa) -> Result<(), Error>;

    /// Applies `action` to the record in place.
    ///
    /// Returns `false` if there is no such record.
    fn update_ia(
        &mut self,
        kind: IaKind,
        iaid: u32,
        action: &mut dyn FnMut(&mut LeaseIa),
    ) -> Result<bool, Error>;

    fn delete_ia(&mut self, kind: IaKind, iaid: u32) -> Result<(), Error>;
}
