//! A RAM implementation of the client lease database.
//! (well, not persistent)

use std::collections::HashMap;

use crate::{config::IaKind, error::Error, lease::LeaseIa, storage::Storage};

#[derive(Debug, Default)]
pub struct RamStorage {
    /// `(kind, IAID)` to record mapping.
    ias: HashMap<(IaKind, u32), LeaseIa>,
}

impl RamStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ias.is_empty()
    }
}

impl Storage for RamStorage {
    fn get_ia(&self, kind: IaKind, iaid: u32) -> Result<Option<LeaseIa>, Error> {
        Ok(self.ias.get(&(kind, iaid)).cloned())
    }

    fn add_ia(&mut self, ia: LeaseIa) -> Result<(), Error> {
        let key = (ia.kind(), ia.iaid());
        if self.ias.contains_key(&key) {
            return Err(Error::Storage(format!(
                "{} with IAID {} already exists",
                ia.kind().code(),
                ia.iaid()
            )));
        }
        self.ias.insert(key, ia);
        Ok(())
    }

    fn update_ia(
        &mut self,
        kind: IaKind,
        iaid: u32,
        action: &mut dyn FnMut(&mut LeaseIa),
    ) -> Result<bool, Error> {
        match self.ias.get_mut(&(kind, iaid)) {
            Some(ia) => {
                action(ia);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_ia(&mut self, kind: IaKind, iaid: u32) -> Result<(), Error> {
        self.ias.remove(&(kind, iaid));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use super::*;

    #[test]
    fn update_reports_missing_records() {
        let mut storage = RamStorage::new();
        storage.add_ia(LeaseIa::new(IaKind::Na, 5)).unwrap();

        let address: Ipv6Addr = "2001:db8::5".parse().unwrap();
        assert!(storage
            .update_ia(IaKind::Na, 5, &mut |ia: &mut LeaseIa| ia.set_unicast(Some(address)))
            .unwrap());
        assert!(!storage
            .update_ia(IaKind::Pd, 5, &mut |ia: &mut LeaseIa| ia.set_unicast(Some(address)))
            .unwrap());

        let ia = storage.get_ia(IaKind::Na, 5).unwrap().unwrap();
        assert_eq!(ia.unicast(), Some(address));
        assert!(storage.get_ia(IaKind::Pd, 5).unwrap().is_none());

        storage.delete_ia(IaKind::Na, 5).unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn add_refuses_existing_records() {
        let mut storage = RamStorage::new();
        storage.add_ia(LeaseIa::new(IaKind::Ta, 3)).unwrap();
        storage.add_ia(LeaseIa::new(IaKind::Pd, 3)).unwrap();

        match storage.add_ia(LeaseIa::new(IaKind::Ta, 3)) {
            Err(Error::Storage(message)) => assert!(message.contains("IAID 3")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(storage.len(), 2);
    }
}
