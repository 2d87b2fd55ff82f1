//! The state shared by the exchanges of one client process.

use crate::{
    builder::MessageBuilder,
    config::{ConfigManager, Settings},
    storage::Storage,
    transport::Transport,
};

/// Everything an exchange needs besides its own state.
///
/// Passed explicitly into every transition, so several exchanges on different
/// interfaces can share one lease database.
pub struct Context<C, L, T> {
    pub config: C,
    pub leases: L,
    pub transport: T,
    pub settings: Settings,
}

impl<C, L, T> Context<C, L, T>
where
    C: ConfigManager,
    L: Storage,
    T: Transport,
{
    pub fn new(config: C, leases: L, transport: T, settings: Settings) -> Self {
        Context {
            config,
            leases,
            transport,
            settings,
        }
    }

    pub fn builder(&self) -> MessageBuilder {
        MessageBuilder::new(&self.settings.duid, self.settings.authentication.as_deref())
    }
}
