//! Client configuration.
//!
//! Values are supplied by the embedding application; nothing is read from files here.

use eui48::MacAddress;

use dhcpv6_protocol::{Duid, OptionCode};

use crate::backoff::Timing;

/// The kind of an identity association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IaKind {
    /// `IA_NA`, non-temporary addresses.
    Na,
    /// `IA_TA`, temporary addresses.
    Ta,
    /// `IA_PD`, delegated prefixes.
    Pd,
}

impl IaKind {
    pub fn from_code(code: OptionCode) -> Option<Self> {
        match code {
            OptionCode::IaNa => Some(IaKind::Na),
            OptionCode::IaTa => Some(IaKind::Ta),
            OptionCode::IaPd => Some(IaKind::Pd),
            _ => None,
        }
    }

    /// The option code of the identity association itself.
    pub fn code(self) -> OptionCode {
        match self {
            IaKind::Na => OptionCode::IaNa,
            IaKind::Ta => OptionCode::IaTa,
            IaKind::Pd => OptionCode::IaPd,
        }
    }

    /// The option code of the leases the identity association carries.
    pub fn lease_code(self) -> OptionCode {
        match self {
            IaKind::Na | IaKind::Ta => OptionCode::IaAddr,
            IaKind::Pd => OptionCode::IaPrefix,
        }
    }
}

/// The configuration state of an identity association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigState {
    NotConfigured,
    Configuring,
    Configured,
    Failed,
}

/// A configured identity association.
#[derive(Debug, Clone)]
pub struct IaConfig {
    pub kind: IaKind,
    pub iaid: u32,
    pub state: ConfigState,
}

/// Per-interface client configuration.
#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    pub index: u32,
    pub name: String,
    /// Whether the client accepts the server unicast option on this interface.
    pub unicast: bool,
    pub ias: Vec<IaConfig>,
}

impl InterfaceConfig {
    pub fn new(index: u32, name: &str) -> Self {
        InterfaceConfig {
            index,
            name: name.to_owned(),
            unicast: false,
            ias: Vec::new(),
        }
    }

    pub fn with_unicast(mut self, unicast: bool) -> Self {
        self.unicast = unicast;
        self
    }

    /// Adds an identity association in `NotConfigured` state.
    pub fn with_ia(mut self, kind: IaKind, iaid: u32) -> Self {
        self.ias.push(IaConfig {
            kind,
            iaid,
            state: ConfigState::NotConfigured,
        });
        self
    }

    pub fn ia(&self, kind: IaKind, iaid: u32) -> Option<&IaConfig> {
        self.ias.iter().find(|ia| ia.kind == kind && ia.iaid == iaid)
    }

    /// Returns `false` if the identity association is not configured on this interface.
    pub fn set_state(&mut self, kind: IaKind, iaid: u32, state: ConfigState) -> bool {
        match self.ias.iter_mut().find(|ia| ia.kind == kind && ia.iaid == iaid) {
            Some(ia) => {
                ia.state = state;
                true
            }
            None => false,
        }
    }
}

/// The interface configuration lookup.
pub trait ConfigManager {
    fn interface(&self, index: u32) -> Option<&InterfaceConfig>;

    fn interface_mut(&mut self, index: u32) -> Option<&mut InterfaceConfig>;
}

/// A configuration built in memory by the application.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    interfaces: Vec<InterfaceConfig>,
}

impl StaticConfig {
    pub fn new(interfaces: Vec<InterfaceConfig>) -> Self {
        StaticConfig { interfaces }
    }
}

impl ConfigManager for StaticConfig {
    fn interface(&self, index: u32) -> Option<&InterfaceConfig> {
        self.interfaces.iter().find(|iface| iface.index == index)
    }

    fn interface_mut(&mut self, index: u32) -> Option<&mut InterfaceConfig> {
        self.interfaces.iter_mut().find(|iface| iface.index == index)
    }
}

/// Process-wide client parameters.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Sent in the `CLIENTID` option.
    pub duid: Duid,
    /// The `AUTH` option payload appended to every REQUEST, if any.
    pub authentication: Option<Vec<u8>>,
    /// Strip addresses from IA_NAs the server reports as `NotOnLink` and re-request
    /// instead of completing the exchange.
    pub strip_not_on_link: bool,
    pub timing: Timing,
}

impl Settings {
    pub fn new(duid: Duid) -> Self {
        Settings {
            duid,
            authentication: None,
            strip_not_on_link: false,
            timing: Timing::request(),
        }
    }

    /// Settings with a `DUID-LL` generated from the hardware address.
    pub fn from_mac(address: &MacAddress) -> Self {
        Self::new(Duid::from_mac(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_set_only_for_configured_ias() {
        let mut config = StaticConfig::new(vec![InterfaceConfig::new(2, "eth0")
            .with_ia(IaKind::Na, 1)
            .with_ia(IaKind::Pd, 1)]);

        let iface = config.interface_mut(2).unwrap();
        assert!(iface.set_state(IaKind::Pd, 1, ConfigState::Configured));
        assert!(!iface.set_state(IaKind::Ta, 1, ConfigState::Configured));

        let iface = config.interface(2).unwrap();
        assert_eq!(iface.ia(IaKind::Na, 1).unwrap().state, ConfigState::NotConfigured);
        assert_eq!(iface.ia(IaKind::Pd, 1).unwrap().state, ConfigState::Configured);
        assert!(config.interface(3).is_none());
    }
}
