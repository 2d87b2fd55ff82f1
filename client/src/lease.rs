//! Client-side lease records.

use std::net::Ipv6Addr;

use chrono::prelude::*;

use dhcpv6_protocol::{DhcpOption, Duid, IaAddress, IaPrefix};

use crate::config::IaKind;

/// A leased address or a delegated prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub address: Ipv6Addr,
    /// `Some` for delegated prefixes.
    pub prefix_length: Option<u8>,
    pub preferred_lifetime: u32,
    pub valid_lifetime: u32,
}

impl Lease {
    /// Converts an `IAADDR` or `IAPREFIX` option.
    pub fn from_option(option: &DhcpOption) -> Option<Self> {
        match option {
            DhcpOption::IaAddr(address) => Some(Lease {
                address: address.address,
                prefix_length: None,
                preferred_lifetime: address.preferred_lifetime,
                valid_lifetime: address.valid_lifetime,
            }),
            DhcpOption::IaPrefix(prefix) => Some(Lease {
                address: prefix.prefix,
                prefix_length: Some(prefix.prefix_length),
                preferred_lifetime: prefix.preferred_lifetime,
                valid_lifetime: prefix.valid_lifetime,
            }),
            _ => None,
        }
    }

    pub fn to_option(&self) -> DhcpOption {
        match self.prefix_length {
            Some(prefix_length) => DhcpOption::IaPrefix(IaPrefix {
                preferred_lifetime: self.preferred_lifetime,
                valid_lifetime: self.valid_lifetime,
                prefix_length,
                prefix: self.address,
            }),
            None => DhcpOption::IaAddr(IaAddress {
                address: self.address,
                preferred_lifetime: self.preferred_lifetime,
                valid_lifetime: self.valid_lifetime,
            }),
        }
    }
}

/// An identity association record of the client lease database.
#[derive(Debug, Clone)]
pub struct LeaseIa {
    kind: IaKind,
    iaid: u32,
    leases: Vec<Lease>,
    /// The server which assigned the leases.
    server: Option<Duid>,
    /// The address the server accepts unicast messages for this IA on.
    unicast: Option<Ipv6Addr>,
    updated_at: i64,
}

impl LeaseIa {
    /// Creates an empty record.
    pub fn new(kind: IaKind, iaid: u32) -> Self {
        LeaseIa {
            kind,
            iaid,
            leases: Vec::new(),
            server: None,
            unicast: None,
            updated_at: 0,
        }
    }

    pub fn kind(&self) -> IaKind {
        self.kind
    }

    pub fn iaid(&self) -> u32 {
        self.iaid
    }

    pub fn leases(&self) -> &[Lease] {
        self.leases.as_slice()
    }

    pub fn server(&self) -> Option<&Duid> {
        self.server.as_ref()
    }

    pub fn unicast(&self) -> Option<Ipv6Addr> {
        self.unicast
    }

    pub fn set_unicast(&mut self, unicast: Option<Ipv6Addr>) {
        self.unicast = unicast;
    }

    /// Replaces the whole lease set at once.
    ///
    /// Records the update time.
    pub fn replace(&mut self, server: Option<Duid>, leases: Vec<Lease>) {
        self.server = server;
        self.leases = leases;
        self.updated_at = Utc::now().timestamp();
    }

    /// The Unix timestamp of the last `replace`, 0 if never updated.
    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_swaps_all_leases() {
        let mut ia = LeaseIa::new(IaKind::Na, 1);
        let lease = |last: u16| Lease {
            address: Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, last),
            prefix_length: None,
            preferred_lifetime: 100,
            valid_lifetime: 200,
        };

        ia.replace(None, vec![lease(1), lease(2)]);
        ia.replace(Some(Duid::new(vec![1])), vec![lease(3)]);

        assert_eq!(ia.leases(), &[lease(3)]);
        assert_eq!(ia.server(), Some(&Duid::new(vec![1])));
        assert!(ia.updated_at() > 0);
    }

    #[test]
    fn prefix_lease_becomes_iaprefix() {
        let lease = Lease {
            address: "2001:db8:100::".parse().unwrap(),
            prefix_length: Some(56),
            preferred_lifetime: 1,
            valid_lifetime: 2,
        };
        let option = lease.to_option();
        assert_eq!(option.code(), dhcpv6_protocol::OptionCode::IaPrefix);
        assert_eq!(Lease::from_option(&option), Some(lease));
        assert_eq!(Lease::from_option(&DhcpOption::RapidCommit), None);
    }
}
