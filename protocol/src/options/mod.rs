//! DHCPv6 options module.

mod option_code;
mod tree;

pub use self::{
    option_code::OptionCode,
    tree::{ConsistencyError, OptionId, OptionTree, Parent},
};

use std::{fmt, net::Ipv6Addr};

use crate::{duid::Duid, status_code::StatusCode};

/// `IA_NA` fixed fields. Addresses are carried as `IAADDR` sub-options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IaNa {
    pub iaid: u32,
    pub t1: u32,
    pub t2: u32,
}

/// `IA_TA` fixed fields. Addresses are carried as `IAADDR` sub-options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IaTa {
    pub iaid: u32,
}

/// `IA_PD` fixed fields. Prefixes are carried as `IAPREFIX` sub-options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IaPd {
    pub iaid: u32,
    pub t1: u32,
    pub t2: u32,
}

/// `IAADDR` fixed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IaAddress {
    pub address: Ipv6Addr,
    pub preferred_lifetime: u32,
    pub valid_lifetime: u32,
}

/// `IAPREFIX` fixed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IaPrefix {
    pub preferred_lifetime: u32,
    pub valid_lifetime: u32,
    pub prefix_length: u8,
    pub prefix: Ipv6Addr,
}

/// A single DHCPv6 option payload.
///
/// Sub-options are not stored here: they are the children of the option node
/// in its `OptionTree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhcpOption {
    ClientId(Duid),
    ServerId(Duid),
    IaNa(IaNa),
    IaTa(IaTa),
    IaAddr(IaAddress),
    OptionRequest(Vec<OptionCode>),
    Preference(u8),
    /// Hundredths of a second since the exchange start.
    ElapsedTime(u16),
    Auth(Vec<u8>),
    Unicast(Ipv6Addr),
    StatusCode(StatusCode, String),
    RapidCommit,
    IaPd(IaPd),
    IaPrefix(IaPrefix),
    AaaAuth(Vec<u8>),
    KeyGeneration(Vec<u8>),
    Unknown(u16, Vec<u8>),
}

impl DhcpOption {
    pub fn code(&self) -> OptionCode {
        use self::DhcpOption::*;
        match self {
            ClientId(_) => OptionCode::ClientId,
            ServerId(_) => OptionCode::ServerId,
            IaNa(_) => OptionCode::IaNa,
            IaTa(_) => OptionCode::IaTa,
            IaAddr(_) => OptionCode::IaAddr,
            OptionRequest(_) => OptionCode::OptionRequest,
            Preference(_) => OptionCode::Preference,
            ElapsedTime(_) => OptionCode::ElapsedTime,
            Auth(_) => OptionCode::Auth,
            Unicast(_) => OptionCode::Unicast,
            StatusCode(..) => OptionCode::StatusCode,
            RapidCommit => OptionCode::RapidCommit,
            IaPd(_) => OptionCode::IaPd,
            IaPrefix(_) => OptionCode::IaPrefix,
            AaaAuth(_) => OptionCode::AaaAuth,
            KeyGeneration(_) => OptionCode::KeyGeneration,
            Unknown(code, _) => OptionCode::from(*code),
        }
    }

    /// The IAID of an identity association option.
    pub fn iaid(&self) -> Option<u32> {
        match self {
            DhcpOption::IaNa(ia) => Some(ia.iaid),
            DhcpOption::IaTa(ia) => Some(ia.iaid),
            DhcpOption::IaPd(ia) => Some(ia.iaid),
            _ => None,
        }
    }
}

impl fmt::Display for DhcpOption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::DhcpOption::*;
        match self {
            ClientId(duid) | ServerId(duid) => write!(f, "{}", duid),
            IaNa(ia) => write!(f, "iaid={} t1={} t2={}", ia.iaid, ia.t1, ia.t2),
            IaTa(ia) => write!(f, "iaid={}", ia.iaid),
            IaPd(ia) => write!(f, "iaid={} t1={} t2={}", ia.iaid, ia.t1, ia.t2),
            IaAddr(address) => write!(
                f,
                "{} pref={} valid={}",
                address.address, address.preferred_lifetime, address.valid_lifetime
            ),
            IaPrefix(prefix) => write!(
                f,
                "{}/{} pref={} valid={}",
                prefix.prefix,
                prefix.prefix_length,
                prefix.preferred_lifetime,
                prefix.valid_lifetime
            ),
            OptionRequest(codes) => {
                for (i, code) in codes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", code)?;
                }
                Ok(())
            }
            Preference(value) => write!(f, "{}", value),
            ElapsedTime(value) => write!(f, "{}ms", u32::from(*value) * 10),
            Unicast(address) => write!(f, "{}", address),
            StatusCode(code, message) => write!(f, "{} {:?}", code, message),
            RapidCommit => Ok(()),
            Auth(data) | AaaAuth(data) | KeyGeneration(data) | Unknown(_, data) => {
                write!(f, "{} byte(s)", data.len())
            }
        }
    }
}
