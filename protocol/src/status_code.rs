//! DHCPv6 status code module.

use std::fmt;

/// The `STATUS_CODE` option values (RFC 3315 §24.4, RFC 3633 §15).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Success,
    UnspecFail,
    NoAddrsAvail,
    NoBinding,
    NotOnLink,
    UseMulticast,
    NoPrefixAvail,
    Unknown(u16),
}

impl StatusCode {
    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::StatusCode::*;
        match self {
            Success => write!(f, "Success"),
            UnspecFail => write!(f, "UnspecFail"),
            NoAddrsAvail => write!(f, "NoAddrsAvail"),
            NoBinding => write!(f, "NoBinding"),
            NotOnLink => write!(f, "NotOnLink"),
            UseMulticast => write!(f, "UseMulticast"),
            NoPrefixAvail => write!(f, "NoPrefixAvail"),
            Unknown(code) => write!(f, "Unknown({})", code),
        }
    }
}

impl From<u16> for StatusCode {
    fn from(value: u16) -> Self {
        use self::StatusCode::*;
        match value {
            0 => Success,
            1 => UnspecFail,
            2 => NoAddrsAvail,
            3 => NoBinding,
            4 => NotOnLink,
            5 => UseMulticast,
            6 => NoPrefixAvail,
            code => Unknown(code),
        }
    }
}

impl From<StatusCode> for u16 {
    fn from(value: StatusCode) -> Self {
        use self::StatusCode::*;
        match value {
            Success => 0,
            UnspecFail => 1,
            NoAddrsAvail => 2,
            NoBinding => 3,
            NotOnLink => 4,
            UseMulticast => 5,
            NoPrefixAvail => 6,
            Unknown(code) => code,
        }
    }
}
