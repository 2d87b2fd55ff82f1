//! DHCPv6 option codes module.

use std::fmt;

/// DHCPv6 option codes.
///
/// [RFC 3315 §22](https://tools.ietf.org/html/rfc3315#section-22)
/// [RFC 3633 §9](https://tools.ietf.org/html/rfc3633#section-9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionCode {
    ClientId,
    ServerId,
    IaNa,
    IaTa,
    IaAddr,
    OptionRequest,
    Preference,
    ElapsedTime,
    RelayMessage,
    Auth,
    Unicast,
    StatusCode,
    RapidCommit,
    IaPd,
    IaPrefix,
    /*
    Site-specific range, used for the AAA authentication extension
    */
    AaaAuth,
    KeyGeneration,

    Unknown(u16),
}

impl OptionCode {
    /// Identity association options are keyed by their IAID within a message.
    pub fn is_identity_association(self) -> bool {
        match self {
            OptionCode::IaNa | OptionCode::IaTa | OptionCode::IaPd => true,
            _ => false,
        }
    }

    /// An address or a delegated prefix, carried by an identity association.
    pub fn is_lease(self) -> bool {
        match self {
            OptionCode::IaAddr | OptionCode::IaPrefix => true,
            _ => false,
        }
    }

    /// Only these options are allowed to own sub-options.
    pub fn is_container(self) -> bool {
        self.is_identity_association() || self.is_lease()
    }

    /// Whether an option may be a direct child of an `owner` option,
    /// `None` standing for the message itself.
    ///
    /// Identity associations are top-level only and leases live in the
    /// matching identity association, so a message is at most 3 levels deep.
    pub fn may_be_owned_by(self, owner: Option<OptionCode>) -> bool {
        match owner {
            None => !self.is_lease(),
            Some(owner) if !owner.is_container() => false,
            Some(_) if self.is_identity_association() => false,
            Some(owner) => match self {
                OptionCode::IaAddr => owner == OptionCode::IaNa || owner == OptionCode::IaTa,
                OptionCode::IaPrefix => owner == OptionCode::IaPd,
                _ => true,
            },
        }
    }
}

impl From<u16> for OptionCode {
    fn from(value: u16) -> Self {
        use self::OptionCode::*;
        match value {
            1 => ClientId,
            2 => ServerId,
            3 => IaNa,
            4 => IaTa,
            5 => IaAddr,
            6 => OptionRequest,
            7 => Preference,
            8 => ElapsedTime,
            9 => RelayMessage,
            11 => Auth,
            12 => Unicast,
            13 => StatusCode,
            14 => RapidCommit,
            25 => IaPd,
            26 => IaPrefix,
            240 => AaaAuth,
            241 => KeyGeneration,

            code => Unknown(code),
        }
    }
}

impl From<OptionCode> for u16 {
    fn from(value: OptionCode) -> Self {
        use self::OptionCode::*;
        match value {
            ClientId => 1,
            ServerId => 2,
            IaNa => 3,
            IaTa => 4,
            IaAddr => 5,
            OptionRequest => 6,
            Preference => 7,
            ElapsedTime => 8,
            RelayMessage => 9,
            Auth => 11,
            Unicast => 12,
            StatusCode => 13,
            RapidCommit => 14,
            IaPd => 25,
            IaPrefix => 26,
            AaaAuth => 240,
            KeyGeneration => 241,

            Unknown(code) => code,
        }
    }
}

impl fmt::Display for OptionCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::OptionCode::*;
        match self {
            ClientId => write!(f, "CLIENTID"),
            ServerId => write!(f, "SERVERID"),
            IaNa => write!(f, "IA_NA"),
            IaTa => write!(f, "IA_TA"),
            IaAddr => write!(f, "IAADDR"),
            OptionRequest => write!(f, "ORO"),
            Preference => write!(f, "PREFERENCE"),
            ElapsedTime => write!(f, "ELAPSED_TIME"),
            RelayMessage => write!(f, "RELAY_MSG"),
            Auth => write!(f, "AUTH"),
            Unicast => write!(f, "UNICAST"),
            StatusCode => write!(f, "STATUS_CODE"),
            RapidCommit => write!(f, "RAPID_COMMIT"),
            IaPd => write!(f, "IA_PD"),
            IaPrefix => write!(f, "IAPREFIX"),
            AaaAuth => write!(f, "AAAAUTH"),
            KeyGeneration => write!(f, "KEYGEN"),
            Unknown(code) => write!(f, "UNKNOWN({})", code),
        }
    }
}
