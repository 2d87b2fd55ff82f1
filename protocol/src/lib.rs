//! The DHCPv6 protocol vocabulary: message types, option codes and payloads,
//! the option tree and the wire codec.

mod constants;
mod deserializer;
mod duid;
mod error;
mod message;
mod message_type;
mod options;
mod serializer;
mod status_code;

pub use self::{
    constants::*,
    duid::Duid,
    error::CodecError,
    message::Message,
    message_type::MessageType,
    options::{
        ConsistencyError, DhcpOption, IaAddress, IaNa, IaPd, IaPrefix, IaTa, OptionCode,
        OptionId, OptionTree, Parent,
    },
    status_code::StatusCode,
};
