//! DHCPv6 message deserialization module.

use std::net::Ipv6Addr;

use bytes::Buf;

use crate::{
    constants::*,
    duid::Duid,
    error::CodecError,
    message::Message,
    message_type::MessageType,
    options::{DhcpOption, IaAddress, IaNa, IaPd, IaPrefix, IaTa, OptionCode, OptionTree, Parent},
    status_code::StatusCode,
};

/// Checks if there is enough space in buffer to get a value.
macro_rules! check_remaining(
    ($cursor:expr, $length:expr) => (
        if $cursor.remaining() < $length {
            return Err(CodecError::Truncated);
        }
    );
);

/// Checks if the option body length is exactly `$correct`.
macro_rules! check_length(
    ($code:expr, $body:expr, $correct:expr) => (
        if $body.remaining() != $correct {
            return Err(CodecError::InvalidLength($code));
        }
    );
);

/// Checks if the option body is at least `$minimal` long.
macro_rules! check_length_minimal(
    ($code:expr, $body:expr, $minimal:expr) => (
        if $body.remaining() < $minimal {
            return Err(CodecError::InvalidLength($code));
        }
    );
);

/// The size of an `IPv6` address in bytes.
const SIZE_IPV6: usize = 16;

impl Message {
    /// DHCPv6 message deserialization.
    ///
    /// # Errors
    /// `CodecError` if the packet is abrupted, too small or contains invalid length fields.
    pub fn from_bytes(src: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = src;
        check_remaining!(cursor, SIZE_HEADER);

        let message_type = MessageType::from(cursor.get_u8());
        let transaction_id = (u32::from(cursor.get_u8()) << 16) | u32::from(cursor.get_u16());

        let mut options = OptionTree::new();
        Self::append_options(cursor, &mut options, Parent::Root)?;

        Ok(Message {
            message_type,
            transaction_id,
            options,
        })
    }

    fn append_options(
        mut cursor: &[u8],
        tree: &mut OptionTree,
        parent: Parent,
    ) -> Result<(), CodecError> {
        while cursor.has_remaining() {
            check_remaining!(cursor, SIZE_OPTION_HEADER);
            let code = OptionCode::from(cursor.get_u16());
            let length = usize::from(cursor.get_u16());
            check_remaining!(cursor, length);

            let (mut body, rest) = cursor.split_at(length);
            cursor = rest;

            let option = Self::get_option(code, &mut body)?;
            let id = tree.push(parent, option)?;
            if code.is_container() {
                Self::append_options(body, tree, Parent::Option(id))?;
            }
        }
        Ok(())
    }

    /// Reads the fixed part of the option. Containers leave their sub-options in `body`.
    fn get_option(code: OptionCode, body: &mut &[u8]) -> Result<DhcpOption, CodecError> {
        let option = match code {
            OptionCode::ClientId => DhcpOption::ClientId(Duid::new(Self::get_all(body))),
            OptionCode::ServerId => DhcpOption::ServerId(Duid::new(Self::get_all(body))),
            OptionCode::IaNa => {
                check_length_minimal!(code, body, 12);
                DhcpOption::IaNa(IaNa {
                    iaid: body.get_u32(),
                    t1: body.get_u32(),
                    t2: body.get_u32(),
                })
            }
            OptionCode::IaTa => {
                check_length_minimal!(code, body, 4);
                DhcpOption::IaTa(IaTa { iaid: body.get_u32() })
            }
            OptionCode::IaPd => {
                check_length_minimal!(code, body, 12);
                DhcpOption::IaPd(IaPd {
                    iaid: body.get_u32(),
                    t1: body.get_u32(),
                    t2: body.get_u32(),
                })
            }
            OptionCode::IaAddr => {
                check_length_minimal!(code, body, SIZE_IPV6 + 8);
                DhcpOption::IaAddr(IaAddress {
                    address: Self::get_ipv6(body),
                    preferred_lifetime: body.get_u32(),
                    valid_lifetime: body.get_u32(),
                })
            }
            OptionCode::IaPrefix => {
                check_length_minimal!(code, body, SIZE_IPV6 + 9);
                DhcpOption::IaPrefix(IaPrefix {
                    preferred_lifetime: body.get_u32(),
                    valid_lifetime: body.get_u32(),
                    prefix_length: body.get_u8(),
                    prefix: Self::get_ipv6(body),
                })
            }
            OptionCode::OptionRequest => {
                if body.remaining() % 2 != 0 {
                    return Err(CodecError::InvalidLength(code));
                }
                let mut codes = Vec::with_capacity(body.remaining() / 2);
                while body.has_remaining() {
                    codes.push(OptionCode::from(body.get_u16()));
                }
                DhcpOption::OptionRequest(codes)
            }
            OptionCode::Preference => {
                check_length!(code, body, 1);
                DhcpOption::Preference(body.get_u8())
            }
            OptionCode::ElapsedTime => {
                check_length!(code, body, 2);
                DhcpOption::ElapsedTime(body.get_u16())
            }
            OptionCode::Unicast => {
                check_length!(code, body, SIZE_IPV6);
                DhcpOption::Unicast(Self::get_ipv6(body))
            }
            OptionCode::StatusCode => {
                check_length_minimal!(code, body, 2);
                let status = StatusCode::from(body.get_u16());
                let message = String::from_utf8_lossy(&Self::get_all(body)).into_owned();
                DhcpOption::StatusCode(status, message)
            }
            OptionCode::RapidCommit => {
                check_length!(code, body, 0);
                DhcpOption::RapidCommit
            }
            OptionCode::Auth => DhcpOption::Auth(Self::get_all(body)),
            OptionCode::AaaAuth => DhcpOption::AaaAuth(Self::get_all(body)),
            OptionCode::KeyGeneration => DhcpOption::KeyGeneration(Self::get_all(body)),
            OptionCode::RelayMessage | OptionCode::Unknown(_) => {
                DhcpOption::Unknown(code.into(), Self::get_all(body))
            }
        };
        Ok(option)
    }

    fn get_ipv6(body: &mut &[u8]) -> Ipv6Addr {
        let mut octets = [0u8; SIZE_IPV6];
        body.copy_to_slice(&mut octets);
        Ipv6Addr::from(octets)
    }

    fn get_all(body: &mut &[u8]) -> Vec<u8> {
        let data = body.to_vec();
        body.advance(data.len());
        data
    }
}
