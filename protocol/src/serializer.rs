//! DHCPv6 message serialization module.

use bytes::{BufMut, BytesMut};

use crate::{
    constants::*,
    error::CodecError,
    message::Message,
    options::{DhcpOption, OptionId, OptionTree, Parent},
};

impl Message {
    /// DHCPv6 message serialization.
    ///
    /// # Errors
    /// `CodecError::Oversized` if an option does not fit its 16-bit length field.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut dst = BytesMut::with_capacity(SIZE_HEADER + 128);
        dst.put_u8(self.message_type as u8);
        let transaction_id = self.transaction_id & TRANSACTION_ID_MASK;
        dst.put_u8((transaction_id >> 16) as u8);
        dst.put_u16(transaction_id as u16);

        for &id in self.options.roots() {
            Self::put_option(&self.options, id, &mut dst)?;
        }
        Ok(dst.to_vec())
    }

    fn put_option(tree: &OptionTree, id: OptionId, dst: &mut BytesMut) -> Result<(), CodecError> {
        use self::DhcpOption::*;

        let option = match tree.get(id) {
            Some(option) => option,
            None => return Ok(()),
        };

        let mut body = BytesMut::new();
        match option {
            ClientId(duid) | ServerId(duid) => body.put_slice(duid.as_bytes()),
            IaNa(ia) => {
                body.put_u32(ia.iaid);
                body.put_u32(ia.t1);
                body.put_u32(ia.t2);
            }
            IaTa(ia) => body.put_u32(ia.iaid),
            IaPd(ia) => {
                body.put_u32(ia.iaid);
                body.put_u32(ia.t1);
                body.put_u32(ia.t2);
            }
            IaAddr(address) => {
                body.put_slice(&address.address.octets());
                body.put_u32(address.preferred_lifetime);
                body.put_u32(address.valid_lifetime);
            }
            IaPrefix(prefix) => {
                body.put_u32(prefix.preferred_lifetime);
                body.put_u32(prefix.valid_lifetime);
                body.put_u8(prefix.prefix_length);
                body.put_slice(&prefix.prefix.octets());
            }
            OptionRequest(codes) => {
                for &code in codes.iter() {
                    body.put_u16(code.into());
                }
            }
            Preference(value) => body.put_u8(*value),
            ElapsedTime(value) => body.put_u16(*value),
            Unicast(address) => body.put_slice(&address.octets()),
            StatusCode(code, message) => {
                body.put_u16((*code).into());
                body.put_slice(message.as_bytes());
            }
            RapidCommit => {}
            Auth(data) | AaaAuth(data) | KeyGeneration(data) | Unknown(_, data) => {
                body.put_slice(data)
            }
        }

        for &child in tree.children(Parent::Option(id)) {
            Self::put_option(tree, child, &mut body)?;
        }

        let code = option.code();
        if body.len() > usize::from(u16::max_value()) {
            return Err(CodecError::Oversized(code));
        }
        dst.put_u16(code.into());
        dst.put_u16(body.len() as u16);
        dst.put_slice(&body);
        Ok(())
    }
}
