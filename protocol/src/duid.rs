//! DHCP unique identifier module.

use std::fmt;

use eui48::MacAddress;

/// `DUID-LL` type code (RFC 3315 §9.4).
const DUID_TYPE_LL: u16 = 3;

/// `Ethernet` hardware type (RFC 826).
const HARDWARE_TYPE_ETHERNET: u16 = 1;

/// A client or server DUID.
///
/// Treated as an opaque byte string everywhere except in its construction.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Duid(Vec<u8>);

impl Duid {
    pub fn new(bytes: Vec<u8>) -> Self {
        Duid(bytes)
    }

    /// Creates a `DUID-LL` from an Ethernet `MAC-48` address.
    pub fn from_mac(address: &MacAddress) -> Self {
        let mut bytes = Vec::with_capacity(4 + address.as_bytes().len());
        bytes.extend_from_slice(&DUID_TYPE_LL.to_be_bytes());
        bytes.extend_from_slice(&HARDWARE_TYPE_ETHERNET.to_be_bytes());
        bytes.extend_from_slice(address.as_bytes());
        Duid(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Duid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Duid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Duid({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duid_ll_from_mac() {
        let duid = Duid::from_mac(&MacAddress::new([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]));
        assert_eq!(duid.as_bytes(), &[0, 3, 0, 1, 1, 2, 3, 4, 5, 6]);
        assert_eq!(duid.to_string(), "00:03:00:01:01:02:03:04:05:06");
    }
}
