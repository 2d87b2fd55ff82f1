//! The message transport interface.

use std::{fmt, io, net::Ipv6Addr};

use dhcpv6_protocol::ALL_DHCP_RELAY_AGENTS_AND_SERVERS;

/// Where an outgoing message is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// `All_DHCP_Relay_Agents_and_Servers`.
    Multicast,
    Unicast(Ipv6Addr),
}

impl Destination {
    pub fn address(self) -> Ipv6Addr {
        match self {
            Destination::Multicast => ALL_DHCP_RELAY_AGENTS_AND_SERVERS,
            Destination::Unicast(address) => address,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.address())
    }
}

/// Sends encoded messages out of an interface.
///
/// Must not block: the exchanges call it from their state transitions.
pub trait Transport {
    fn send(&mut self, interface: u32, packet: &[u8], destination: Destination) -> io::Result<()>;
}
