//! DHCPv6 message constants.

use std::net::Ipv6Addr;

/// The UDP port clients listen on.
pub const DHCP_PORT_CLIENT: u16 = 546;

/// The UDP port servers and relay agents listen on.
pub const DHCP_PORT_SERVER: u16 = 547;

/// `All_DHCP_Relay_Agents_and_Servers` (RFC 3315 §5.1).
pub const ALL_DHCP_RELAY_AGENTS_AND_SERVERS: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 1, 2);

/// The `msg-type` and `transaction-id` fields size in bytes.
pub const SIZE_HEADER: usize = 4;

/// The option `code` and `length` fields size in bytes.
pub const SIZE_OPTION_HEADER: usize = 4;

/// The transaction ID occupies the lower 24 bits.
pub const TRANSACTION_ID_MASK: u32 = 0x00ff_ffff;

/// The `ELAPSED_TIME` value is saturated at this number of hundredths of a second.
pub const ELAPSED_TIME_MAX: u16 = 0xffff;

/// Initial REQUEST timeout in milliseconds (RFC 3315 §5.5).
pub const REQ_TIMEOUT: u64 = 1_000;

/// Maximum REQUEST timeout in milliseconds (RFC 3315 §5.5).
pub const REQ_MAX_RT: u64 = 30_000;

/// Maximum REQUEST retransmission attempts (RFC 3315 §5.5).
pub const REQ_MAX_RC: u32 = 10;
