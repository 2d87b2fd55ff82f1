//! Error module

use thiserror::Error;

use dhcpv6_protocol::{CodecError, ConsistencyError};

use crate::client::ExchangeHandle;

/// Failures which abandon an exchange.
///
/// Retransmission exhaustion is not an error: it is reported as `Progress::Exhausted`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unable to find interface with ifindex {0}")]
    InterfaceNotFound(u32),
    #[error("Option tree inconsistency: {0}")]
    Consistency(#[from] ConsistencyError),
    #[error("Message codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("ServerId not specified")]
    MissingServerId,
    #[error("An exchange is already active for {0:?}")]
    ExchangeInProgress(ExchangeHandle),
    #[error("Lease storage error: {0}")]
    Storage(String),
}
