//! Error module

use thiserror::Error;

use crate::options::{ConsistencyError, OptionCode};

/// Returned by `Message::from_bytes` and `Message::to_bytes`.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Buffer is too small or the message has invalid length fields")]
    Truncated,
    #[error("Option {0} has an invalid length")]
    InvalidLength(OptionCode),
    #[error("Option {0} is too long to be encoded")]
    Oversized(OptionCode),
    #[error("Invalid option nesting: {0}")]
    Consistency(#[from] ConsistencyError),
}
