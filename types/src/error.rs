//! Top-level error type shared across crates.

use thiserror::Error;

/// Errors raised while constructing or combining the fundamental types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockupError {
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("invalid property id: {0:?}")]
    InvalidProperty(String),

    #[error("arithmetic overflow in fixed-point computation")]
    Overflow,
}
