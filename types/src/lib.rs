//! Fundamental types for the lockup staking ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! account addresses, property and position identifiers, block numbers, and the
//! fixed-point `Price` used by the cumulative-price ledger.

pub mod address;
pub mod block;
pub mod error;
pub mod fixed;
pub mod id;

pub use address::{Address, PropertyId, MAX_ID_LEN};
pub use block::BlockNumber;
pub use error::LockupError;
pub use fixed::{Price, SCALE};
pub use id::PositionId;
