//! Nullable infrastructure for deterministic testing.
//!
//! Everything the staking engine talks to (block height, storage, the
//! authentication gate, the reward policy) sits behind a trait. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod gate;
pub mod policy;
pub mod store;

pub use clock::NullBlockClock;
pub use gate::NullGate;
pub use policy::{PolicyCall, RecordingPolicy};
pub use store::NullStore;
