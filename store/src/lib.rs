//! Abstract storage traits for the lockup staking ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod batch;
pub mod error;
pub mod staking;

pub use batch::{StakingWriteBatch, WriteOp};
pub use error::StoreError;
pub use staking::StakingStore;
