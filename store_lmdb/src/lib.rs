//! LMDB storage backend for the lockup staking ledger.
//!
//! Implements [`lockup_store::StakingStore`] using the `heed` LMDB bindings.
//! Each logical table maps to one LMDB database within a single environment.

pub mod environment;
pub mod error;
pub mod staking;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use staking::LmdbStakingStore;
