//! Shared utilities for the lockup staking ledger.

pub mod logging;
pub mod stats;

pub use logging::{init_logging, try_init_logging, LogFormat};
pub use stats::StatsCounter;
