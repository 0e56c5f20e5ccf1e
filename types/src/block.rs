//! Block number type used throughout the ledger.
//!
//! Reward accrues per block. The ledger never reads a clock: every operation
//! is told which block it executes in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A block height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockNumber(u64);

impl BlockNumber {
    /// The genesis block.
    pub const GENESIS: Self = Self(0);

    pub fn new(height: u64) -> Self {
        Self(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Blocks elapsed from `self` to `later`, or `None` if `later` precedes `self`.
    pub fn blocks_until(&self, later: BlockNumber) -> Option<u64> {
        later.0.checked_sub(self.0)
    }

    /// The block `n` blocks after this one (saturating).
    pub fn advance(&self, n: u64) -> Self {
        Self(self.0.saturating_add(n))
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
