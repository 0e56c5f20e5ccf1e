//! Nullable block clock: deterministic block height for testing.

use lockup_types::BlockNumber;
use std::cell::Cell;

/// Block height only advances when you tell it to.
pub struct NullBlockClock {
    current: Cell<u64>,
}

impl NullBlockClock {
    pub fn new(initial: u64) -> Self {
        Self {
            current: Cell::new(initial),
        }
    }

    pub fn now(&self) -> BlockNumber {
        BlockNumber::new(self.current.get())
    }

    /// Advance by `blocks` and return the new height.
    pub fn advance(&self, blocks: u64) -> BlockNumber {
        self.current.set(self.current.get() + blocks);
        self.now()
    }

    /// Advance by a single block.
    pub fn tick(&self) -> BlockNumber {
        self.advance(1)
    }

    pub fn set(&self, height: u64) {
        self.current.set(height);
    }
}

impl Default for NullBlockClock {
    fn default() -> Self {
        Self::new(1)
    }
}
