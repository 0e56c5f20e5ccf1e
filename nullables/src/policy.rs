//! Nullable reward policy that records every query it answers.

use lockup_staking::{PolicyOracle, RewardQuote};
use lockup_types::{BlockNumber, SCALE};
use std::sync::Mutex;

/// The arguments of one `reward_at` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolicyCall {
    pub block: BlockNumber,
    pub total_supply: u128,
    pub total_locked: u128,
}

/// Answers with a fixed quote and remembers who asked.
pub struct RecordingPolicy {
    quote: RewardQuote,
    calls: Mutex<Vec<PolicyCall>>,
}

impl RecordingPolicy {
    pub fn new(reward_per_block: u128, staker_share: u128) -> Self {
        Self {
            quote: RewardQuote {
                reward_per_block,
                staker_share,
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn full_share(reward_per_block: u128) -> Self {
        Self::new(reward_per_block, SCALE)
    }

    pub fn calls(&self) -> Vec<PolicyCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl PolicyOracle for RecordingPolicy {
    fn reward_at(&self, block: BlockNumber, total_supply: u128, total_locked: u128) -> RewardQuote {
        self.calls.lock().unwrap().push(PolicyCall {
            block,
            total_supply,
            total_locked,
        });
        self.quote
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
