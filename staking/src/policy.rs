//! Reward-rate policies.
//!
//! A policy answers one question per global settlement: how much reward is
//! minted per block, and what fraction of it goes to stakers. It is pure and
//! sees the values from before the settlement being computed.

use ethnum::U256;
use lockup_types::fixed::{apply_fraction, mul_div, to_u128};
use lockup_types::{BlockNumber, SCALE};
use serde::{Deserialize, Serialize};

/// A policy's answer for one settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardQuote {
    pub reward_per_block: u128,
    /// Fraction of the block reward paid to stakers, scaled by [`SCALE`].
    pub staker_share: u128,
}

impl RewardQuote {
    /// `reward_per_block × blocks × staker_share / SCALE`, `None` on overflow.
    pub fn minted_over(&self, blocks: u64) -> Option<u128> {
        let gross = self.reward_per_block.checked_mul(u128::from(blocks))?;
        apply_fraction(gross, self.staker_share)
    }
}

pub trait PolicyOracle: Send + Sync {
    fn reward_at(&self, block: BlockNumber, total_supply: u128, total_locked: u128) -> RewardQuote;

    /// Short label for logs.
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Constant reward per block regardless of supply or stake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlatPolicy {
    pub reward_per_block: u128,
    pub staker_share: u128,
}

impl FlatPolicy {
    pub fn new(reward_per_block: u128, staker_share: u128) -> Self {
        Self {
            reward_per_block,
            staker_share,
        }
    }

    /// All of `reward_per_block` goes to stakers.
    pub fn full_share(reward_per_block: u128) -> Self {
        Self::new(reward_per_block, SCALE)
    }
}

impl PolicyOracle for FlatPolicy {
    fn reward_at(&self, _block: BlockNumber, _total_supply: u128, _total_locked: u128) -> RewardQuote {
        RewardQuote {
            reward_per_block: self.reward_per_block,
            staker_share: self.staker_share,
        }
    }

    fn name(&self) -> &'static str {
        "flat"
    }
}

/// Reward decays linearly with the locked ratio:
/// `max × (supply − locked) / supply`. An empty supply pays the maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SupplyCurvePolicy {
    pub max_reward_per_block: u128,
    pub staker_share: u128,
}

impl SupplyCurvePolicy {
    pub fn new(max_reward_per_block: u128, staker_share: u128) -> Self {
        Self {
            max_reward_per_block,
            staker_share,
        }
    }

    fn reward_for(&self, total_supply: u128, total_locked: u128) -> u128 {
        if total_supply == 0 {
            return self.max_reward_per_block;
        }
        let unlocked = total_supply - total_locked.min(total_supply);
        // unlocked / supply ≤ 1, so the fraction never exceeds SCALE.
        let fraction = mul_div(U256::new(unlocked), U256::new(SCALE), U256::new(total_supply))
            .and_then(to_u128)
            .unwrap_or(0);
        apply_fraction(self.max_reward_per_block, fraction).unwrap_or(0)
    }
}

impl PolicyOracle for SupplyCurvePolicy {
    fn reward_at(&self, _block: BlockNumber, total_supply: u128, total_locked: u128) -> RewardQuote {
        RewardQuote {
            reward_per_block: self.reward_for(total_supply, total_locked),
            staker_share: self.staker_share,
        }
    }

    fn name(&self) -> &'static str {
        "supply_curve"
    }
}
