//! The cumulative-price ledger.
//!
//! Reward is tracked as two monotonic accumulators. The global price is the
//! staker reward minted per unit locked anywhere; each property's price is
//! the reward its stakers earned per unit locked on that property. A
//! property's share of everything minted since it was last touched is
//! `(global_price − global_price_snapshot) × property_locked`, so settling
//! one property costs O(1) no matter how many properties or positions exist.

use std::collections::HashMap;

use lockup_types::{BlockNumber, Price, PropertyId};
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticationGate;
use crate::policy::PolicyOracle;
use crate::StakingError;

/// Everything a settlement needs to know about the world at `block`.
pub struct Settlement<'a> {
    pub block: BlockNumber,
    /// Token supply before the operation being settled moves anything.
    pub total_supply: u128,
    pub policy: &'a dyn PolicyOracle,
    pub gate: &'a dyn AuthenticationGate,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    pub total_locked: u128,
    pub cumulative_price: Price,
    pub last_settled_block: BlockNumber,
}

impl GlobalState {
    /// Advance the global price to `ctx.block`.
    ///
    /// Blocks during which nothing was locked mint nothing; the next staker
    /// does not inherit them.
    pub fn settle(&mut self, ctx: &Settlement<'_>) -> Result<(), StakingError> {
        let elapsed = self
            .last_settled_block
            .blocks_until(ctx.block)
            .ok_or(StakingError::BlockRegression {
                last: self.last_settled_block,
                current: ctx.block,
            })?;
        if elapsed == 0 {
            return Ok(());
        }
        if self.total_locked > 0 {
            let quote = ctx
                .policy
                .reward_at(ctx.block, ctx.total_supply, self.total_locked);
            let minted = quote.minted_over(elapsed).ok_or(StakingError::Overflow)?;
            self.cumulative_price = self
                .cumulative_price
                .checked_add(Price::per_unit(minted, self.total_locked))
                .ok_or(StakingError::Overflow)?;
            tracing::debug!(
                block = %ctx.block,
                elapsed,
                minted,
                price = %self.cumulative_price,
                "settled global price"
            );
        }
        self.last_settled_block = ctx.block;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyState {
    pub total_locked: u128,
    pub cumulative_price: Price,
    /// Global price as of this property's last settlement.
    pub global_price_snapshot: Price,
    pub last_settled_block: BlockNumber,
}

impl PropertyState {
    /// A property seen for the first time starts level with the global price
    /// so it earns nothing for blocks before its first stake.
    fn fresh(global: &GlobalState) -> Self {
        Self {
            total_locked: 0,
            cumulative_price: Price::ZERO,
            global_price_snapshot: global.cumulative_price,
            last_settled_block: global.last_settled_block,
        }
    }

    /// Fold in this property's share of the global reward since the last
    /// settlement. `global` must already be settled at `ctx.block`.
    fn settle(
        &mut self,
        property: &PropertyId,
        global: &GlobalState,
        ctx: &Settlement<'_>,
    ) -> Result<(), StakingError> {
        if ctx.block < self.last_settled_block {
            return Err(StakingError::BlockRegression {
                last: self.last_settled_block,
                current: ctx.block,
            });
        }
        let delta = global
            .cumulative_price
            .delta_since(self.global_price_snapshot);
        if !delta.is_zero() && self.total_locked > 0 && ctx.gate.is_authenticated(property) {
            let reward = delta
                .reward_for(self.total_locked)
                .ok_or(StakingError::Overflow)?;
            self.cumulative_price = self
                .cumulative_price
                .checked_add(Price::per_unit(reward, self.total_locked))
                .ok_or(StakingError::Overflow)?;
            tracing::debug!(
                property = %property,
                reward,
                price = %self.cumulative_price,
                "settled property price"
            );
        }
        self.global_price_snapshot = global.cumulative_price;
        self.last_settled_block = ctx.block;
        Ok(())
    }
}

/// Global and property prices as they stand after settling at some block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CumulativePrices {
    pub global: Price,
    pub property: Price,
}

#[derive(Clone, Debug, Default)]
pub struct CumulativePriceLedger {
    global: GlobalState,
    properties: HashMap<PropertyId, PropertyState>,
}

impl CumulativePriceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(global: GlobalState, properties: HashMap<PropertyId, PropertyState>) -> Self {
        Self { global, properties }
    }

    pub fn global(&self) -> &GlobalState {
        &self.global
    }

    pub fn property(&self, property: &PropertyId) -> Option<&PropertyState> {
        self.properties.get(property)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&PropertyId, &PropertyState)> {
        self.properties.iter()
    }

    pub fn total_locked(&self) -> u128 {
        self.global.total_locked
    }

    pub fn total_locked_for(&self, property: &PropertyId) -> u128 {
        self.properties
            .get(property)
            .map(|p| p.total_locked)
            .unwrap_or(0)
    }

    pub fn settle_global(&mut self, ctx: &Settlement<'_>) -> Result<(), StakingError> {
        self.global.settle(ctx)
    }

    /// Settle the global ledger and then `property`, creating the property's
    /// record on first use.
    pub fn settle_property(
        &mut self,
        property: &PropertyId,
        ctx: &Settlement<'_>,
    ) -> Result<&PropertyState, StakingError> {
        self.global.settle(ctx)?;
        let global = &self.global;
        let state = self
            .properties
            .entry(property.clone())
            .or_insert_with(|| PropertyState::fresh(global));
        state.settle(property, global, ctx)?;
        Ok(&*state)
    }

    /// Add `amount` to the property's and the global locked totals.
    /// The property must have been settled at the current block.
    pub fn lock(&mut self, property: &PropertyId, amount: u128) -> Result<(), StakingError> {
        let global_total = self
            .global
            .total_locked
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;
        let state = self
            .properties
            .get_mut(property)
            .ok_or_else(|| StakingError::Other(format!("property {property} was never settled")))?;
        state.total_locked = state
            .total_locked
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;
        self.global.total_locked = global_total;
        Ok(())
    }

    pub fn unlock(&mut self, property: &PropertyId, amount: u128) -> Result<(), StakingError> {
        let state = self
            .properties
            .get_mut(property)
            .ok_or_else(|| StakingError::Other(format!("property {property} was never settled")))?;
        let insufficient = |staked| StakingError::InsufficientStake {
            requested: amount,
            staked,
        };
        let property_total = state
            .total_locked
            .checked_sub(amount)
            .ok_or_else(|| insufficient(state.total_locked))?;
        let global_total = self
            .global
            .total_locked
            .checked_sub(amount)
            .ok_or_else(|| insufficient(self.global.total_locked))?;
        state.total_locked = property_total;
        self.global.total_locked = global_total;
        Ok(())
    }

    /// The property's state as it would be after settling at `ctx.block`,
    /// without touching the ledger.
    pub fn preview_property(
        &self,
        property: &PropertyId,
        ctx: &Settlement<'_>,
    ) -> Result<(GlobalState, PropertyState), StakingError> {
        let mut global = self.global.clone();
        global.settle(ctx)?;
        let mut state = self
            .properties
            .get(property)
            .cloned()
            .unwrap_or_else(|| PropertyState::fresh(&self.global));
        state.settle(property, &global, ctx)?;
        Ok((global, state))
    }

    pub fn cumulative_prices(
        &self,
        property: &PropertyId,
        ctx: &Settlement<'_>,
    ) -> Result<CumulativePrices, StakingError> {
        let (global, state) = self.preview_property(property, ctx)?;
        Ok(CumulativePrices {
            global: global.cumulative_price,
            property: state.cumulative_price,
        })
    }

    pub(crate) fn restore(&mut self, global: GlobalState, property: &PropertyId, state: Option<PropertyState>) {
        self.global = global;
        match state {
            Some(state) => {
                self.properties.insert(property.clone(), state);
            }
            None => {
                self.properties.remove(property);
            }
        }
    }
}
