//! Positions: transferable stake records and their reward snapshots.

use std::collections::{BTreeSet, HashMap};

use lockup_types::{Address, PositionId, Price, PropertyId};
use serde::{Deserialize, Serialize};

use crate::ledger::{CumulativePriceLedger, Settlement};
use crate::StakingError;

/// One stake record. Positions are never destroyed; a position with
/// `amount == 0` still holds its pending reward until claimed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub property: PropertyId,
    pub owner: Address,
    pub amount: u128,
    /// Property price at this position's last settlement.
    pub price_snapshot: Price,
    /// Settled but not yet paid out.
    pub pending_reward: u128,
    /// Everything ever settled into this position, paid or not.
    pub cumulative_reward: u128,
}

impl Position {
    /// Fold the reward earned since the last snapshot into `pending_reward`.
    fn accrue(&mut self, property_price: Price) -> Result<u128, StakingError> {
        let earned = property_price
            .delta_since(self.price_snapshot)
            .reward_for(self.amount)
            .ok_or(StakingError::Overflow)?;
        let pending = self
            .pending_reward
            .checked_add(earned)
            .ok_or(StakingError::Overflow)?;
        let cumulative = self
            .cumulative_reward
            .checked_add(earned)
            .ok_or(StakingError::Overflow)?;
        self.pending_reward = pending;
        self.cumulative_reward = cumulative;
        self.price_snapshot = property_price;
        Ok(earned)
    }
}

/// What a failed operation needs to put the store back the way it was.
pub(crate) struct PositionCheckpoint {
    next_id: PositionId,
    touched: Option<(PositionId, Option<Position>)>,
}

#[derive(Clone, Debug)]
pub struct PositionStore {
    positions: HashMap<PositionId, Position>,
    owners: HashMap<Address, BTreeSet<PositionId>>,
    next_id: PositionId,
}

impl Default for PositionStore {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            owners: HashMap::new(),
            next_id: PositionId::FIRST,
        }
    }
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store, owner index included, from persisted records.
    pub fn from_positions<I>(positions: I, next_id: PositionId) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        let mut store = Self {
            next_id,
            ..Self::default()
        };
        for position in positions {
            store.index(&position.owner, position.id);
            store.positions.insert(position.id, position);
        }
        store
    }

    pub fn get(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Ids owned by `owner`, ascending.
    pub fn positions_of(&self, owner: &Address) -> Vec<PositionId> {
        self.owners
            .get(owner)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn next_id(&self) -> PositionId {
        self.next_id
    }

    pub fn require_owner(&self, id: PositionId, caller: &Address) -> Result<&Position, StakingError> {
        let position = self
            .positions
            .get(&id)
            .ok_or(StakingError::PositionNotFound(id))?;
        if &position.owner != caller {
            return Err(StakingError::NotOwner {
                position: id,
                caller: caller.clone(),
            });
        }
        Ok(position)
    }

    /// Open a new position on `property` holding `amount`.
    pub fn create(
        &mut self,
        ledger: &mut CumulativePriceLedger,
        ctx: &Settlement<'_>,
        owner: &Address,
        property: &PropertyId,
        amount: u128,
    ) -> Result<PositionId, StakingError> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount);
        }
        if !ctx.gate.is_authenticated(property) {
            return Err(StakingError::UnauthenticatedProperty(property.clone()));
        }
        let id = self.next_id;
        let next_id = id.next().ok_or(StakingError::Overflow)?;

        let price = ledger.settle_property(property, ctx)?.cumulative_price;
        ledger.lock(property, amount)?;

        self.next_id = next_id;
        self.positions.insert(
            id,
            Position {
                id,
                property: property.clone(),
                owner: owner.clone(),
                amount,
                price_snapshot: price,
                pending_reward: 0,
                cumulative_reward: 0,
            },
        );
        self.index(owner, id);
        Ok(id)
    }

    /// Settle the position's property and fold its reward into the position.
    /// Returns the reward newly accrued by this call.
    pub fn settle(
        &mut self,
        ledger: &mut CumulativePriceLedger,
        ctx: &Settlement<'_>,
        id: PositionId,
    ) -> Result<u128, StakingError> {
        let position = self
            .positions
            .get_mut(&id)
            .ok_or(StakingError::PositionNotFound(id))?;
        let price = ledger.settle_property(&position.property, ctx)?.cumulative_price;
        position.accrue(price)
    }

    pub fn increase_amount(
        &mut self,
        ledger: &mut CumulativePriceLedger,
        ctx: &Settlement<'_>,
        id: PositionId,
        delta: u128,
    ) -> Result<(), StakingError> {
        if delta == 0 {
            return Err(StakingError::InvalidAmount);
        }
        self.settle(ledger, ctx, id)?;
        let position = self
            .positions
            .get_mut(&id)
            .ok_or(StakingError::PositionNotFound(id))?;
        let amount = position
            .amount
            .checked_add(delta)
            .ok_or(StakingError::Overflow)?;
        ledger.lock(&position.property, delta)?;
        position.amount = amount;
        Ok(())
    }

    pub fn decrease_amount(
        &mut self,
        ledger: &mut CumulativePriceLedger,
        ctx: &Settlement<'_>,
        id: PositionId,
        delta: u128,
    ) -> Result<(), StakingError> {
        let staked = self
            .positions
            .get(&id)
            .ok_or(StakingError::PositionNotFound(id))?
            .amount;
        if delta > staked {
            return Err(StakingError::InsufficientStake {
                requested: delta,
                staked,
            });
        }
        self.settle(ledger, ctx, id)?;
        let position = self
            .positions
            .get_mut(&id)
            .ok_or(StakingError::PositionNotFound(id))?;
        ledger.unlock(&position.property, delta)?;
        position.amount -= delta;
        Ok(())
    }

    /// Settle, then hand the position and its pending reward to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        ledger: &mut CumulativePriceLedger,
        ctx: &Settlement<'_>,
        id: PositionId,
        caller: &Address,
        new_owner: &Address,
    ) -> Result<(), StakingError> {
        self.require_owner(id, caller)?;
        self.settle(ledger, ctx, id)?;
        if caller == new_owner {
            return Ok(());
        }
        self.unindex(caller, id);
        self.index(new_owner, id);
        if let Some(position) = self.positions.get_mut(&id) {
            position.owner = new_owner.clone();
        }
        Ok(())
    }

    /// Settle, then take the whole pending reward out of the position.
    pub fn claim_and_reset(
        &mut self,
        ledger: &mut CumulativePriceLedger,
        ctx: &Settlement<'_>,
        id: PositionId,
    ) -> Result<u128, StakingError> {
        self.settle(ledger, ctx, id)?;
        let position = self
            .positions
            .get_mut(&id)
            .ok_or(StakingError::PositionNotFound(id))?;
        Ok(std::mem::take(&mut position.pending_reward))
    }

    /// Pending reward the position would hold after settling at `ctx.block`.
    pub fn preview_withdrawable(
        &self,
        ledger: &CumulativePriceLedger,
        ctx: &Settlement<'_>,
        id: PositionId,
    ) -> Result<u128, StakingError> {
        let mut position = self
            .positions
            .get(&id)
            .cloned()
            .ok_or(StakingError::PositionNotFound(id))?;
        let (_, property) = ledger.preview_property(&position.property, ctx)?;
        position.accrue(property.cumulative_price)?;
        Ok(position.pending_reward)
    }

    pub(crate) fn checkpoint(&self, touched: Option<PositionId>) -> PositionCheckpoint {
        PositionCheckpoint {
            next_id: self.next_id,
            touched: touched.map(|id| (id, self.positions.get(&id).cloned())),
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: PositionCheckpoint) {
        let mut id = checkpoint.next_id;
        while id < self.next_id {
            if let Some(created) = self.positions.remove(&id) {
                self.unindex(&created.owner, id);
            }
            match id.next() {
                Some(next) => id = next,
                None => break,
            }
        }
        self.next_id = checkpoint.next_id;

        if let Some((id, saved)) = checkpoint.touched {
            if let Some(current) = self.positions.remove(&id) {
                self.unindex(&current.owner, id);
            }
            if let Some(saved) = saved {
                self.index(&saved.owner, id);
                self.positions.insert(id, saved);
            }
        }
    }

    fn index(&mut self, owner: &Address, id: PositionId) {
        self.owners.entry(owner.clone()).or_default().insert(id);
    }

    fn unindex(&mut self, owner: &Address, id: PositionId) {
        if let Some(ids) = self.owners.get_mut(owner) {
            ids.remove(&id);
            if ids.is_empty() {
                self.owners.remove(owner);
            }
        }
    }
}
