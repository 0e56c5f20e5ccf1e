//! The staking engine.
//!
//! Every mutating operation runs validate → settle → mutate → transfer
//! against a checkpoint of the records it can touch: the global state, one
//! property, one position and the id counter. Token movements for the
//! operation go out as a single atomic batch at the end; if anything fails
//! the checkpoint is restored and no partial state is observable.

use std::sync::Arc;

use lockup_token::{EscrowToken, TokenOp};
use lockup_types::{Address, BlockNumber, PositionId, PropertyId};
use lockup_utils::StatsCounter;

use crate::auth::AuthenticationGate;
use crate::config::StakingConfig;
use crate::event::{EventBus, StakingEvent};
use crate::ledger::{
    CumulativePriceLedger, CumulativePrices, GlobalState, PropertyState, Settlement,
};
use crate::policy::PolicyOracle;
use crate::position::{Position, PositionCheckpoint, PositionStore};
use crate::StakingError;

const COUNTERS: &[&str] = &["deposits", "withdrawals", "transfers", "policy_changes", "aborted"];

/// Result of a successful withdrawal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawReceipt {
    pub position: PositionId,
    pub property: PropertyId,
    /// Principal released from escrow.
    pub amount: u128,
    /// Reward minted to the sender.
    pub reward: u128,
}

struct Checkpoint {
    global: GlobalState,
    property: PropertyId,
    property_state: Option<PropertyState>,
    positions: PositionCheckpoint,
}

pub struct StakingEngine<T: EscrowToken> {
    pub(crate) ledger: CumulativePriceLedger,
    pub(crate) positions: PositionStore,
    token: T,
    policy: Arc<dyn PolicyOracle>,
    gate: Arc<dyn AuthenticationGate>,
    /// Account holding all staked principal.
    escrow: Address,
    events: EventBus,
    stats: StatsCounter,
}

impl<T: EscrowToken> StakingEngine<T> {
    pub fn new(
        token: T,
        policy: Arc<dyn PolicyOracle>,
        gate: Arc<dyn AuthenticationGate>,
        escrow: Address,
    ) -> Self {
        Self {
            ledger: CumulativePriceLedger::new(),
            positions: PositionStore::new(),
            token,
            policy,
            gate,
            escrow,
            events: EventBus::new(),
            stats: StatsCounter::new(COUNTERS),
        }
    }

    /// Build an empty engine with the escrow account and policy from `config`.
    pub fn from_config(
        config: &StakingConfig,
        token: T,
        gate: Arc<dyn AuthenticationGate>,
    ) -> Result<Self, StakingError> {
        let escrow = config.escrow_address()?;
        let policy = config.build_policy()?;
        tracing::info!(escrow = %escrow, policy = policy.name(), "staking engine configured");
        Ok(Self::new(token, policy, gate, escrow))
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&StakingEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    /// Stake `amount` on `property` as a brand-new position owned by `sender`.
    /// `sender` must have approved the escrow account for `amount`.
    pub fn deposit_to_property(
        &mut self,
        property: &PropertyId,
        amount: u128,
        sender: &Address,
        block: BlockNumber,
    ) -> Result<PositionId, StakingError> {
        let id = self.atomically("deposit_to_property", property, None, |engine| {
            let ctx = Settlement {
                block,
                total_supply: engine.token.total_supply(),
                policy: engine.policy.as_ref(),
                gate: engine.gate.as_ref(),
            };
            let id = engine
                .positions
                .create(&mut engine.ledger, &ctx, sender, property, amount)?;
            engine.token.execute(&[TokenOp::TransferFrom {
                spender: engine.escrow.clone(),
                from: sender.clone(),
                to: engine.escrow.clone(),
                amount,
            }])?;
            Ok(id)
        })?;

        self.stats.increment("deposits");
        tracing::info!(
            sender = %sender,
            property = %property,
            position = %id,
            amount,
            block = %block,
            "staked to property"
        );
        self.events.emit(&StakingEvent::Staked {
            sender: sender.clone(),
            property: property.clone(),
            position: id,
            amount,
            block,
        });
        Ok(id)
    }

    /// Add `amount` to an existing position owned by `sender`.
    pub fn deposit_to_position(
        &mut self,
        id: PositionId,
        amount: u128,
        sender: &Address,
        block: BlockNumber,
    ) -> Result<(), StakingError> {
        let property = self.property_of(id)?;
        self.atomically("deposit_to_position", &property, Some(id), |engine| {
            engine.positions.require_owner(id, sender)?;
            if amount == 0 {
                return Err(StakingError::InvalidAmount);
            }
            let ctx = Settlement {
                block,
                total_supply: engine.token.total_supply(),
                policy: engine.policy.as_ref(),
                gate: engine.gate.as_ref(),
            };
            engine
                .positions
                .increase_amount(&mut engine.ledger, &ctx, id, amount)?;
            engine.token.execute(&[TokenOp::TransferFrom {
                spender: engine.escrow.clone(),
                from: sender.clone(),
                to: engine.escrow.clone(),
                amount,
            }])?;
            Ok(())
        })?;

        self.stats.increment("deposits");
        tracing::info!(
            sender = %sender,
            property = %property,
            position = %id,
            amount,
            block = %block,
            "staked to position"
        );
        self.events.emit(&StakingEvent::Staked {
            sender: sender.clone(),
            property,
            position: id,
            amount,
            block,
        });
        Ok(())
    }

    /// Release `amount` of principal (possibly zero) and pay out the whole
    /// pending reward of the position.
    pub fn withdraw_by_position(
        &mut self,
        id: PositionId,
        amount: u128,
        sender: &Address,
        block: BlockNumber,
    ) -> Result<WithdrawReceipt, StakingError> {
        let property = self.property_of(id)?;
        let reward = self.atomically("withdraw_by_position", &property, Some(id), |engine| {
            let staked = engine.positions.require_owner(id, sender)?.amount;
            if amount > staked {
                return Err(StakingError::InsufficientStake {
                    requested: amount,
                    staked,
                });
            }
            let ctx = Settlement {
                block,
                total_supply: engine.token.total_supply(),
                policy: engine.policy.as_ref(),
                gate: engine.gate.as_ref(),
            };
            if amount > 0 {
                engine
                    .positions
                    .decrease_amount(&mut engine.ledger, &ctx, id, amount)?;
            }
            let reward = engine
                .positions
                .claim_and_reset(&mut engine.ledger, &ctx, id)?;

            let mut ops = Vec::with_capacity(2);
            if amount > 0 {
                ops.push(TokenOp::Transfer {
                    from: engine.escrow.clone(),
                    to: sender.clone(),
                    amount,
                });
            }
            if reward > 0 {
                ops.push(TokenOp::Mint {
                    to: sender.clone(),
                    amount: reward,
                });
            }
            engine.token.execute(&ops)?;
            Ok(reward)
        })?;

        self.stats.increment("withdrawals");
        tracing::info!(
            sender = %sender,
            property = %property,
            position = %id,
            amount,
            reward,
            block = %block,
            "withdrew from position"
        );
        self.events.emit(&StakingEvent::Withdrawn {
            sender: sender.clone(),
            property: property.clone(),
            position: id,
            amount,
            reward,
            block,
        });
        Ok(WithdrawReceipt {
            position: id,
            property,
            amount,
            reward,
        })
    }

    /// Hand a position to `to`. Reward accrued up to `block` travels with it.
    pub fn transfer_position(
        &mut self,
        id: PositionId,
        from: &Address,
        to: &Address,
        block: BlockNumber,
    ) -> Result<(), StakingError> {
        let property = self.property_of(id)?;
        self.atomically("transfer_position", &property, Some(id), |engine| {
            let ctx = Settlement {
                block,
                total_supply: engine.token.total_supply(),
                policy: engine.policy.as_ref(),
                gate: engine.gate.as_ref(),
            };
            engine
                .positions
                .transfer_ownership(&mut engine.ledger, &ctx, id, from, to)
        })?;

        self.stats.increment("transfers");
        tracing::info!(position = %id, from = %from, to = %to, block = %block, "position transferred");
        self.events.emit(&StakingEvent::PositionTransferred {
            position: id,
            from: from.clone(),
            to: to.clone(),
            block,
        });
        Ok(())
    }

    /// Swap the reward policy. Blocks up to `block` are settled under the
    /// outgoing policy first.
    pub fn set_policy(
        &mut self,
        policy: Arc<dyn PolicyOracle>,
        block: BlockNumber,
    ) -> Result<(), StakingError> {
        let ctx = Settlement {
            block,
            total_supply: self.token.total_supply(),
            policy: self.policy.as_ref(),
            gate: self.gate.as_ref(),
        };
        self.ledger.settle_global(&ctx)?;

        tracing::info!(from = self.policy.name(), to = policy.name(), block = %block, "reward policy changed");
        self.policy = policy;
        self.stats.increment("policy_changes");
        self.events.emit(&StakingEvent::PolicyChanged {
            policy: self.policy.name(),
            block,
        });
        Ok(())
    }

    /// Settle `property` at `block` without touching any position.
    ///
    /// Call this right before flipping the property's authentication so the
    /// change takes effect at exactly `block`: accrual up to it is credited
    /// under the old status and nothing after it is.
    pub fn settle_property(
        &mut self,
        property: &PropertyId,
        block: BlockNumber,
    ) -> Result<PropertyState, StakingError> {
        self.atomically("settle_property", property, None, |engine| {
            let ctx = Settlement {
                block,
                total_supply: engine.token.total_supply(),
                policy: engine.policy.as_ref(),
                gate: engine.gate.as_ref(),
            };
            engine
                .ledger
                .settle_property(property, &ctx)
                .map(PropertyState::clone)
        })
    }

    /// Reward a withdrawal of this position at `block` would pay.
    pub fn calculate_withdrawable_interest(
        &self,
        id: PositionId,
        block: BlockNumber,
    ) -> Result<u128, StakingError> {
        self.positions
            .preview_withdrawable(&self.ledger, &self.settlement(block), id)
    }

    pub fn cumulative_prices(
        &self,
        property: &PropertyId,
        block: BlockNumber,
    ) -> Result<CumulativePrices, StakingError> {
        self.ledger
            .cumulative_prices(property, &self.settlement(block))
    }

    pub fn total_locked(&self) -> u128 {
        self.ledger.total_locked()
    }

    pub fn total_locked_for_property(&self, property: &PropertyId) -> u128 {
        self.ledger.total_locked_for(property)
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn positions_of(&self, owner: &Address) -> Vec<PositionId> {
        self.positions.positions_of(owner)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn global_state(&self) -> &GlobalState {
        self.ledger.global()
    }

    pub fn property_state(&self, property: &PropertyId) -> Option<&PropertyState> {
        self.ledger.property(property)
    }

    pub fn policy(&self) -> &dyn PolicyOracle {
        self.policy.as_ref()
    }

    pub fn escrow(&self) -> &Address {
        &self.escrow
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    fn settlement(&self, block: BlockNumber) -> Settlement<'_> {
        Settlement {
            block,
            total_supply: self.token.total_supply(),
            policy: self.policy.as_ref(),
            gate: self.gate.as_ref(),
        }
    }

    fn property_of(&self, id: PositionId) -> Result<PropertyId, StakingError> {
        self.positions
            .get(id)
            .map(|p| p.property.clone())
            .ok_or(StakingError::PositionNotFound(id))
    }

    /// Run `op` and roll the touched records back if it fails.
    fn atomically<R>(
        &mut self,
        name: &'static str,
        property: &PropertyId,
        position: Option<PositionId>,
        op: impl FnOnce(&mut Self) -> Result<R, StakingError>,
    ) -> Result<R, StakingError> {
        let checkpoint = self.checkpoint(property, position);
        let result = op(self);
        if let Err(e) = &result {
            self.restore(checkpoint);
            self.stats.increment("aborted");
            tracing::warn!(op = name, property = %property, error = %e, "staking operation aborted");
        }
        result
    }

    fn checkpoint(&self, property: &PropertyId, position: Option<PositionId>) -> Checkpoint {
        Checkpoint {
            global: self.ledger.global().clone(),
            property: property.clone(),
            property_state: self.ledger.property(property).cloned(),
            positions: self.positions.checkpoint(position),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.ledger.restore(
            checkpoint.global,
            &checkpoint.property,
            checkpoint.property_state,
        );
        self.positions.restore(checkpoint.positions);
    }
}
