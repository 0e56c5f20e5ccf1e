//! A staking engine shared between threads behind one exclusive lock.

use std::sync::{Arc, Mutex};

use lockup_token::EscrowToken;
use lockup_types::{Address, BlockNumber, PositionId, PropertyId};

use crate::engine::{StakingEngine, WithdrawReceipt};
use crate::StakingError;

/// Operations run one at a time; previews take the same lock briefly.
pub struct SharedStakingEngine<T: EscrowToken> {
    inner: Arc<Mutex<StakingEngine<T>>>,
}

impl<T: EscrowToken> Clone for SharedStakingEngine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: EscrowToken> SharedStakingEngine<T> {
    pub fn new(engine: StakingEngine<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut StakingEngine<T>) -> R) -> Result<R, StakingError> {
        let mut engine = self
            .inner
            .lock()
            .map_err(|_| StakingError::Other("staking engine lock poisoned".to_string()))?;
        Ok(f(&mut engine))
    }

    pub fn deposit_to_property(
        &self,
        property: &PropertyId,
        amount: u128,
        sender: &Address,
        block: BlockNumber,
    ) -> Result<PositionId, StakingError> {
        self.with(|engine| engine.deposit_to_property(property, amount, sender, block))?
    }

    pub fn deposit_to_position(
        &self,
        id: PositionId,
        amount: u128,
        sender: &Address,
        block: BlockNumber,
    ) -> Result<(), StakingError> {
        self.with(|engine| engine.deposit_to_position(id, amount, sender, block))?
    }

    pub fn withdraw_by_position(
        &self,
        id: PositionId,
        amount: u128,
        sender: &Address,
        block: BlockNumber,
    ) -> Result<WithdrawReceipt, StakingError> {
        self.with(|engine| engine.withdraw_by_position(id, amount, sender, block))?
    }

    pub fn transfer_position(
        &self,
        id: PositionId,
        from: &Address,
        to: &Address,
        block: BlockNumber,
    ) -> Result<(), StakingError> {
        self.with(|engine| engine.transfer_position(id, from, to, block))?
    }

    pub fn calculate_withdrawable_interest(
        &self,
        id: PositionId,
        block: BlockNumber,
    ) -> Result<u128, StakingError> {
        self.with(|engine| engine.calculate_withdrawable_interest(id, block))?
    }

    pub fn total_locked(&self) -> Result<u128, StakingError> {
        self.with(|engine| engine.total_locked())
    }
}
