//! Events emitted by committed staking operations.

use lockup_types::{Address, BlockNumber, PositionId, PropertyId};

/// Emitted only after an operation has fully committed, tokens included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StakingEvent {
    /// Stake was added, either as a new position or to an existing one.
    Staked {
        sender: Address,
        property: PropertyId,
        position: PositionId,
        amount: u128,
        block: BlockNumber,
    },
    Withdrawn {
        sender: Address,
        property: PropertyId,
        position: PositionId,
        amount: u128,
        reward: u128,
        block: BlockNumber,
    },
    PositionTransferred {
        position: PositionId,
        from: Address,
        to: Address,
        block: BlockNumber,
    },
    PolicyChanged {
        policy: &'static str,
        block: BlockNumber,
    },
}

/// Synchronous fan-out bus. Listeners run inline on the committing thread.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&StakingEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&StakingEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &StakingEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
