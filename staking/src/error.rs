//! Staking-specific errors.

use lockup_store::StoreError;
use lockup_token::TokenError;
use lockup_types::{Address, BlockNumber, PositionId, PropertyId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StakingError {
    #[error("illegal deposit amount")]
    InvalidAmount,

    #[error("unable to stake to unauthenticated property {0}")]
    UnauthenticatedProperty(PropertyId),

    #[error("illegal sender: {caller} does not own {position}")]
    NotOwner {
        position: PositionId,
        caller: Address,
    },

    #[error("insufficient tokens staked: requested {requested}, staked {staked}")]
    InsufficientStake { requested: u128, staked: u128 },

    #[error("{0} not found")]
    PositionNotFound(PositionId),

    #[error("block {current} precedes last settled block {last}")]
    BlockRegression {
        last: BlockNumber,
        current: BlockNumber,
    },

    #[error("arithmetic overflow in staking computation")]
    Overflow,

    /// Token failures are surfaced exactly as the token reported them.
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}
