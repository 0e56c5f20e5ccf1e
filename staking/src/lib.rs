//! Lockup staking engine.
//!
//! Participants lock a fungible token against authenticated properties and
//! earn a continuously accruing reward. Accrual is tracked with monotonic
//! cumulative prices so every operation costs O(1) regardless of how many
//! positions exist; a position is settled only when it is touched.
//!
//! - [`ledger`]: global and per-property cumulative prices
//! - [`position`]: positions, their snapshots and the owner index
//! - [`engine`]: deposit / withdraw / transfer orchestration
//! - [`policy`], [`auth`]: the reward-rate and authentication collaborators

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod ledger;
pub mod persistence;
pub mod policy;
pub mod position;
pub mod shared;

pub use auth::{AuthenticationGate, PropertyRegistry};
pub use config::{PolicyConfig, StakingConfig};
pub use engine::{StakingEngine, WithdrawReceipt};
pub use error::StakingError;
pub use event::{EventBus, StakingEvent};
pub use ledger::{CumulativePriceLedger, CumulativePrices, GlobalState, PropertyState, Settlement};
pub use policy::{FlatPolicy, PolicyOracle, RewardQuote, SupplyCurvePolicy};
pub use position::{Position, PositionStore};
pub use shared::SharedStakingEngine;
