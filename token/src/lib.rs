//! Fungible-token collaborator for the staking engine.
//!
//! The engine never touches balances directly. It describes the token
//! movements of one staking operation as a batch of [`TokenOp`]s and hands
//! them to an [`EscrowToken`], which must apply them all or none.
//!
//! [`InMemoryToken`] is a complete reference implementation with balances,
//! allowances, mint and burn.

pub mod error;
pub mod escrow;
pub mod memory;

pub use error::TokenError;
pub use escrow::{EscrowToken, TokenOp};
pub use memory::InMemoryToken;
