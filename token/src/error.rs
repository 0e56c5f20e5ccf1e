//! Token errors. The staking engine surfaces these unchanged.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("transfer amount exceeds balance: need {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("transfer amount exceeds allowance: need {needed}, available {available}")]
    InsufficientAllowance { needed: u128, available: u128 },

    #[error("decreased allowance below zero")]
    AllowanceUnderflow,

    #[error("arithmetic overflow in token supply")]
    Overflow,
}
