//! The interface the staking engine uses to move stake and pay rewards.

use crate::TokenError;
use lockup_types::Address;

/// One token movement requested by the staking engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenOp {
    /// Pull `amount` from `from` into `to`, spending the allowance `from`
    /// granted to `spender`.
    TransferFrom {
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    },
    /// Move `amount` held by `from` to `to`.
    Transfer {
        from: Address,
        to: Address,
        amount: u128,
    },
    /// Create `amount` new tokens for `to`.
    Mint { to: Address, amount: u128 },
}

/// A fungible token able to execute staking movements atomically.
pub trait EscrowToken {
    fn total_supply(&self) -> u128;

    fn balance_of(&self, account: &Address) -> u128;

    fn allowance(&self, owner: &Address, spender: &Address) -> u128;

    /// Apply every op in order. On error nothing has changed.
    fn execute(&mut self, ops: &[TokenOp]) -> Result<(), TokenError>;
}
