//! In-memory fungible token with balances, allowances, mint and burn.

use std::collections::HashMap;

use crate::escrow::{EscrowToken, TokenOp};
use crate::TokenError;
use lockup_types::Address;

/// Prior value of one cell, recorded so a failed batch can be rolled back.
enum Undo {
    Balance(Address, u128),
    Allowance(Address, Address, u128),
    Supply(u128),
}

/// A fungible token held entirely in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryToken {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    total_supply: u128,
}

impl InMemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, to: &Address, amount: u128) -> Result<(), TokenError> {
        let mut undo = Vec::new();
        self.run(&mut undo, |t, log| t.mint_logged(log, to, amount))
    }

    pub fn burn(&mut self, from: &Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        self.balances.insert(from.clone(), available - amount);
        self.total_supply -= amount;
        Ok(())
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        let mut undo = Vec::new();
        self.run(&mut undo, |t, log| t.move_logged(log, from, to, amount))
    }

    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let mut undo = Vec::new();
        self.run(&mut undo, |t, log| {
            t.spend_allowance_logged(log, from, spender, amount)?;
            t.move_logged(log, from, to, amount)
        })
    }

    /// Set the allowance `owner` grants `spender`, replacing any previous value.
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) {
        self.allowances
            .insert((owner.clone(), spender.clone()), amount);
    }

    pub fn increase_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        added: u128,
    ) -> Result<(), TokenError> {
        let current = self.allowance(owner, spender);
        let next = current.checked_add(added).ok_or(TokenError::Overflow)?;
        self.approve(owner, spender, next);
        Ok(())
    }

    pub fn decrease_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        subtracted: u128,
    ) -> Result<(), TokenError> {
        let current = self.allowance(owner, spender);
        let next = current
            .checked_sub(subtracted)
            .ok_or(TokenError::AllowanceUnderflow)?;
        self.approve(owner, spender, next);
        Ok(())
    }

    fn run<F>(&mut self, undo: &mut Vec<Undo>, f: F) -> Result<(), TokenError>
    where
        F: FnOnce(&mut Self, &mut Vec<Undo>) -> Result<(), TokenError>,
    {
        let result = f(self, undo);
        if result.is_err() {
            self.rollback(undo);
        }
        result
    }

    fn rollback(&mut self, undo: &mut Vec<Undo>) {
        while let Some(entry) = undo.pop() {
            match entry {
                Undo::Balance(account, value) => {
                    self.balances.insert(account, value);
                }
                Undo::Allowance(owner, spender, value) => {
                    self.allowances.insert((owner, spender), value);
                }
                Undo::Supply(value) => self.total_supply = value,
            }
        }
    }

    fn set_balance_logged(&mut self, undo: &mut Vec<Undo>, account: &Address, value: u128) {
        undo.push(Undo::Balance(account.clone(), self.balance_of(account)));
        self.balances.insert(account.clone(), value);
    }

    fn move_logged(
        &mut self,
        undo: &mut Vec<Undo>,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        self.set_balance_logged(undo, from, available - amount);
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.set_balance_logged(undo, to, credited);
        Ok(())
    }

    fn spend_allowance_logged(
        &mut self,
        undo: &mut Vec<Undo>,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let available = self.allowance(owner, spender);
        if available < amount {
            return Err(TokenError::InsufficientAllowance {
                needed: amount,
                available,
            });
        }
        undo.push(Undo::Allowance(owner.clone(), spender.clone(), available));
        self.allowances
            .insert((owner.clone(), spender.clone()), available - amount);
        Ok(())
    }

    fn mint_logged(
        &mut self,
        undo: &mut Vec<Undo>,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        undo.push(Undo::Supply(self.total_supply));
        self.total_supply = supply;
        self.set_balance_logged(undo, to, credited);
        Ok(())
    }
}

impl EscrowToken for InMemoryToken {
    fn total_supply(&self) -> u128 {
        self.total_supply
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn execute(&mut self, ops: &[TokenOp]) -> Result<(), TokenError> {
        let mut undo = Vec::new();
        let result = self.run(&mut undo, |t, log| {
            for op in ops {
                match op {
                    TokenOp::TransferFrom {
                        spender,
                        from,
                        to,
                        amount,
                    } => {
                        t.spend_allowance_logged(log, from, spender, *amount)?;
                        t.move_logged(log, from, to, *amount)?;
                    }
                    TokenOp::Transfer { from, to, amount } => {
                        t.move_logged(log, from, to, *amount)?;
                    }
                    TokenOp::Mint { to, amount } => t.mint_logged(log, to, *amount)?,
                }
            }
            Ok(())
        });
        if let Err(e) = &result {
            tracing::debug!(ops = ops.len(), error = %e, "token batch rolled back");
        }
        result
    }
}
