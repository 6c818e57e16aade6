//! Ledger: the only code that moves an account balance.
//!
//! Credits and debits mutate an in-memory copy. Callers persist the result
//! together with whatever caused it (a bet, a payout, a deposit).

use rust_decimal::Decimal;

use crate::types::{Account, Rejection};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("cannot move a negative amount: {0}")]
    InvalidAmount(Decimal),

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("balance would overflow: {balance} + {amount}")]
    Overflow { balance: Decimal, amount: Decimal },
}

impl From<LedgerError> for Rejection {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount(_) => Rejection::InvalidAmount,
            LedgerError::InsufficientFunds { needed, available } => {
                Rejection::InsufficientFunds { needed, available }
            }
            LedgerError::Overflow { .. } => Rejection::AmountTooLarge,
        }
    }
}

impl Account {
    /// Add `amount` to the balance.
    pub fn credit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                balance: self.balance,
                amount,
            })?;
        Ok(())
    }

    /// Take `amount` from the balance. The balance never goes below zero.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if self.balance - amount < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds {
                needed: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
