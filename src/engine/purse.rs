//! Administrator deposits and withdrawals.
//!
//! Both move a balance, so both run inside the engine's critical section and
//! persist the record together with the account.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use super::{EngineResult, WagerEngine};
use crate::storage::Store;
use crate::types::{Account, Deposit, Rejection, Verdict, Withdrawal};

impl<S: Store> WagerEngine<S> {
    /// Credit `amount` to an account.
    pub async fn deposit(
        &self,
        account_id: Uuid,
        amount: Decimal,
    ) -> EngineResult<Verdict<(Deposit, Account)>> {
        if amount <= Decimal::ZERO {
            return Ok(Verdict::Rejected(Rejection::InvalidAmount));
        }

        let _guard = self.critical.lock().await;

        let Some(mut account) = self.store.fetch_account(account_id).await? else {
            return Ok(Verdict::Rejected(Rejection::AccountNotFound));
        };

        if let Err(e) = account.credit(amount) {
            return Ok(Verdict::Rejected(e.into()));
        }

        let deposit = Deposit {
            id: Uuid::new_v4(),
            account_id,
            amount,
            created_at: Utc::now(),
        };
        self.store.insert_deposit(&deposit, &account).await?;

        info!(
            account_id = %account_id,
            amount = %amount,
            balance = %account.balance,
            "Deposit recorded"
        );

        Ok(Verdict::Accepted((deposit, account)))
    }

    /// Debit `amount` from an account. Never overdraws.
    pub async fn withdraw(
        &self,
        account_id: Uuid,
        amount: Decimal,
    ) -> EngineResult<Verdict<(Withdrawal, Account)>> {
        if amount <= Decimal::ZERO {
            return Ok(Verdict::Rejected(Rejection::InvalidAmount));
        }

        let _guard = self.critical.lock().await;

        let Some(mut account) = self.store.fetch_account(account_id).await? else {
            return Ok(Verdict::Rejected(Rejection::AccountNotFound));
        };

        if let Err(e) = account.debit(amount) {
            return Ok(Verdict::Rejected(e.into()));
        }

        let withdrawal = Withdrawal {
            id: Uuid::new_v4(),
            account_id,
            amount,
            created_at: Utc::now(),
        };
        self.store.insert_withdrawal(&withdrawal, &account).await?;

        info!(
            account_id = %account_id,
            amount = %amount,
            balance = %account.balance,
            "Withdrawal recorded"
        );

        Ok(Verdict::Accepted((withdrawal, account)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
