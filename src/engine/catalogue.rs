//! Accounts, events and auto-bet instructions.
//!
//! None of these move money, so they run outside the critical section.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use super::{EngineResult, WagerEngine};
use crate::storage::Store;
use crate::strategy::autobet::valid_fraction;
use crate::types::{Account, AutoBetConfig, Bet, Event, Outcome, Rejection, Selection, Verdict};

/// Admin input for a new selection.
#[derive(Debug, Clone)]
pub struct NewSelection {
    pub name: String,
    pub odds_home: Decimal,
    pub odds_away: Decimal,
    pub auto_odds: bool,
}

/// Admin input for a new event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub sport: String,
    pub begins_at: DateTime<Utc>,
    pub selections: Vec<NewSelection>,
}

impl NewEvent {
    fn validate(&self) -> Result<(), String> {
        if self.selections.is_empty() {
            return Err("no selections provided".into());
        }
        if self.begins_at < Utc::now() {
            return Err("begins at cannot be before now".into());
        }
        if self.name.trim().is_empty() {
            return Err("name not provided".into());
        }
        if self.sport.trim().is_empty() {
            return Err("sport not provided".into());
        }
        if let Some(s) = self
            .selections
            .iter()
            .find(|s| s.odds_home <= Decimal::ZERO || s.odds_away <= Decimal::ZERO)
        {
            return Err(format!("selection {} has non-positive odds", s.name));
        }
        Ok(())
    }
}

impl<S: Store> WagerEngine<S> {
    /// Open an account with a zero balance.
    pub async fn open_account(&self) -> EngineResult<Account> {
        let account = Account::new();
        self.store.insert_account(&account).await?;
        info!(account_id = %account.id, "Account opened");
        Ok(account)
    }

    pub async fn account(&self, id: Uuid) -> EngineResult<Option<Account>> {
        Ok(self.store.fetch_account(id).await?)
    }

    /// Create an event with its selections, all pending.
    pub async fn create_event(&self, new: NewEvent) -> EngineResult<Verdict<Event>> {
        if let Err(reason) = new.validate() {
            return Ok(Verdict::Rejected(Rejection::InvalidEvent(reason)));
        }

        let id = Uuid::new_v4();
        let selections = new
            .selections
            .into_iter()
            .map(|s| Selection {
                id: Uuid::new_v4(),
                event_id: id,
                name: s.name,
                odds_home: s.odds_home,
                odds_away: s.odds_away,
                auto_odds: s.auto_odds,
                outcome: Outcome::Pending,
            })
            .collect();

        let event = Event {
            id,
            name: new.name,
            sport: new.sport,
            begins_at: new.begins_at,
            finished: false,
            selections,
        };
        self.store.insert_event(&event).await?;

        info!(
            event_id = %event.id,
            name = %event.name,
            selections = event.selections.len(),
            "Event created"
        );

        Ok(Verdict::Accepted(event))
    }

    pub async fn event(&self, id: Uuid) -> EngineResult<Option<Event>> {
        Ok(self.store.fetch_event(id).await?)
    }

    /// Register a standing auto-bet instruction for an account.
    pub async fn create_auto_bet(
        &self,
        account_id: Uuid,
        high_risk: bool,
        balance_fraction: Decimal,
    ) -> EngineResult<Verdict<AutoBetConfig>> {
        if !valid_fraction(balance_fraction) {
            return Ok(Verdict::Rejected(Rejection::InvalidBalanceFraction));
        }

        if self.store.fetch_account(account_id).await?.is_none() {
            return Ok(Verdict::Rejected(Rejection::AccountNotFound));
        }

        let config = AutoBetConfig {
            id: Uuid::new_v4(),
            account_id,
            high_risk,
            balance_fraction,
        };
        self.store.insert_auto_bet(&config).await?;

        info!(
            auto_bet_id = %config.id,
            account_id = %account_id,
            high_risk,
            fraction = %balance_fraction,
            "Auto-bet registered"
        );

        Ok(Verdict::Accepted(config))
    }

    /// Remove an auto-bet instruction. Bets it already placed stay.
    pub async fn delete_auto_bet(&self, id: Uuid) -> EngineResult<bool> {
        let removed = self.store.delete_auto_bet(id).await?;
        if removed {
            info!(auto_bet_id = %id, "Auto-bet removed");
        }
        Ok(removed)
    }

    pub async fn auto_bets_for(&self, account_id: Uuid) -> EngineResult<Vec<AutoBetConfig>> {
        Ok(self.store.fetch_auto_bets_by_account(account_id).await?)
    }

    /// Bet history for an account.
    pub async fn bets_for(&self, account_id: Uuid) -> EngineResult<Vec<Bet>> {
        Ok(self.store.fetch_bets_by_account(account_id).await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
