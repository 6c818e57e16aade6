//! Persistence layer.
//!
//! The engine talks to storage only through the capability traits below, one
//! per collaborator. Operations that move money take every record they touch
//! so a backend can commit them as a single unit.
//!
//! Two backends ship with the crate: [`memory::MemoryStore`] for tests and
//! embedding, [`sqlite::SqliteStore`] for the service binary.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::strategy::autobet::best_open_selection;
use crate::types::{
    Account, AutoBetConfig, Bet, Deposit, Event, RiskAppetite, Selection, Withdrawal,
};

/// Failure of the storage collaborator. Always a system error.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record ({table}): {message}")]
    Corrupt { table: &'static str, message: String },

    #[error("Record not found ({table}): {id}")]
    Missing { table: &'static str, id: Uuid },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn fetch_account(&self, id: Uuid) -> StorageResult<Option<Account>>;

    async fn insert_account(&self, account: &Account) -> StorageResult<()>;

    async fn update_account(&self, account: &Account) -> StorageResult<()>;
}

#[async_trait]
pub trait SelectionStore: Send + Sync {
    async fn fetch_selection(&self, id: Uuid) -> StorageResult<Option<Selection>>;

    /// Persist the whole selection, outcome included.
    async fn update_selection(&self, selection: &Selection) -> StorageResult<()>;

    /// Persist only the two prices. Never touches the outcome.
    async fn update_selection_odds(
        &self,
        id: Uuid,
        odds_home: Decimal,
        odds_away: Decimal,
    ) -> StorageResult<()>;

    /// Every selection whose outcome is still pending.
    async fn fetch_open_selections(&self) -> StorageResult<Vec<Selection>>;

    /// Every selection flagged for automatic pricing.
    async fn fetch_auto_odds_selections(&self) -> StorageResult<Vec<Selection>>;

    /// The open selection an auto-bet with `appetite` should go after.
    async fn fetch_best_open_selection(
        &self,
        appetite: RiskAppetite,
    ) -> StorageResult<Option<Selection>> {
        let open = self.fetch_open_selections().await?;
        Ok(best_open_selection(&open, appetite).cloned())
    }
}

#[async_trait]
pub trait BetStore: Send + Sync {
    async fn fetch_bets_by_selection(&self, selection_id: Uuid) -> StorageResult<Vec<Bet>>;

    async fn fetch_bets_by_account(&self, account_id: Uuid) -> StorageResult<Vec<Bet>>;

    /// Bets placed in `[from, to)`, oldest first.
    async fn fetch_bets_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<Bet>>;

    /// Record a new bet together with the debited account.
    async fn insert_bet(&self, bet: &Bet, account: &Account) -> StorageResult<()>;

    /// Record a bet's new state together with the credited account.
    async fn update_bet(&self, bet: &Bet, account: &Account) -> StorageResult<()>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert the event and all of its selections.
    async fn insert_event(&self, event: &Event) -> StorageResult<()>;

    /// Fetch the event with its selections.
    async fn fetch_event(&self, id: Uuid) -> StorageResult<Option<Event>>;

    /// Persist the event's `finished` flag.
    async fn update_event(&self, event: &Event) -> StorageResult<()>;
}

#[async_trait]
pub trait AutoBetStore: Send + Sync {
    async fn fetch_all_auto_bets(&self) -> StorageResult<Vec<AutoBetConfig>>;

    async fn fetch_auto_bets_by_account(&self, account_id: Uuid) -> StorageResult<Vec<AutoBetConfig>>;

    async fn insert_auto_bet(&self, config: &AutoBetConfig) -> StorageResult<()>;

    /// Returns false when no config had that id.
    async fn delete_auto_bet(&self, id: Uuid) -> StorageResult<bool>;
}

#[async_trait]
pub trait PurseStore: Send + Sync {
    /// Record a deposit together with the credited account.
    async fn insert_deposit(&self, deposit: &Deposit, account: &Account) -> StorageResult<()>;

    /// Record a withdrawal together with the debited account.
    async fn insert_withdrawal(&self, withdrawal: &Withdrawal, account: &Account) -> StorageResult<()>;
}

/// Everything the wager engine needs from a backend.
pub trait Store:
    AccountStore + SelectionStore + BetStore + EventStore + AutoBetStore + PurseStore + 'static
{
}

impl<T> Store for T where
    T: AccountStore + SelectionStore + BetStore + EventStore + AutoBetStore + PurseStore + 'static
{
}
