//! SQLite storage backend.
//!
//! Identifiers, money, odds and timestamps are stored as TEXT so decimals
//! round-trip exactly. Every write that touches more than one row runs in a
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use std::fmt::Display;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use super::{
    AccountStore, AutoBetStore, BetStore, EventStore, PurseStore, SelectionStore, StorageError,
    StorageResult,
};
use crate::types::{Account, AutoBetConfig, Bet, Deposit, Event, Selection, Withdrawal};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id          TEXT PRIMARY KEY,
    balance     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    sport       TEXT NOT NULL,
    begins_at   TEXT NOT NULL,
    finished    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS selections (
    id          TEXT PRIMARY KEY,
    event_id    TEXT NOT NULL REFERENCES events(id),
    name        TEXT NOT NULL,
    odds_home   TEXT NOT NULL,
    odds_away   TEXT NOT NULL,
    auto_odds   INTEGER NOT NULL DEFAULT 0,
    outcome     TEXT NOT NULL DEFAULT 'pending'
);

CREATE TABLE IF NOT EXISTS bets (
    id            TEXT PRIMARY KEY,
    account_id    TEXT NOT NULL REFERENCES accounts(id),
    selection_id  TEXT NOT NULL REFERENCES selections(id),
    chosen        TEXT NOT NULL,
    stake         TEXT NOT NULL,
    odds          TEXT NOT NULL,
    state         TEXT NOT NULL DEFAULT 'pending',
    placed_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS bets_by_selection ON bets (selection_id);
CREATE INDEX IF NOT EXISTS bets_by_account ON bets (account_id);

CREATE TABLE IF NOT EXISTS auto_bets (
    id                TEXT PRIMARY KEY,
    account_id        TEXT NOT NULL REFERENCES accounts(id),
    high_risk         INTEGER NOT NULL,
    balance_fraction  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS deposits (
    id          TEXT PRIMARY KEY,
    account_id  TEXT NOT NULL REFERENCES accounts(id),
    amount      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS withdrawals (
    id          TEXT PRIMARY KEY,
    account_id  TEXT NOT NULL REFERENCES accounts(id),
    amount      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
"#;

const SELECTION_COLUMNS: &str =
    "id, event_id, name, odds_home, odds_away, auto_odds, outcome";

const BET_COLUMNS: &str =
    "id, account_id, selection_id, chosen, stake, odds, state, placed_at";

/// Storage backend on a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a pool on `url` and create any missing tables.
    ///
    /// In-memory databases are per connection, so `sqlite::memory:` needs
    /// `max_connections = 1`.
    pub async fn connect(url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        info!(url, max_connections, "SQLite store ready");
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn parse<T>(table: &'static str, column: &str, raw: &str) -> StorageResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e| StorageError::Corrupt {
        table,
        message: format!("{column} = {raw:?}: {e}"),
    })
}

fn text<T>(row: &SqliteRow, table: &'static str, column: &str) -> StorageResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.try_get(column)?;
    parse(table, column, &raw)
}

/// Fixed-width UTC timestamps, so TEXT comparison orders them by time.
fn stamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn account_from_row(row: &SqliteRow) -> StorageResult<Account> {
    Ok(Account {
        id: text(row, "accounts", "id")?,
        balance: text(row, "accounts", "balance")?,
        created_at: text::<DateTime<Utc>>(row, "accounts", "created_at")?,
    })
}

fn selection_from_row(row: &SqliteRow) -> StorageResult<Selection> {
    Ok(Selection {
        id: text(row, "selections", "id")?,
        event_id: text(row, "selections", "event_id")?,
        name: row.try_get("name")?,
        odds_home: text(row, "selections", "odds_home")?,
        odds_away: text(row, "selections", "odds_away")?,
        auto_odds: row.try_get("auto_odds")?,
        outcome: text(row, "selections", "outcome")?,
    })
}

fn bet_from_row(row: &SqliteRow) -> StorageResult<Bet> {
    Ok(Bet {
        id: text(row, "bets", "id")?,
        account_id: text(row, "bets", "account_id")?,
        selection_id: text(row, "bets", "selection_id")?,
        chosen: text(row, "bets", "chosen")?,
        stake: text(row, "bets", "stake")?,
        odds: text(row, "bets", "odds")?,
        state: text(row, "bets", "state")?,
        placed_at: text::<DateTime<Utc>>(row, "bets", "placed_at")?,
    })
}

fn auto_bet_from_row(row: &SqliteRow) -> StorageResult<AutoBetConfig> {
    Ok(AutoBetConfig {
        id: text(row, "auto_bets", "id")?,
        account_id: text(row, "auto_bets", "account_id")?,
        high_risk: row.try_get("high_risk")?,
        balance_fraction: text(row, "auto_bets", "balance_fraction")?,
    })
}

async fn put_account(tx: &mut Transaction<'_, Sqlite>, account: &Account) -> StorageResult<()> {
    let result = sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
        .bind(account.balance.to_string())
        .bind(account.id.to_string())
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::Missing {
            table: "accounts",
            id: account.id,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl AccountStore for SqliteStore {
    async fn fetch_account(&self, id: Uuid) -> StorageResult<Option<Account>> {
        let row = sqlx::query("SELECT id, balance, created_at FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn insert_account(&self, account: &Account) -> StorageResult<()> {
        sqlx::query("INSERT INTO accounts (id, balance, created_at) VALUES (?, ?, ?)")
            .bind(account.id.to_string())
            .bind(account.balance.to_string())
            .bind(stamp(&account.created_at))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        put_account(&mut tx, account).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl SelectionStore for SqliteStore {
    async fn fetch_selection(&self, id: Uuid) -> StorageResult<Option<Selection>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECTION_COLUMNS} FROM selections WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(selection_from_row).transpose()
    }

    async fn update_selection(&self, selection: &Selection) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE selections SET name = ?, odds_home = ?, odds_away = ?, auto_odds = ?, outcome = ? \
             WHERE id = ?",
        )
        .bind(&selection.name)
        .bind(selection.odds_home.to_string())
        .bind(selection.odds_away.to_string())
        .bind(selection.auto_odds)
        .bind(selection.outcome.as_str())
        .bind(selection.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Missing {
                table: "selections",
                id: selection.id,
            });
        }
        Ok(())
    }

    async fn update_selection_odds(
        &self,
        id: Uuid,
        odds_home: Decimal,
        odds_away: Decimal,
    ) -> StorageResult<()> {
        let result = sqlx::query("UPDATE selections SET odds_home = ?, odds_away = ? WHERE id = ?")
            .bind(odds_home.to_string())
            .bind(odds_away.to_string())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Missing {
                table: "selections",
                id,
            });
        }
        Ok(())
    }

    async fn fetch_open_selections(&self) -> StorageResult<Vec<Selection>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECTION_COLUMNS} FROM selections WHERE outcome = 'pending' ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(selection_from_row).collect()
    }

    async fn fetch_auto_odds_selections(&self) -> StorageResult<Vec<Selection>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECTION_COLUMNS} FROM selections WHERE auto_odds = 1 ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(selection_from_row).collect()
    }
}

#[async_trait]
impl BetStore for SqliteStore {
    async fn fetch_bets_by_selection(&self, selection_id: Uuid) -> StorageResult<Vec<Bet>> {
        let rows = sqlx::query(&format!(
            "SELECT {BET_COLUMNS} FROM bets WHERE selection_id = ? ORDER BY rowid"
        ))
        .bind(selection_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(bet_from_row).collect()
    }

    async fn fetch_bets_by_account(&self, account_id: Uuid) -> StorageResult<Vec<Bet>> {
        let rows = sqlx::query(&format!(
            "SELECT {BET_COLUMNS} FROM bets WHERE account_id = ? ORDER BY rowid"
        ))
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(bet_from_row).collect()
    }

    async fn fetch_bets_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<Bet>> {
        let rows = sqlx::query(&format!(
            "SELECT {BET_COLUMNS} FROM bets WHERE placed_at >= ? AND placed_at < ? \
             ORDER BY placed_at, rowid"
        ))
        .bind(stamp(&from))
        .bind(stamp(&to))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(bet_from_row).collect()
    }

    async fn insert_bet(&self, bet: &Bet, account: &Account) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        put_account(&mut tx, account).await?;

        sqlx::query(&format!(
            "INSERT INTO bets ({BET_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(bet.id.to_string())
        .bind(bet.account_id.to_string())
        .bind(bet.selection_id.to_string())
        .bind(bet.chosen.as_str())
        .bind(bet.stake.to_string())
        .bind(bet.odds.to_string())
        .bind(bet.state.as_str())
        .bind(stamp(&bet.placed_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_bet(&self, bet: &Bet, account: &Account) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE bets SET state = ? WHERE id = ?")
            .bind(bet.state.as_str())
            .bind(bet.id.to_string())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::Missing {
                table: "bets",
                id: bet.id,
            });
        }

        put_account(&mut tx, account).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn insert_event(&self, event: &Event) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO events (id, name, sport, begins_at, finished) VALUES (?, ?, ?, ?, ?)")
            .bind(event.id.to_string())
            .bind(&event.name)
            .bind(&event.sport)
            .bind(stamp(&event.begins_at))
            .bind(event.finished)
            .execute(&mut *tx)
            .await?;

        for selection in &event.selections {
            sqlx::query(&format!(
                "INSERT INTO selections ({SELECTION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
            ))
            .bind(selection.id.to_string())
            .bind(event.id.to_string())
            .bind(&selection.name)
            .bind(selection.odds_home.to_string())
            .bind(selection.odds_away.to_string())
            .bind(selection.auto_odds)
            .bind(selection.outcome.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_event(&self, id: Uuid) -> StorageResult<Option<Event>> {
        let Some(row) =
            sqlx::query("SELECT id, name, sport, begins_at, finished FROM events WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        let selections = sqlx::query(&format!(
            "SELECT {SELECTION_COLUMNS} FROM selections WHERE event_id = ? ORDER BY rowid"
        ))
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(selection_from_row)
        .collect::<StorageResult<Vec<_>>>()?;

        Ok(Some(Event {
            id: text(&row, "events", "id")?,
            name: row.try_get("name")?,
            sport: row.try_get("sport")?,
            begins_at: text::<DateTime<Utc>>(&row, "events", "begins_at")?,
            finished: row.try_get("finished")?,
            selections,
        }))
    }

    async fn update_event(&self, event: &Event) -> StorageResult<()> {
        let result = sqlx::query("UPDATE events SET finished = ? WHERE id = ?")
            .bind(event.finished)
            .bind(event.id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Missing {
                table: "events",
                id: event.id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AutoBetStore for SqliteStore {
    async fn fetch_all_auto_bets(&self) -> StorageResult<Vec<AutoBetConfig>> {
        let rows = sqlx::query(
            "SELECT id, account_id, high_risk, balance_fraction FROM auto_bets ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(auto_bet_from_row).collect()
    }

    async fn fetch_auto_bets_by_account(&self, account_id: Uuid) -> StorageResult<Vec<AutoBetConfig>> {
        let rows = sqlx::query(
            "SELECT id, account_id, high_risk, balance_fraction FROM auto_bets \
             WHERE account_id = ? ORDER BY rowid",
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(auto_bet_from_row).collect()
    }

    async fn insert_auto_bet(&self, config: &AutoBetConfig) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO auto_bets (id, account_id, high_risk, balance_fraction) VALUES (?, ?, ?, ?)",
        )
        .bind(config.id.to_string())
        .bind(config.account_id.to_string())
        .bind(config.high_risk)
        .bind(config.balance_fraction.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_auto_bet(&self, id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM auto_bets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PurseStore for SqliteStore {
    async fn insert_deposit(&self, deposit: &Deposit, account: &Account) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        put_account(&mut tx, account).await?;

        sqlx::query("INSERT INTO deposits (id, account_id, amount, created_at) VALUES (?, ?, ?, ?)")
            .bind(deposit.id.to_string())
            .bind(deposit.account_id.to_string())
            .bind(deposit.amount.to_string())
            .bind(stamp(&deposit.created_at))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_withdrawal(&self, withdrawal: &Withdrawal, account: &Account) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        put_account(&mut tx, account).await?;

        sqlx::query(
            "INSERT INTO withdrawals (id, account_id, amount, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(withdrawal.id.to_string())
        .bind(withdrawal.account_id.to_string())
        .bind(withdrawal.amount.to_string())
        .bind(stamp(&withdrawal.created_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
