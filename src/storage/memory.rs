//! In-memory storage backend.
//!
//! All records live behind a single `std::sync::Mutex`, and every operation
//! does its writes under one acquisition, so multi-record writes are atomic.
//! Failures can be injected per operation name to exercise error paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    AccountStore, AutoBetStore, BetStore, EventStore, PurseStore, SelectionStore, StorageError,
    StorageResult,
};
use crate::types::{Account, AutoBetConfig, Bet, Deposit, Event, Selection, Withdrawal};

#[derive(Debug, Clone)]
struct EventRecord {
    id: Uuid,
    name: String,
    sport: String,
    begins_at: DateTime<Utc>,
    finished: bool,
    selection_ids: Vec<Uuid>,
}

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    // Vecs keep insertion order so listings are deterministic.
    selections: Vec<Selection>,
    bets: Vec<Bet>,
    events: HashMap<Uuid, EventRecord>,
    auto_bets: Vec<AutoBetConfig>,
    deposits: Vec<Deposit>,
    withdrawals: Vec<Withdrawal>,
}

impl Tables {
    fn selection_mut(&mut self, id: Uuid) -> StorageResult<&mut Selection> {
        self.selections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StorageError::Missing { table: "selection", id })
    }

    fn put_account(&mut self, account: &Account) -> StorageResult<()> {
        match self.accounts.get_mut(&account.id) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(StorageError::Missing {
                table: "account",
                id: account.id,
            }),
        }
    }
}

/// Storage backend that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call to `operation` (e.g. `"update_selection"`)
    /// fail with [`StorageError::Unavailable`].
    pub fn fail_on(&self, operation: &'static str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(operation);
        }
    }

    /// Clear every injected failure.
    pub fn clear_failures(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
    }

    /// Drop an account, leaving its bets and auto-bets behind.
    pub fn remove_account(&self, id: Uuid) -> Option<Account> {
        self.tables.lock().ok()?.accounts.remove(&id)
    }

    /// Sum of every account balance. Handy for conservation checks.
    pub fn total_balance(&self) -> Decimal {
        self.tables
            .lock()
            .map(|t| t.accounts.values().map(|a| a.balance).sum())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn deposits(&self) -> Vec<Deposit> {
        self.tables
            .lock()
            .map(|t| t.deposits.clone())
            .unwrap_or_default()
    }

    pub fn withdrawals(&self) -> Vec<Withdrawal> {
        self.tables
            .lock()
            .map(|t| t.withdrawals.clone())
            .unwrap_or_default()
    }

    fn check(&self, operation: &'static str) -> StorageResult<()> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| StorageError::Unavailable("failure registry poisoned".into()))?;
        if failing.contains(operation) {
            return Err(StorageError::Unavailable(format!("injected failure in {operation}")));
        }
        Ok(())
    }

    fn tables(&self, operation: &'static str) -> StorageResult<MutexGuard<'_, Tables>> {
        self.check(operation)?;
        self.tables
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".into()))
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn fetch_account(&self, id: Uuid) -> StorageResult<Option<Account>> {
        let t = self.tables("fetch_account")?;
        Ok(t.accounts.get(&id).cloned())
    }

    async fn insert_account(&self, account: &Account) -> StorageResult<()> {
        let mut t = self.tables("insert_account")?;
        t.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> StorageResult<()> {
        let mut t = self.tables("update_account")?;
        t.put_account(account)
    }
}

#[async_trait]
impl SelectionStore for MemoryStore {
    async fn fetch_selection(&self, id: Uuid) -> StorageResult<Option<Selection>> {
        let t = self.tables("fetch_selection")?;
        Ok(t.selections.iter().find(|s| s.id == id).cloned())
    }

    async fn update_selection(&self, selection: &Selection) -> StorageResult<()> {
        let mut t = self.tables("update_selection")?;
        *t.selection_mut(selection.id)? = selection.clone();
        Ok(())
    }

    async fn update_selection_odds(
        &self,
        id: Uuid,
        odds_home: Decimal,
        odds_away: Decimal,
    ) -> StorageResult<()> {
        let mut t = self.tables("update_selection_odds")?;
        let sel = t.selection_mut(id)?;
        sel.odds_home = odds_home;
        sel.odds_away = odds_away;
        Ok(())
    }

    async fn fetch_open_selections(&self) -> StorageResult<Vec<Selection>> {
        let t = self.tables("fetch_open_selections")?;
        Ok(t.selections.iter().filter(|s| !s.is_finalized()).cloned().collect())
    }

    async fn fetch_auto_odds_selections(&self) -> StorageResult<Vec<Selection>> {
        let t = self.tables("fetch_auto_odds_selections")?;
        Ok(t.selections.iter().filter(|s| s.auto_odds).cloned().collect())
    }
}

#[async_trait]
impl BetStore for MemoryStore {
    async fn fetch_bets_by_selection(&self, selection_id: Uuid) -> StorageResult<Vec<Bet>> {
        let t = self.tables("fetch_bets_by_selection")?;
        Ok(t.bets
            .iter()
            .filter(|b| b.selection_id == selection_id)
            .cloned()
            .collect())
    }

    async fn fetch_bets_by_account(&self, account_id: Uuid) -> StorageResult<Vec<Bet>> {
        let t = self.tables("fetch_bets_by_account")?;
        Ok(t.bets
            .iter()
            .filter(|b| b.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn fetch_bets_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<Bet>> {
        let t = self.tables("fetch_bets_between")?;
        let mut bets: Vec<Bet> = t
            .bets
            .iter()
            .filter(|b| b.placed_at >= from && b.placed_at < to)
            .cloned()
            .collect();
        bets.sort_by_key(|b| b.placed_at);
        Ok(bets)
    }

    async fn insert_bet(&self, bet: &Bet, account: &Account) -> StorageResult<()> {
        let mut t = self.tables("insert_bet")?;
        t.put_account(account)?;
        t.bets.push(bet.clone());
        Ok(())
    }

    async fn update_bet(&self, bet: &Bet, account: &Account) -> StorageResult<()> {
        let mut t = self.tables("update_bet")?;
        if !t.bets.iter().any(|b| b.id == bet.id) {
            return Err(StorageError::Missing { table: "bet", id: bet.id });
        }
        t.put_account(account)?;
        if let Some(existing) = t.bets.iter_mut().find(|b| b.id == bet.id) {
            existing.state = bet.state;
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> StorageResult<()> {
        let mut t = self.tables("insert_event")?;
        t.events.insert(
            event.id,
            EventRecord {
                id: event.id,
                name: event.name.clone(),
                sport: event.sport.clone(),
                begins_at: event.begins_at,
                finished: event.finished,
                selection_ids: event.selections.iter().map(|s| s.id).collect(),
            },
        );
        t.selections.extend(event.selections.iter().cloned());
        Ok(())
    }

    async fn fetch_event(&self, id: Uuid) -> StorageResult<Option<Event>> {
        let t = self.tables("fetch_event")?;
        let Some(record) = t.events.get(&id) else {
            return Ok(None);
        };

        let selections = record
            .selection_ids
            .iter()
            .filter_map(|sid| t.selections.iter().find(|s| s.id == *sid).cloned())
            .collect();

        Ok(Some(Event {
            id: record.id,
            name: record.name.clone(),
            sport: record.sport.clone(),
            begins_at: record.begins_at,
            finished: record.finished,
            selections,
        }))
    }

    async fn update_event(&self, event: &Event) -> StorageResult<()> {
        let mut t = self.tables("update_event")?;
        let record = t.events.get_mut(&event.id).ok_or(StorageError::Missing {
            table: "event",
            id: event.id,
        })?;
        record.finished = event.finished;
        Ok(())
    }
}

#[async_trait]
impl AutoBetStore for MemoryStore {
    async fn fetch_all_auto_bets(&self) -> StorageResult<Vec<AutoBetConfig>> {
        let t = self.tables("fetch_all_auto_bets")?;
        Ok(t.auto_bets.clone())
    }

    async fn fetch_auto_bets_by_account(&self, account_id: Uuid) -> StorageResult<Vec<AutoBetConfig>> {
        let t = self.tables("fetch_auto_bets_by_account")?;
        Ok(t.auto_bets
            .iter()
            .filter(|a| a.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn insert_auto_bet(&self, config: &AutoBetConfig) -> StorageResult<()> {
        let mut t = self.tables("insert_auto_bet")?;
        t.auto_bets.push(config.clone());
        Ok(())
    }

    async fn delete_auto_bet(&self, id: Uuid) -> StorageResult<bool> {
        let mut t = self.tables("delete_auto_bet")?;
        let before = t.auto_bets.len();
        t.auto_bets.retain(|a| a.id != id);
        Ok(t.auto_bets.len() != before)
    }
}

#[async_trait]
impl PurseStore for MemoryStore {
    async fn insert_deposit(&self, deposit: &Deposit, account: &Account) -> StorageResult<()> {
        let mut t = self.tables("insert_deposit")?;
        t.put_account(account)?;
        t.deposits.push(deposit.clone());
        Ok(())
    }

    async fn insert_withdrawal(&self, withdrawal: &Withdrawal, account: &Account) -> StorageResult<()> {
        let mut t = self.tables("insert_withdrawal")?;
        t.put_account(account)?;
        t.withdrawals.push(withdrawal.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
