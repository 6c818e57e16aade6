//! Shared setup: an engine on a fresh in-memory store with one open event.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use wagerbook::engine::catalogue::{NewEvent, NewSelection};
use wagerbook::engine::placement::PlacedBet;
use wagerbook::engine::WagerEngine;
use wagerbook::storage::memory::MemoryStore;
use wagerbook::types::{Account, BetRequest, Event, Outcome, Selection};

pub struct Book {
    pub engine: Arc<WagerEngine<MemoryStore>>,
    pub store: Arc<MemoryStore>,
    pub event: Event,
}

impl Book {
    /// One event with a fixed-odds "Winner" (2.0 / 1.8) and an auto-odds
    /// "Both score" (1.5 / 2.5) selection.
    pub async fn open() -> Self {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(WagerEngine::new(store.clone()));

        let event = engine
            .create_event(NewEvent {
                name: "City vs United".into(),
                sport: "football".into(),
                begins_at: Utc::now() + Duration::hours(3),
                selections: vec![
                    NewSelection {
                        name: "Winner".into(),
                        odds_home: dec!(2.0),
                        odds_away: dec!(1.8),
                        auto_odds: false,
                    },
                    NewSelection {
                        name: "Both score".into(),
                        odds_home: dec!(1.5),
                        odds_away: dec!(2.5),
                        auto_odds: true,
                    },
                ],
            })
            .await
            .unwrap()
            .accepted()
            .unwrap();

        Self {
            engine,
            store,
            event,
        }
    }

    pub fn winner(&self) -> &Selection {
        &self.event.selections[0]
    }

    pub fn both_score(&self) -> &Selection {
        &self.event.selections[1]
    }

    /// Open an account and fund it through a deposit.
    pub async fn funded(&self, amount: Decimal) -> Account {
        let account = self.engine.open_account().await.unwrap();
        if amount > Decimal::ZERO {
            self.engine.deposit(account.id, amount).await.unwrap();
        }
        self.engine.account(account.id).await.unwrap().unwrap()
    }

    pub async fn back(
        &self,
        account: &Account,
        selection: &Selection,
        chosen: Outcome,
        stake: Decimal,
    ) -> PlacedBet {
        self.engine
            .place_bet(BetRequest {
                account_id: account.id,
                selection_id: selection.id,
                chosen,
                stake,
            })
            .await
            .unwrap()
            .accepted()
            .unwrap()
    }

    pub async fn balance(&self, id: Uuid) -> Decimal {
        self.engine.account(id).await.unwrap().unwrap().balance
    }
}
