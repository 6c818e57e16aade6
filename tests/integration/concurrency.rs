//! Placement, settlement and purse operations racing on one engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::task::JoinSet;

use wagerbook::engine::WagerEngine;
use wagerbook::storage::BetStore;
use wagerbook::storage::memory::MemoryStore;
use wagerbook::types::{BetRequest, BetState, Outcome};

use crate::harness::Book;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_placements_never_overdraw() {
    let book = Book::open().await;
    let alice = book.funded(dec!(100)).await;

    let mut tasks = JoinSet::new();
    for _ in 0..50 {
        let engine: Arc<WagerEngine<MemoryStore>> = book.engine.clone();
        let request = BetRequest {
            account_id: alice.id,
            selection_id: book.winner().id,
            chosen: Outcome::Home,
            stake: dec!(7),
        };
        tasks.spawn(async move { engine.place_bet(request).await });
    }

    let mut accepted = 0;
    while let Some(joined) = tasks.join_next().await {
        if joined.unwrap().unwrap().is_accepted() {
            accepted += 1;
        }
    }

    // 14 × 7 = 98 fits, a 15th would not.
    assert_eq!(accepted, 14);
    assert_eq!(book.balance(alice.id).await, dec!(2));
    assert_eq!(book.engine.bets_for(alice.id).await.unwrap().len(), 14);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_placement_racing_settlement_is_all_or_nothing() {
    let book = Book::open().await;
    let mut punters = Vec::new();
    for _ in 0..20 {
        punters.push(book.funded(dec!(10)).await);
    }

    let mut tasks = JoinSet::new();
    for punter in &punters {
        let engine = book.engine.clone();
        let request = BetRequest {
            account_id: punter.id,
            selection_id: book.winner().id,
            chosen: Outcome::Home,
            stake: dec!(10),
        };
        tasks.spawn(async move {
            engine.place_bet(request).await.unwrap();
        });
    }
    let engine = book.engine.clone();
    let winner = book.winner().id;
    tasks.spawn(async move {
        engine.resolve_selection(winner, Outcome::Home).await.unwrap();
    });
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    // Every accepted bet was placed before the outcome and therefore paid;
    // every rejected one kept its stake.
    let bets = book.store.fetch_bets_by_selection(winner).await.unwrap();
    assert!(bets.iter().all(|b| b.state == BetState::Won));
    for punter in &punters {
        let placed = bets.iter().any(|b| b.account_id == punter.id);
        let expected = if placed { dec!(20) } else { dec!(10) };
        assert_eq!(book.balance(punter.id).await, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_deposits_and_withdrawals_interleave_safely() {
    let book = Book::open().await;
    let alice = book.funded(dec!(50)).await;

    let mut tasks = JoinSet::new();
    for i in 0..40 {
        let engine = book.engine.clone();
        let id = alice.id;
        tasks.spawn(async move {
            if i % 2 == 0 {
                engine.deposit(id, dec!(5)).await.unwrap().is_accepted()
            } else {
                engine.withdraw(id, dec!(8)).await.unwrap().is_accepted()
            }
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    let deposited: Decimal = book.store.deposits().iter().map(|d| d.amount).sum();
    let withdrawn: Decimal = book.store.withdrawals().iter().map(|w| w.amount).sum();
    let balance = book.balance(alice.id).await;

    assert!(balance >= Decimal::ZERO);
    assert_eq!(balance, deposited - withdrawn);
}
