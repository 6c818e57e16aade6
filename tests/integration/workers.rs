//! Background workers driven on a paused clock.

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use wagerbook::storage::SelectionStore;
use wagerbook::strategy::autobet::AutoBetSizing;
use wagerbook::types::Outcome;
use wagerbook::workers::autobet::AutoBetJob;
use wagerbook::workers::odds::AutoOddsJob;
use wagerbook::workers::PeriodicWorker;

use crate::harness::Book;

#[tokio::test(start_paused = true)]
async fn test_workers_run_until_stopped() {
    let book = Book::open().await;
    let dana = book.funded(dec!(1000)).await;
    book.engine
        .create_auto_bet(dana.id, true, dec!(0.1))
        .await
        .unwrap();

    let auto_bet = PeriodicWorker::start(
        Arc::new(AutoBetJob::new(book.engine.clone(), AutoBetSizing::default())),
        Duration::from_secs(60),
    );
    let auto_odds = PeriodicWorker::start(
        Arc::new(AutoOddsJob::new(book.store.clone())),
        Duration::from_secs(90),
    );

    // Auto-bets fire at 60 and 120, odds move at 90.
    tokio::time::sleep(Duration::from_secs(130)).await;
    auto_bet.stop().await;
    auto_odds.stop().await;

    let bets = book.engine.bets_for(dana.id).await.unwrap();
    assert_eq!(bets.len(), 2);
    // High risk goes for the 2.5 away price on "Both score".
    assert!(bets.iter().all(|b| b.selection_id == book.both_score().id));
    assert!(bets.iter().all(|b| b.chosen == Outcome::Away));
    assert_eq!(bets[0].stake, dec!(100));
    assert_eq!(bets[1].stake, dec!(90));
    assert_eq!(bets[0].odds, dec!(2.5));

    // One bet at the 90s reprice: too few to move the price.
    let sel = book
        .store
        .fetch_selection(book.both_score().id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sel.odds_away, dec!(2.5));
    assert_eq!(bets[1].odds, dec!(2.5));
    assert_eq!(book.balance(dana.id).await, dec!(810));
}
