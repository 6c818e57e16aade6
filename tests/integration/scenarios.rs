//! Ledger walkthroughs from funding to settlement.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use wagerbook::engine::settlement::Resolution;
use wagerbook::storage::{BetStore, SelectionStore};
use wagerbook::strategy::autobet::AutoBetSizing;
use wagerbook::types::{BetRequest, BetState, Outcome, Rejection};
use wagerbook::workers::autobet::AutoBetJob;
use wagerbook::workers::odds::AutoOddsJob;

use crate::harness::Book;

#[tokio::test]
async fn test_stake_is_debited_on_placement() {
    let book = Book::open().await;
    let alice = book.funded(dec!(100)).await;

    let placed = book.back(&alice, book.winner(), Outcome::Home, dec!(40)).await;

    assert_eq!(placed.account.balance, dec!(60));
    assert_eq!(placed.bet.state, BetState::Pending);
    assert_eq!(placed.bet.odds, dec!(2.0));
    assert_eq!(book.balance(alice.id).await, dec!(60));
}

#[tokio::test]
async fn test_winner_paid_at_locked_odds() {
    let book = Book::open().await;
    let alice = book.funded(dec!(100)).await;
    let placed = book.back(&alice, book.winner(), Outcome::Home, dec!(40)).await;

    let resolution = book
        .engine
        .resolve_selection(book.winner().id, Outcome::Home)
        .await
        .unwrap()
        .accepted()
        .unwrap();

    let Resolution::Settled(report) = resolution else {
        panic!("expected a settlement");
    };
    assert_eq!(report.won, 1);
    assert_eq!(report.paid_out, dec!(80));
    assert_eq!(book.balance(alice.id).await, dec!(140));

    let bets = book.engine.bets_for(alice.id).await.unwrap();
    assert_eq!(bets[0].id, placed.bet.id);
    assert_eq!(bets[0].state, BetState::Won);
}

#[tokio::test]
async fn test_loser_gets_nothing() {
    let book = Book::open().await;
    let alice = book.funded(dec!(100)).await;
    book.back(&alice, book.winner(), Outcome::Home, dec!(40)).await;

    book.engine
        .resolve_selection(book.winner().id, Outcome::Away)
        .await
        .unwrap();

    assert_eq!(book.balance(alice.id).await, dec!(60));
    let bets = book.engine.bets_for(alice.id).await.unwrap();
    assert_eq!(bets[0].state, BetState::Lost);
}

#[tokio::test]
async fn test_void_refunds_every_stake() {
    let book = Book::open().await;
    let alice = book.funded(dec!(100)).await;
    let bob = book.funded(dec!(50)).await;
    book.back(&alice, book.winner(), Outcome::Home, dec!(30)).await;
    book.back(&bob, book.winner(), Outcome::Away, dec!(20)).await;

    book.engine
        .resolve_selection(book.winner().id, Outcome::Void)
        .await
        .unwrap();

    assert_eq!(book.balance(alice.id).await, dec!(100));
    assert_eq!(book.balance(bob.id).await, dec!(50));
}

#[tokio::test]
async fn test_dust_auto_bet_is_skipped() {
    let book = Book::open().await;
    let carol = book.funded(dec!(5)).await;
    book.engine
        .create_auto_bet(carol.id, false, dec!(0.1))
        .await
        .unwrap();

    let job = AutoBetJob::new(book.engine.clone(), AutoBetSizing::default());
    let report = job.run().await.unwrap();

    assert_eq!(report.placed, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(book.balance(carol.id).await, dec!(5));
    assert!(book.engine.bets_for(carol.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_auto_odds_follow_the_money() {
    let book = Book::open().await;
    let punter = book.funded(dec!(100)).await;
    for chosen in [Outcome::Home, Outcome::Home, Outcome::Home, Outcome::Away] {
        book.back(&punter, book.both_score(), chosen, dec!(5)).await;
    }

    let report = AutoOddsJob::new(book.store.clone()).run().await.unwrap();
    assert_eq!(report.repriced, 1);

    let priced = book
        .store
        .fetch_selection(book.both_score().id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(priced.odds_home, dec!(2.5));
    assert_eq!(priced.odds_away, dec!(1.5));

    // The fixed-odds selection is never repriced.
    let fixed = book.store.fetch_selection(book.winner().id).await.unwrap().unwrap();
    assert_eq!(fixed.odds_home, dec!(2.0));
}

#[tokio::test]
async fn test_repricing_leaves_placed_bets_alone() {
    let book = Book::open().await;
    let punter = book.funded(dec!(100)).await;
    let first = book.back(&punter, book.both_score(), Outcome::Away, dec!(10)).await;
    book.back(&punter, book.both_score(), Outcome::Away, dec!(10)).await;

    AutoOddsJob::new(book.store.clone()).run().await.unwrap();
    let late = book.back(&punter, book.both_score(), Outcome::Away, dec!(10)).await;

    assert_eq!(first.bet.odds, dec!(2.5));
    assert_eq!(late.bet.odds, dec!(3));

    book.engine
        .resolve_selection(book.both_score().id, Outcome::Away)
        .await
        .unwrap();

    let bets = book.store.fetch_bets_by_selection(book.both_score().id).await.unwrap();
    let odds: Vec<Decimal> = bets.iter().map(|b| b.odds).collect();
    assert_eq!(odds, vec![dec!(2.5), dec!(2.5), dec!(3)]);
    // 70 left after staking, plus 25 + 25 + 30 back.
    assert_eq!(book.balance(punter.id).await, dec!(150));
}

#[tokio::test]
async fn test_outcome_is_write_once() {
    let book = Book::open().await;
    let alice = book.funded(dec!(100)).await;
    book.back(&alice, book.winner(), Outcome::Home, dec!(10)).await;

    book.engine
        .resolve_selection(book.winner().id, Outcome::Home)
        .await
        .unwrap();
    let again = book
        .engine
        .resolve_selection(book.winner().id, Outcome::Away)
        .await
        .unwrap();

    assert_eq!(again.accepted(), Some(Resolution::Unchanged));
    let sel = book.store.fetch_selection(book.winner().id).await.unwrap().unwrap();
    assert_eq!(sel.outcome, Outcome::Home);
    assert_eq!(book.balance(alice.id).await, dec!(110));
}

#[tokio::test]
async fn test_finalized_selection_takes_no_bets() {
    let book = Book::open().await;
    let alice = book.funded(dec!(100)).await;
    book.engine
        .resolve_selection(book.winner().id, Outcome::Away)
        .await
        .unwrap();

    let verdict = book
        .engine
        .place_bet(BetRequest {
            account_id: alice.id,
            selection_id: book.winner().id,
            chosen: Outcome::Home,
            stake: dec!(10),
        })
        .await
        .unwrap();

    assert_eq!(verdict.rejection(), Some(&Rejection::EventAlreadyFinalized));
    assert_eq!(book.balance(alice.id).await, dec!(100));
}

#[tokio::test]
async fn test_event_finishes_with_last_selection() {
    let book = Book::open().await;

    book.engine
        .resolve_selection(book.winner().id, Outcome::Home)
        .await
        .unwrap();
    assert!(!book.engine.event(book.event.id).await.unwrap().unwrap().finished);

    book.engine
        .resolve_selection(book.both_score().id, Outcome::Void)
        .await
        .unwrap();
    assert!(book.engine.event(book.event.id).await.unwrap().unwrap().finished);
}

#[tokio::test]
async fn test_money_is_conserved() {
    let book = Book::open().await;
    let alice = book.funded(dec!(100)).await;
    let bob = book.funded(dec!(80)).await;
    let carol = book.funded(dec!(60)).await;

    book.back(&alice, book.winner(), Outcome::Home, dec!(25)).await;
    book.back(&bob, book.winner(), Outcome::Away, dec!(30)).await;
    book.back(&carol, book.both_score(), Outcome::Away, dec!(12.34)).await;
    book.back(&alice, book.both_score(), Outcome::Home, dec!(7.5)).await;
    book.engine.withdraw(bob.id, dec!(10)).await.unwrap();

    book.engine
        .resolve_selection(book.winner().id, Outcome::Home)
        .await
        .unwrap();
    book.engine
        .resolve_selection(book.both_score().id, Outcome::Void)
        .await
        .unwrap();

    let deposited: Decimal = book.store.deposits().iter().map(|d| d.amount).sum();
    let withdrawn: Decimal = book.store.withdrawals().iter().map(|w| w.amount).sum();
    // Winner pays 25 × 2.0, loser forfeits 30, void stakes come back.
    let net_payout = dec!(50) - dec!(25) - dec!(30);

    assert_eq!(deposited, dec!(240));
    assert_eq!(book.store.total_balance(), deposited - withdrawn + net_payout);
    assert_eq!(book.balance(carol.id).await, dec!(60));
}

#[tokio::test]
async fn test_unknown_ids_are_rejections() {
    let book = Book::open().await;

    let verdict = book
        .engine
        .resolve_selection(Uuid::new_v4(), Outcome::Home)
        .await
        .unwrap();
    assert_eq!(verdict.rejection(), Some(&Rejection::SelectionNotFound));

    let verdict = book.engine.deposit(Uuid::new_v4(), dec!(10)).await.unwrap();
    assert_eq!(verdict.rejection(), Some(&Rejection::AccountNotFound));
}
