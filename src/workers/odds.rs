//! Automatic repricing of selections flagged `auto_odds`.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::PeriodicJob;
use crate::engine::EngineError;
use crate::storage::{BetStore, SelectionStore, StorageResult};
use crate::strategy::odds::quote;

/// Counts for one repricing pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OddsReport {
    pub examined: usize,
    pub repriced: usize,
    /// Finalized, or too few bets to price.
    pub skipped: usize,
    pub failed: usize,
}

/// Reprices auto-odds selections from their bet distribution.
///
/// Writes only the two prices, so it never races a settlement on the
/// outcome. Bets already placed keep their snapshot odds.
pub struct AutoOddsJob<S> {
    store: Arc<S>,
}

impl<S: SelectionStore + BetStore + 'static> AutoOddsJob<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn run(&self) -> StorageResult<OddsReport> {
        let selections = self.store.fetch_auto_odds_selections().await?;
        let mut report = OddsReport::default();

        for selection in selections {
            report.examined += 1;

            if selection.is_finalized() {
                report.skipped += 1;
                continue;
            }

            let bets = match self.store.fetch_bets_by_selection(selection.id).await {
                Ok(bets) => bets,
                Err(e) => {
                    warn!(selection_id = %selection.id, error = %e, "Could not load bets");
                    report.failed += 1;
                    continue;
                }
            };

            let Some(q) = quote(&bets) else {
                report.skipped += 1;
                continue;
            };

            match self
                .store
                .update_selection_odds(selection.id, q.odds_home, q.odds_away)
                .await
            {
                Ok(()) => {
                    debug!(
                        selection = %selection.name,
                        bets = bets.len(),
                        home = %q.odds_home,
                        away = %q.odds_away,
                        "Selection repriced"
                    );
                    report.repriced += 1;
                }
                Err(e) => {
                    warn!(selection_id = %selection.id, error = %e, "Could not store odds");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl<S: SelectionStore + BetStore + 'static> PeriodicJob for AutoOddsJob<S> {
    type Report = OddsReport;

    fn name(&self) -> &'static str {
        "auto_odds"
    }

    async fn tick(&self) -> Result<OddsReport, EngineError> {
        Ok(self.run().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use crate::types::{Account, Bet, BetState, Outcome, Selection};
    use chrono::{DateTime, Utc};
    use mockall::mock;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    mock! {
        pub Book {}

        #[async_trait]
        impl SelectionStore for Book {
            async fn fetch_selection(&self, id: Uuid) -> StorageResult<Option<Selection>>;
            async fn update_selection(&self, selection: &Selection) -> StorageResult<()>;
            async fn update_selection_odds(
                &self,
                id: Uuid,
                odds_home: Decimal,
                odds_away: Decimal,
            ) -> StorageResult<()>;
            async fn fetch_open_selections(&self) -> StorageResult<Vec<Selection>>;
            async fn fetch_auto_odds_selections(&self) -> StorageResult<Vec<Selection>>;
        }

        #[async_trait]
        impl BetStore for Book {
            async fn fetch_bets_by_selection(&self, selection_id: Uuid) -> StorageResult<Vec<Bet>>;
            async fn fetch_bets_by_account(&self, account_id: Uuid) -> StorageResult<Vec<Bet>>;
            async fn fetch_bets_between(
                &self,
                from: DateTime<Utc>,
                to: DateTime<Utc>,
            ) -> StorageResult<Vec<Bet>>;
            async fn insert_bet(&self, bet: &Bet, account: &Account) -> StorageResult<()>;
            async fn update_bet(&self, bet: &Bet, account: &Account) -> StorageResult<()>;
        }
    }

    fn auto_selection() -> Selection {
        let mut s = Selection::new(Uuid::new_v4(), "Total goals", dec!(2), dec!(2));
        s.auto_odds = true;
        s
    }

    fn bets_on(selection: &Selection, chosen: &[Outcome]) -> Vec<Bet> {
        chosen
            .iter()
            .map(|&c| Bet {
                id: Uuid::new_v4(),
                account_id: Uuid::new_v4(),
                selection_id: selection.id,
                chosen: c,
                stake: dec!(5),
                odds: selection.odds_for(c),
                state: BetState::Pending,
                placed_at: Utc::now(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_reprices_from_bet_split() {
        let sel = auto_selection();
        let bets = bets_on(&sel, &[Outcome::Home, Outcome::Home, Outcome::Home, Outcome::Away]);

        let mut book = MockBook::new();
        let listed = sel.clone();
        book.expect_fetch_auto_odds_selections()
            .times(1)
            .returning(move || Ok(vec![listed.clone()]));
        book.expect_fetch_bets_by_selection()
            .with(eq(sel.id))
            .returning(move |_| Ok(bets.clone()));
        book.expect_update_selection_odds()
            .with(eq(sel.id), eq(dec!(2.5)), eq(dec!(1.5)))
            .times(1)
            .returning(|_, _, _| Ok(()));
        book.expect_update_selection().never();

        let job = AutoOddsJob::new(Arc::new(book));
        let report = job.run().await.unwrap();
        assert_eq!(report.examined, 1);
        assert_eq!(report.repriced, 1);
    }

    #[tokio::test]
    async fn test_skips_finalized_and_thin_books() {
        let mut settled = auto_selection();
        settled.outcome = Outcome::Home;
        let thin = auto_selection();
        let thin_bets = bets_on(&thin, &[Outcome::Away]);

        let mut book = MockBook::new();
        let listed = vec![settled.clone(), thin.clone()];
        book.expect_fetch_auto_odds_selections()
            .returning(move || Ok(listed.clone()));
        book.expect_fetch_bets_by_selection()
            .with(eq(thin.id))
            .returning(move |_| Ok(thin_bets.clone()));
        book.expect_fetch_bets_by_selection()
            .with(eq(settled.id))
            .never();
        book.expect_update_selection_odds().never();

        let report = AutoOddsJob::new(Arc::new(book)).run().await.unwrap();
        assert_eq!(
            report,
            OddsReport {
                examined: 2,
                skipped: 2,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_pass() {
        let broken = auto_selection();
        let healthy = auto_selection();
        let healthy_bets = bets_on(&healthy, &[Outcome::Away, Outcome::Away]);

        let mut book = MockBook::new();
        let listed = vec![broken.clone(), healthy.clone()];
        book.expect_fetch_auto_odds_selections()
            .returning(move || Ok(listed.clone()));
        book.expect_fetch_bets_by_selection()
            .with(eq(broken.id))
            .returning(|_| Err(StorageError::Unavailable("timeout".into())));
        book.expect_fetch_bets_by_selection()
            .with(eq(healthy.id))
            .returning(move |_| Ok(healthy_bets.clone()));
        book.expect_update_selection_odds()
            .with(eq(healthy.id), eq(dec!(1)), eq(dec!(3)))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let report = AutoOddsJob::new(Arc::new(book)).run().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.repriced, 1);
    }

    #[tokio::test]
    async fn test_listing_failure_fails_the_tick() {
        let mut book = MockBook::new();
        book.expect_fetch_auto_odds_selections()
            .returning(|| Err(StorageError::Unavailable("down".into())));

        let job = AutoOddsJob::new(Arc::new(book));
        assert_eq!(job.name(), "auto_odds");
        assert!(matches!(job.tick().await, Err(EngineError::Storage(_))));
    }
}
