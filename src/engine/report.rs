//! House reports over a time window.
//!
//! Windows are half-open, `[from, to)`, and keyed on when a bet was placed.
//! Reports only read, so they run outside the critical section.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use super::{EngineResult, WagerEngine};
use crate::storage::Store;
use crate::types::{Bet, BetState, Outcome};

/// House result for bets placed in a window.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfitReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Stakes kept from lost bets.
    pub profit: Decimal,
    /// Paid to winners, `stake × odds` each.
    pub loss: Decimal,
    /// `profit - loss`. Negative when the house is down.
    pub net: Decimal,
    pub pending: usize,
    /// Bets on void selections. Their stakes went back, so they count
    /// toward neither side.
    pub refunded: usize,
}

impl ProfitReport {
    fn tally(from: DateTime<Utc>, to: DateTime<Utc>, bets: &[Bet], void: &HashSet<Uuid>) -> Self {
        let mut report = Self {
            from,
            to,
            profit: Decimal::ZERO,
            loss: Decimal::ZERO,
            net: Decimal::ZERO,
            pending: 0,
            refunded: 0,
        };

        for bet in bets {
            match bet.state {
                BetState::Pending => report.pending += 1,
                _ if void.contains(&bet.selection_id) => report.refunded += 1,
                BetState::Lost => report.profit = report.profit.saturating_add(bet.stake),
                BetState::Won => {
                    let paid = bet.stake.saturating_mul(bet.odds);
                    report.loss = report.loss.saturating_add(paid);
                }
            }
        }

        report.net = report.profit.saturating_sub(report.loss);
        report
    }
}

impl<S: Store> WagerEngine<S> {
    /// Bets placed in `[from, to)`, oldest first. Empty when `from >= to`.
    pub async fn bets_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<Bet>> {
        if from >= to {
            return Ok(Vec::new());
        }
        Ok(self.store.fetch_bets_between(from, to).await?)
    }

    /// Lost stakes against winners' payouts for bets placed in `[from, to)`.
    pub async fn profit_report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<ProfitReport> {
        let bets = self.bets_between(from, to).await?;

        let mut void = HashSet::new();
        let mut seen = HashSet::new();
        for bet in bets.iter().filter(|b| b.state != BetState::Pending) {
            if !seen.insert(bet.selection_id) {
                continue;
            }
            let selection = self.store.fetch_selection(bet.selection_id).await?;
            if selection.is_some_and(|s| s.outcome == Outcome::Void) {
                void.insert(bet.selection_id);
            }
        }

        let report = ProfitReport::tally(from, to, &bets, &void);

        info!(
            from = %from,
            to = %to,
            bets = bets.len(),
            profit = %report.profit,
            loss = %report.loss,
            net = %report.net,
            "Profit report"
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
