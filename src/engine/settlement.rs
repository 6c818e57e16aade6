//! Settlement engine.
//!
//! Once an administrator declares a selection's outcome, every pending bet on
//! it is marked won or lost and winners are paid `stake × odds` using the odds
//! they locked in. A void outcome refunds every stake instead. Finally the
//! owning event's `finished` flag is recomputed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{EngineError, EngineResult, WagerEngine};
use crate::storage::Store;
use crate::types::{BetState, Outcome, Rejection, Selection, Verdict};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What a settlement pass did.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReport {
    pub selection_id: Uuid,
    pub outcome: Outcome,
    pub won: usize,
    pub lost: usize,
    pub refunded: usize,
    /// Bets left pending: owner missing or credit refused.
    pub skipped: usize,
    /// Bets settled by an earlier pass and left untouched.
    pub already_settled: usize,
    /// Credited to winners as `stake × odds`.
    pub paid_out: Decimal,
    /// Stakes handed back on a void outcome.
    pub refunded_amount: Decimal,
    pub event_finished: bool,
    pub timestamp: DateTime<Utc>,
}

impl SettlementReport {
    fn new(selection: &Selection) -> Self {
        Self {
            selection_id: selection.id,
            outcome: selection.outcome,
            won: 0,
            lost: 0,
            refunded: 0,
            skipped: 0,
            already_settled: 0,
            paid_out: Decimal::ZERO,
            refunded_amount: Decimal::ZERO,
            event_finished: false,
            timestamp: Utc::now(),
        }
    }

    pub fn total_credited(&self) -> Decimal {
        self.paid_out.saturating_add(self.refunded_amount)
    }

    pub fn settled(&self) -> usize {
        self.won + self.lost + self.refunded
    }
}

/// Result of a resolve request that got past validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Settled(SettlementReport),
    /// Nothing to do: the selection was already decided, or the requested
    /// outcome was `pending`.
    Unchanged,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

impl<S: Store> WagerEngine<S> {
    /// Declare `outcome` for a selection and settle every bet on it.
    ///
    /// The outcome is persisted before any bet is touched; if that write
    /// fails nothing else happens. Outcomes are write-once, so resolving a
    /// decided selection again is a no-op.
    pub async fn resolve_selection(
        &self,
        selection_id: Uuid,
        outcome: Outcome,
    ) -> EngineResult<Verdict<Resolution>> {
        let _guard = self.critical.lock().await;

        let Some(mut selection) = self.store.fetch_selection(selection_id).await? else {
            return Ok(Verdict::Rejected(Rejection::SelectionNotFound));
        };

        if !outcome.is_finalized() {
            debug!(selection_id = %selection_id, "Resolve with pending outcome ignored");
            return Ok(Verdict::Accepted(Resolution::Unchanged));
        }

        if selection.is_finalized() {
            info!(
                selection_id = %selection_id,
                current = %selection.outcome,
                requested = %outcome,
                "Selection already finalized"
            );
            return Ok(Verdict::Accepted(Resolution::Unchanged));
        }

        selection.outcome = outcome;
        self.store.update_selection(&selection).await?;

        let report = self.settle_bets(&selection).await?;
        Ok(Verdict::Accepted(Resolution::Settled(report)))
    }

    /// Settle bets still pending on an already-decided selection.
    ///
    /// Recovery path for a settlement that stopped on a storage failure.
    /// Bets that were settled before are never touched again.
    pub async fn settle_outstanding(&self, selection_id: Uuid) -> EngineResult<Verdict<Resolution>> {
        let _guard = self.critical.lock().await;

        let Some(selection) = self.store.fetch_selection(selection_id).await? else {
            return Ok(Verdict::Rejected(Rejection::SelectionNotFound));
        };

        if !selection.is_finalized() {
            return Ok(Verdict::Accepted(Resolution::Unchanged));
        }

        let report = self.settle_bets(&selection).await?;
        Ok(Verdict::Accepted(Resolution::Settled(report)))
    }

    /// Pay out or close every pending bet on a finalized selection, then
    /// refresh the event. Caller must hold the critical section.
    async fn settle_bets(&self, selection: &Selection) -> EngineResult<SettlementReport> {
        let outcome = selection.outcome;
        let mut report = SettlementReport::new(selection);

        let bets = self.store.fetch_bets_by_selection(selection.id).await?;

        for mut bet in bets {
            if bet.state != BetState::Pending {
                report.already_settled += 1;
                continue;
            }

            let Some(mut account) = self.store.fetch_account(bet.account_id).await? else {
                warn!(
                    bet_id = %bet.id,
                    account_id = %bet.account_id,
                    "Account missing, bet left pending"
                );
                report.skipped += 1;
                continue;
            };

            bet.resolve(outcome);

            let credit = match (outcome, bet.state) {
                (Outcome::Void, _) => Some(bet.stake),
                (_, BetState::Won) => bet.payout(),
                _ => Some(Decimal::ZERO),
            };
            let Some(credit) = credit else {
                warn!(
                    bet_id = %bet.id,
                    stake = %bet.stake,
                    odds = %bet.odds,
                    "Payout out of range, bet left pending"
                );
                report.skipped += 1;
                continue;
            };

            if let Err(e) = account.credit(credit) {
                warn!(bet_id = %bet.id, error = %e, "Credit refused, bet left pending");
                report.skipped += 1;
                continue;
            }

            self.store.update_bet(&bet, &account).await?;

            match (outcome, bet.state) {
                (Outcome::Void, _) => {
                    report.refunded += 1;
                    report.refunded_amount = report.refunded_amount.saturating_add(credit);
                }
                (_, BetState::Won) => {
                    report.won += 1;
                    report.paid_out = report.paid_out.saturating_add(credit);
                }
                _ => report.lost += 1,
            }

            debug!(
                bet_id = %bet.id,
                account_id = %account.id,
                state = %bet.state,
                credit = %credit,
                balance = %account.balance,
                "Bet settled"
            );
        }

        let mut event = self
            .store
            .fetch_event(selection.event_id)
            .await?
            .ok_or(EngineError::EventNotFound(selection.id))?;
        event.finished = event.is_finished();
        self.store.update_event(&event).await?;
        report.event_finished = event.finished;

        info!(
            selection_id = %report.selection_id,
            outcome = %report.outcome,
            won = report.won,
            lost = report.lost,
            refunded = report.refunded,
            skipped = report.skipped,
            paid_out = %report.paid_out,
            refunded_amount = %report.refunded_amount,
            event_finished = report.event_finished,
            "Selection settled"
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
