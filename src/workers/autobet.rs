//! Standing auto-bet instructions, executed once per tick.
//!
//! Every placement goes through [`WagerEngine::place_bet`], so auto-bets
//! obey the same locking, validation and debit rules as manual bets.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::PeriodicJob;
use crate::engine::{EngineError, EngineResult, WagerEngine};
use crate::storage::Store;
use crate::strategy::autobet::{pick_side, AutoBetSizing};
use crate::types::{AutoBetConfig, BetRequest, Verdict};

/// Counts for one pass over every auto-bet config.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AutoBetReport {
    pub configs: usize,
    pub placed: usize,
    pub rejected: usize,
    /// Nothing to do: missing account, dust stake or no open selection.
    pub skipped: usize,
    pub failed: usize,
}

enum Step {
    Placed,
    Rejected,
    Skipped,
}

pub struct AutoBetJob<S> {
    engine: Arc<WagerEngine<S>>,
    sizing: AutoBetSizing,
}

impl<S: Store> AutoBetJob<S> {
    pub fn new(engine: Arc<WagerEngine<S>>, sizing: AutoBetSizing) -> Self {
        Self { engine, sizing }
    }

    /// Run every config once. A failure on one config never stops the rest.
    pub async fn run(&self) -> EngineResult<AutoBetReport> {
        let configs = self.engine.store().fetch_all_auto_bets().await?;
        let mut report = AutoBetReport {
            configs: configs.len(),
            ..Default::default()
        };

        for config in &configs {
            match self.place_one(config).await {
                Ok(Step::Placed) => report.placed += 1,
                Ok(Step::Rejected) => report.rejected += 1,
                Ok(Step::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!(
                        auto_bet_id = %config.id,
                        account_id = %config.account_id,
                        error = %e,
                        "Auto-bet failed"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn place_one(&self, config: &AutoBetConfig) -> EngineResult<Step> {
        let store = self.engine.store();

        let Some(account) = store.fetch_account(config.account_id).await? else {
            debug!(auto_bet_id = %config.id, "Account gone, skipping");
            return Ok(Step::Skipped);
        };

        // Placement re-checks funds under the lock, so a stale balance here
        // can only produce a rejection, never an overdraft.
        let Some(stake) = self.sizing.stake(config, account.balance) else {
            return Ok(Step::Skipped);
        };

        let appetite = config.appetite();
        let Some(selection) = store.fetch_best_open_selection(appetite).await? else {
            debug!(auto_bet_id = %config.id, "No open selection");
            return Ok(Step::Skipped);
        };

        let (chosen, odds) = pick_side(&selection, appetite);
        debug!(
            auto_bet_id = %config.id,
            selection = %selection.name,
            chosen = %chosen,
            odds = %odds,
            stake = %stake,
            "Auto-bet target"
        );

        let verdict = self
            .engine
            .place_bet(BetRequest {
                account_id: account.id,
                selection_id: selection.id,
                chosen,
                stake,
            })
            .await?;

        Ok(match verdict {
            Verdict::Accepted(_) => Step::Placed,
            Verdict::Rejected(_) => Step::Rejected,
        })
    }
}

#[async_trait]
impl<S: Store> PeriodicJob for AutoBetJob<S> {
    type Report = AutoBetReport;

    fn name(&self) -> &'static str {
        "auto_bet"
    }

    async fn tick(&self) -> Result<AutoBetReport, EngineError> {
        self.run().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
