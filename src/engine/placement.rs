//! Wager placement.
//!
//! The single path that takes money from an account to back a bet. Manual
//! bets and auto-bets both come through here.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use super::{EngineResult, WagerEngine};
use crate::storage::Store;
use crate::types::{Account, Bet, BetRequest, BetState, Outcome, Rejection, Verdict};

/// An accepted bet and the account as it stands after the debit.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBet {
    pub bet: Bet,
    pub account: Account,
}

impl<S: Store> WagerEngine<S> {
    /// Validate and record a bet, debiting the stake.
    ///
    /// Bet and balance are persisted as one unit. The returned account is
    /// the debited copy the caller should use from now on.
    pub async fn place_bet(&self, request: BetRequest) -> EngineResult<Verdict<PlacedBet>> {
        let _guard = self.critical.lock().await;

        let Some(selection) = self.store.fetch_selection(request.selection_id).await? else {
            return Ok(reject(&request, Rejection::SelectionNotFound));
        };

        if selection.is_finalized() {
            return Ok(reject(&request, Rejection::EventAlreadyFinalized));
        }

        if request.stake <= Decimal::ZERO {
            return Ok(reject(&request, Rejection::InvalidStake));
        }

        if request.chosen == Outcome::Pending {
            return Ok(reject(&request, Rejection::InvalidOutcome));
        }

        // Re-read under the lock so the balance cannot be stale.
        let Some(account) = self.store.fetch_account(request.account_id).await? else {
            return Ok(reject(&request, Rejection::AccountNotFound));
        };

        let mut debited = account.clone();
        if let Err(e) = debited.debit(request.stake) {
            return Ok(reject(&request, e.into()));
        }

        let bet = Bet {
            id: Uuid::new_v4(),
            account_id: debited.id,
            selection_id: selection.id,
            chosen: request.chosen,
            stake: request.stake,
            odds: selection.odds_for(request.chosen),
            state: BetState::Pending,
            placed_at: Utc::now(),
        };

        self.store.insert_bet(&bet, &debited).await?;

        info!(
            bet_id = %bet.id,
            account_id = %debited.id,
            selection = %selection.name,
            chosen = %bet.chosen,
            stake = %bet.stake,
            odds = %bet.odds,
            balance = %debited.balance,
            "Bet placed"
        );

        Ok(Verdict::Accepted(PlacedBet {
            bet,
            account: debited,
        }))
    }
}

fn reject(request: &BetRequest, reason: Rejection) -> Verdict<PlacedBet> {
    debug!(
        account_id = %request.account_id,
        selection_id = %request.selection_id,
        stake = %request.stake,
        reason = %reason,
        "Bet rejected"
    );
    Verdict::Rejected(reason)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
