//! Shared types for the wager ledger.
//!
//! Accounts, selections, events, bets and auto-bet configurations form the
//! data model every engine, worker and storage module depends on. Money and
//! odds are always `Decimal`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of a selection, or the result a bettor backs.
///
/// `Void` doubles as the "none" choice a bettor may place: the selection was
/// cancelled or produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Home,
    Away,
    #[serde(alias = "none")]
    Void,
}

impl Outcome {
    /// Whether the outcome is decided. Finalized outcomes never change.
    pub fn is_finalized(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Home => "home",
            Outcome::Away => "away",
            Outcome::Void => "void",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "tbd" => Ok(Outcome::Pending),
            "home" => Ok(Outcome::Home),
            "away" => Ok(Outcome::Away),
            "void" | "none" => Ok(Outcome::Void),
            _ => Err(anyhow::anyhow!("Unknown outcome: {s}")),
        }
    }
}

/// Lifecycle of a bet. Moves from `Pending` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetState {
    Pending,
    Won,
    Lost,
}

impl BetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetState::Pending => "pending",
            BetState::Won => "won",
            BetState::Lost => "lost",
        }
    }
}

impl fmt::Display for BetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BetState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "tbd" => Ok(BetState::Pending),
            "won" => Ok(BetState::Won),
            "lost" => Ok(BetState::Lost),
            _ => Err(anyhow::anyhow!("Unknown bet state: {s}")),
        }
    }
}

/// Which end of the odds range an auto-bet goes after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskAppetite {
    /// Highest available odds, highest payout.
    High,
    /// Lowest available odds.
    Low,
}

impl RiskAppetite {
    pub fn from_high_risk(high_risk: bool) -> Self {
        if high_risk {
            RiskAppetite::High
        } else {
            RiskAppetite::Low
        }
    }
}

impl fmt::Display for RiskAppetite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskAppetite::High => write!(f, "high"),
            RiskAppetite::Low => write!(f, "low"),
        }
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A bettor's wallet. The balance only moves through the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Open an empty account.
    pub fn new() -> Self {
        Self::with_balance(Decimal::ZERO)
    }

    pub fn with_balance(balance: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            balance,
            created_at: Utc::now(),
        }
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account {} (balance={})", self.id, self.balance)
    }
}

// ---------------------------------------------------------------------------
// Selection & Event
// ---------------------------------------------------------------------------

/// A bettable proposition within an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub odds_home: Decimal,
    pub odds_away: Decimal,
    /// Priced by the dynamic odds worker instead of by hand.
    pub auto_odds: bool,
    pub outcome: Outcome,
}

impl Selection {
    pub fn new(event_id: Uuid, name: &str, odds_home: Decimal, odds_away: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            name: name.to_string(),
            odds_home,
            odds_away,
            auto_odds: false,
            outcome: Outcome::Pending,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.outcome.is_finalized()
    }

    /// Odds a bet on `chosen` locks in at placement time.
    ///
    /// A void ("none") bet has no multiplier; it can only be refunded.
    pub fn odds_for(&self, chosen: Outcome) -> Decimal {
        match chosen {
            Outcome::Home => self.odds_home,
            Outcome::Away => self.odds_away,
            Outcome::Void | Outcome::Pending => Decimal::ZERO,
        }
    }

    /// The larger of the two prices.
    pub fn top_odds(&self) -> Decimal {
        self.odds_home.max(self.odds_away)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (home @ {} | away @ {} | {})",
            self.name, self.odds_home, self.odds_away, self.outcome,
        )
    }
}

/// A sporting event made of one or more selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub sport: String,
    pub begins_at: DateTime<Utc>,
    /// Persisted copy of [`Event::is_finished`], refreshed on every resolution.
    pub finished: bool,
    pub selections: Vec<Selection>,
}

impl Event {
    /// True once every selection is finalized.
    pub fn is_finished(&self) -> bool {
        self.selections.iter().all(Selection::is_finalized)
    }
}

// ---------------------------------------------------------------------------
// Bet
// ---------------------------------------------------------------------------

/// A wager recorded against a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: Uuid,
    pub account_id: Uuid,
    pub selection_id: Uuid,
    pub chosen: Outcome,
    pub stake: Decimal,
    /// Snapshot of the selection's odds when the bet was placed.
    pub odds: Decimal,
    pub state: BetState,
    pub placed_at: DateTime<Utc>,
}

impl Bet {
    /// Mark the bet won or lost against a finalized outcome.
    pub fn resolve(&mut self, outcome: Outcome) {
        self.state = if self.chosen == outcome {
            BetState::Won
        } else {
            BetState::Lost
        };
    }

    /// What a winning bet pays back, stake included. `None` on overflow.
    pub fn payout(&self) -> Option<Decimal> {
        self.stake.checked_mul(self.odds)
    }
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bet {} {} {} @ {} [{}]",
            self.id, self.stake, self.chosen, self.odds, self.state,
        )
    }
}

/// Request to place a bet, from a bettor or from the auto-bet worker.
#[derive(Debug, Clone, PartialEq)]
pub struct BetRequest {
    pub account_id: Uuid,
    pub selection_id: Uuid,
    pub chosen: Outcome,
    pub stake: Decimal,
}

// ---------------------------------------------------------------------------
// Auto-bet & purse
// ---------------------------------------------------------------------------

/// Standing instruction to wager a fraction of an account's balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoBetConfig {
    pub id: Uuid,
    pub account_id: Uuid,
    pub high_risk: bool,
    /// Share of the live balance staked each tick, in (0, 1].
    pub balance_fraction: Decimal,
}

impl AutoBetConfig {
    pub fn appetite(&self) -> RiskAppetite {
        RiskAppetite::from_high_risk(self.high_risk)
    }
}

/// Administrator deposit into an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Administrator withdrawal from an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Why a request was turned down. These are expected and are shown to the
/// bettor; they never travel as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("cannot find selection")]
    SelectionNotFound,

    #[error("cannot find account")]
    AccountNotFound,

    #[error("event already finalized")]
    EventAlreadyFinalized,

    #[error("stake cannot be less than or equal to 0")]
    InvalidStake,

    #[error("invalid outcome, must be home, away or none")]
    InvalidOutcome,

    #[error("amount cannot be less than or equal to 0")]
    InvalidAmount,

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("amount too large")]
    AmountTooLarge,

    #[error("balance fraction must be between 0 and 1")]
    InvalidBalanceFraction,

    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

/// Business-level answer: accepted with a value, or rejected with a reason.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<T> {
    Accepted(T),
    Rejected(Rejection),
}

impl<T> Verdict<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }

    pub fn accepted(self) -> Option<T> {
        match self {
            Verdict::Accepted(v) => Some(v),
            Verdict::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Accepted(_) => None,
            Verdict::Rejected(r) => Some(r),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
