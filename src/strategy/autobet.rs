//! Auto-bet sizing and targeting.
//!
//! Turns a standing auto-bet instruction plus a live balance into a concrete
//! stake, and picks which open selection and side to back.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::debug;

use crate::types::{AutoBetConfig, Outcome, RiskAppetite, Selection};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AutoBetSizing {
    /// Stakes below this are dust and are not placed.
    pub min_stake: Decimal,
    /// When set, stakes are truncated (never rounded up) to this many
    /// decimal places. Unset keeps full precision.
    pub stake_dp: Option<u32>,
}

impl Default for AutoBetSizing {
    fn default() -> Self {
        Self {
            min_stake: dec!(1),
            stake_dp: None,
        }
    }
}

impl AutoBetSizing {
    /// Stake for `config` given the account's live balance, or `None` when
    /// the result is dust or the fraction is out of range.
    pub fn stake(&self, config: &AutoBetConfig, balance: Decimal) -> Option<Decimal> {
        if !valid_fraction(config.balance_fraction) {
            debug!(
                auto_bet_id = %config.id,
                fraction = %config.balance_fraction,
                "Balance fraction out of range"
            );
            return None;
        }

        let mut stake = balance * config.balance_fraction;
        if let Some(dp) = self.stake_dp {
            stake = stake.round_dp_with_strategy(dp, RoundingStrategy::ToZero);
        }

        if stake < self.min_stake {
            debug!(
                auto_bet_id = %config.id,
                stake = %stake,
                min_stake = %self.min_stake,
                "Stake below minimum"
            );
            return None;
        }

        Some(stake)
    }
}

/// Whether `fraction` lies in (0, 1].
pub fn valid_fraction(fraction: Decimal) -> bool {
    fraction > Decimal::ZERO && fraction <= Decimal::ONE
}

// ---------------------------------------------------------------------------
// Targeting
// ---------------------------------------------------------------------------

/// Pick the open selection with extremal top odds.
///
/// High appetite takes the largest `max(odds_home, odds_away)`, low appetite
/// the smallest. The first candidate wins ties. Finalized selections are
/// ignored even if present in `candidates`.
pub fn best_open_selection(candidates: &[Selection], appetite: RiskAppetite) -> Option<&Selection> {
    let mut open = candidates.iter().filter(|s| !s.is_finalized());
    let first = open.next()?;

    Some(open.fold(first, |best, s| {
        let better = match appetite {
            RiskAppetite::High => s.top_odds() > best.top_odds(),
            RiskAppetite::Low => s.top_odds() < best.top_odds(),
        };
        if better {
            s
        } else {
            best
        }
    }))
}

/// Which side of `selection` to back, with the odds it currently pays.
///
/// High appetite backs the higher price, low appetite the lower one. Home
/// wins ties.
pub fn pick_side(selection: &Selection, appetite: RiskAppetite) -> (Outcome, Decimal) {
    let away_preferred = match appetite {
        RiskAppetite::High => selection.odds_away > selection.odds_home,
        RiskAppetite::Low => selection.odds_away < selection.odds_home,
    };

    if away_preferred {
        (Outcome::Away, selection.odds_away)
    } else {
        (Outcome::Home, selection.odds_home)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
