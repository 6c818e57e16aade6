//! Dynamic odds pricing from the observed bet distribution.
//!
//! Each side's price moves linearly from 1.0 (nobody backs it) to 3.0
//! (everybody backs it). The more popular side pays more, not less.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{Bet, Outcome};

pub const ODDS_FLOOR: Decimal = dec!(1);
pub const ODDS_CEILING: Decimal = dec!(3);

/// Fewer bets than this carry no signal.
pub const MIN_BETS_FOR_PRICING: usize = 2;

/// Prices computed for one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub odds_home: Decimal,
    pub odds_away: Decimal,
    pub home_fraction: Decimal,
    pub away_fraction: Decimal,
}

/// Linear interpolation between `v0` and `v1`.
pub fn lerp(v0: Decimal, v1: Decimal, t: Decimal) -> Decimal {
    v0 + t * (v1 - v0)
}

/// Price a selection from the bets placed on it.
///
/// Fractions are taken over every bet, so "none" bets dilute both sides.
/// Returns `None` below [`MIN_BETS_FOR_PRICING`].
pub fn quote(bets: &[Bet]) -> Option<Quote> {
    if bets.len() < MIN_BETS_FOR_PRICING {
        return None;
    }

    let home = bets.iter().filter(|b| b.chosen == Outcome::Home).count();
    let away = bets.iter().filter(|b| b.chosen == Outcome::Away).count();
    let total = Decimal::from(bets.len());

    let home_fraction = Decimal::from(home) / total;
    let away_fraction = Decimal::from(away) / total;

    Some(Quote {
        odds_home: lerp(ODDS_FLOOR, ODDS_CEILING, home_fraction),
        odds_away: lerp(ODDS_FLOOR, ODDS_CEILING, away_fraction),
        home_fraction,
        away_fraction,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
