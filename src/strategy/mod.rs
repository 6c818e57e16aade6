//! Pure decision logic: auto-bet sizing and targeting, dynamic odds pricing.
//!
//! Nothing in here touches storage. Workers feed it data and act on the
//! answers.

pub mod autobet;
pub mod odds;
