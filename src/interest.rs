//! Simple interest math.
//!
//! Interest is linear in elapsed time and never compounds:
//! `interest = principal * apy * elapsed / SECONDS_PER_YEAR`, floored.
//! Pure functions with no state.

use crate::types::{Amount, Apy};

/// 365 days.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Interest owed on `principal` after `elapsed_secs` at multiplier `apy`.
/// `None` only when the interest itself does not fit in an `Amount`.
pub fn calculate_return_amount(elapsed_secs: u64, principal: Amount, apy: Apy) -> Option<Amount> {
    let year = Amount::from(SECONDS_PER_YEAR);
    // u32 * u64 always fits in u128
    let rate_secs = Amount::from(apy.value()) * Amount::from(elapsed_secs);

    // principal = whole * year + rest, so the floor splits exactly
    let whole = (principal / year).checked_mul(rate_secs)?;
    let rest = (principal % year) * rate_secs / year;
    whole.checked_add(rest)
}

/// Principal plus accrued interest.
pub fn calculate_amount_owed(elapsed_secs: u64, principal: Amount, apy: Apy) -> Option<Amount> {
    calculate_return_amount(elapsed_secs, principal, apy)?.checked_add(principal)
}
