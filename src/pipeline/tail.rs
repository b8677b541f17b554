//! Inactive-member tail.

use chrono::NaiveDate;

use crate::bracket::{TierBracket, TierStatus};
use crate::dates::day_after;
use crate::error::IntegrityError;
use crate::rules::INACTIVE_MEMBER_SLUG;

/// The bracket that follows an Inactive member's last professional bracket.
///
/// Starts the day after the latest end date so far and runs, Active, to the
/// end of the current membership year.
pub fn inactive_tail(brackets: &[TierBracket], year_end: Option<NaiveDate>) -> Result<TierBracket, IntegrityError> {
    let latest = brackets
        .iter()
        .map(|b| b.end)
        .max()
        .ok_or(IntegrityError::InactiveTailWithoutHistory)?;
    let end = year_end.ok_or_else(|| IntegrityError::MissingAnnualValidation {
        context: "the inactive-member tail".into(),
    })?;
    Ok(TierBracket::new(INACTIVE_MEMBER_SLUG, TierStatus::Active, day_after(latest), end))
}

/// Append the inactive tail to `brackets`.
pub fn append(mut brackets: Vec<TierBracket>, year_end: Option<NaiveDate>) -> Result<Vec<TierBracket>, IntegrityError> {
    let tail = inactive_tail(&brackets, year_end)?;
    tracing::debug!(bracket = %tail, "appending inactive-member tail");
    brackets.push(tail);
    Ok(brackets)
}
