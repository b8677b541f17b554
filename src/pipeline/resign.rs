//! Resignation splitter.
//!
//! A valid resignation window runs from `DateEnd` to `DateReinstate`
//! (`end < reinstate`). Membership is not continuous across it.

use chrono::NaiveDate;

use crate::bracket::{TierBracket, TierStatus};

/// Carve the window `[date_end, date_reinstate]` out of every bracket.
///
/// A bracket that covers the whole window becomes `[start, date_end]`
/// (Inactive) followed by `[date_reinstate, end]` (original status). A bracket
/// with only one edge strictly inside the window is clamped to it. Brackets
/// that end up inverted after clamping are dropped.
pub fn split(brackets: Vec<TierBracket>, date_end: NaiveDate, date_reinstate: NaiveDate) -> Vec<TierBracket> {
    if date_end >= date_reinstate {
        return brackets;
    }

    let mut out = Vec::with_capacity(brackets.len() + 1);
    for mut bracket in brackets {
        if bracket.contains(date_end) && bracket.contains(date_reinstate) {
            tracing::debug!(bracket = %bracket, %date_end, %date_reinstate, "splitting bracket at resignation");
            let resumed = TierBracket::new(bracket.slug.clone(), bracket.status, date_reinstate, bracket.end);
            bracket.end = date_end;
            bracket.status = TierStatus::Inactive;
            out.push(bracket);
            out.push(resumed);
            continue;
        }

        if date_end < bracket.start && bracket.start < date_reinstate {
            bracket.start = date_reinstate;
        }
        if date_end < bracket.end && bracket.end < date_reinstate {
            bracket.end = date_end;
        }
        if bracket.is_ordered() {
            out.push(bracket);
        } else {
            tracing::debug!(bracket = %bracket, "dropping bracket inside resignation window");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn b(status: TierStatus, start: &str, end: &str) -> TierBracket {
        TierBracket::new("x", status, d(start), d(end))
    }

    #[test]
    fn spanning_bracket_splits_in_place() {
        let out = split(
            vec![
                b(TierStatus::Inactive, "2023-11-03", "2024-09-12"),
                b(TierStatus::Active, "2024-09-13", "2024-12-31"),
            ],
            d("2024-02-15"),
            d("2024-03-15"),
        );
        assert_eq!(
            out,
            vec![
                b(TierStatus::Inactive, "2023-11-03", "2024-02-15"),
                b(TierStatus::Inactive, "2024-03-15", "2024-09-12"),
                b(TierStatus::Active, "2024-09-13", "2024-12-31"),
            ]
        );
    }

    #[test]
    fn active_spanning_bracket_keeps_status_after_window() {
        let out = split(
            vec![b(TierStatus::Active, "2020-01-01", "2024-12-31")],
            d("2022-05-01"),
            d("2023-05-01"),
        );
        assert_eq!(out[0].status, TierStatus::Inactive);
        assert_eq!(out[1].status, TierStatus::Active);
    }

    #[test]
    fn edges_inside_window_are_clamped() {
        let out = split(
            vec![
                b(TierStatus::Inactive, "2020-01-01", "2022-08-01"),
                b(TierStatus::Active, "2022-09-01", "2024-12-31"),
            ],
            d("2022-05-01"),
            d("2023-05-01"),
        );
        assert_eq!(
            out,
            vec![
                b(TierStatus::Inactive, "2020-01-01", "2022-05-01"),
                b(TierStatus::Active, "2023-05-01", "2024-12-31"),
            ]
        );
    }

    #[test]
    fn bracket_wholly_inside_window_is_dropped() {
        let out = split(
            vec![b(TierStatus::Inactive, "2022-06-01", "2022-08-01")],
            d("2022-05-01"),
            d("2023-05-01"),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn unordered_window_is_ignored() {
        let input = vec![b(TierStatus::Active, "2020-01-01", "2024-12-31")];
        assert_eq!(split(input.clone(), d("2023-05-01"), d("2022-05-01")), input);
    }
}
