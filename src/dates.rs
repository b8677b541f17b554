//! Calendar-date helpers shared by the builder and post-processors.
//!
//! All dates are whole calendar days ([`NaiveDate`]); brackets are inclusive
//! on both ends. The wire format is `yyyy-MM-dd`.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Wire format for every date the converter reads or writes.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `yyyy-MM-dd` date. A trailing time part (`T...`) is ignored, since
/// some exports carry midnight timestamps on date-only fields.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.split_once('T').map_or(raw, |(day, _)| day);
    NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
}

/// Format a date as `yyyy-MM-dd`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// The calendar day before `date`, saturating at the minimum date.
pub fn day_before(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(date)
}

/// The calendar day after `date`, saturating at the maximum date.
pub fn day_after(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// The same month and day as `date` in `year`. Feb 29 falls back to Feb 28.
pub fn anniversary_in(date: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
}

fn december_31(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

// ---------------------------------------------------------------------------
// Membership year
// ---------------------------------------------------------------------------

/// Month and day on which annual renewal rolls over to the next membership year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalCutover {
    pub month: u32,
    pub day: u32,
}

impl Default for RenewalCutover {
    fn default() -> Self {
        Self { month: 12, day: 1 }
    }
}

impl RenewalCutover {
    /// Check that the cutover names a real calendar day (Feb 29 is allowed).
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 2000 is a leap year, so every real month/day pair resolves.
        if NaiveDate::from_ymd_opt(2000, self.month, self.day).is_some() {
            Ok(())
        } else {
            Err(ConfigError::InvalidCutover {
                month: self.month,
                day: self.day,
            })
        }
    }

    /// End of the membership year paid for by an annual validation on `validated`.
    ///
    /// Validations on or after the cutover renew into the following year and run
    /// to Dec 31 of that year; earlier ones run to Dec 31 of the same year.
    pub fn membership_year_end(&self, validated: NaiveDate) -> NaiveDate {
        if (validated.month(), validated.day()) >= (self.month, self.day) {
            december_31(validated.year() + 1)
        } else {
            december_31(validated.year())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn parse_accepts_date_and_timestamp_prefix() {
        assert_eq!(d("2024-01-05"), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(d(" 2024-01-05T00:00:00Z "), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert!(parse_date("05/01/2024").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn day_arithmetic_crosses_month_and_year() {
        assert_eq!(day_before(d("2024-03-01")), d("2024-02-29"));
        assert_eq!(day_after(d("2023-12-31")), d("2024-01-01"));
        assert_eq!(format_date(day_before(d("2024-09-13"))), "2024-09-12");
    }

    #[test]
    fn anniversary_clamps_leap_day() {
        assert_eq!(anniversary_in(d("2019-06-25"), 2026), Some(d("2026-06-25")));
        assert_eq!(anniversary_in(d("2020-02-29"), 2025), Some(d("2025-02-28")));
        assert_eq!(anniversary_in(d("2020-02-29"), 2028), Some(d("2028-02-29")));
    }

    #[test]
    fn membership_year_rolls_over_at_cutover() {
        let cutover = RenewalCutover::default();
        assert_eq!(cutover.membership_year_end(d("2024-01-05")), d("2024-12-31"));
        assert_eq!(cutover.membership_year_end(d("2024-11-30")), d("2024-12-31"));
        assert_eq!(cutover.membership_year_end(d("2024-12-01")), d("2025-12-31"));
        assert_eq!(cutover.membership_year_end(d("2024-12-05")), d("2025-12-31"));
    }

    #[test]
    fn custom_cutover() {
        let cutover = RenewalCutover { month: 10, day: 15 };
        assert_eq!(cutover.membership_year_end(d("2024-10-14")), d("2024-12-31"));
        assert_eq!(cutover.membership_year_end(d("2024-10-15")), d("2025-12-31"));
    }

    #[test]
    fn cutover_validation() {
        assert!(RenewalCutover::default().validate().is_ok());
        assert!(RenewalCutover { month: 2, day: 29 }.validate().is_ok());
        assert!(RenewalCutover { month: 13, day: 1 }.validate().is_err());
        assert!(RenewalCutover { month: 4, day: 31 }.validate().is_err());
    }
}
