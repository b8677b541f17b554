//! Membership-tier brackets: the converter's primary output.
//!
//! On the wire a bracket is a 4-tuple `[slug, status, start, end]` with
//! `yyyy-MM-dd` dates, matching the successor system's import template.

use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::dates::{format_date, parse_date};

/// Status of a tier bracket in the successor system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierStatus {
    Active,
    Inactive,
}

impl std::fmt::Display for TierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => f.write_str("Active"),
            Self::Inactive => f.write_str("Inactive"),
        }
    }
}

/// One date-bounded membership interval. Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierBracket {
    pub slug: String,
    pub status: TierStatus,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TierBracket {
    pub fn new(slug: impl Into<String>, status: TierStatus, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            slug: slug.into(),
            status,
            start,
            end,
        }
    }

    /// Whether `start <= end`.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// Whether `date` falls inside the bracket.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Days between start and end; zero for a single-day bracket, negative
    /// when the bracket is inverted.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl std::fmt::Display for TierBracket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.slug,
            self.status,
            format_date(self.start),
            format_date(self.end)
        )
    }
}

impl Serialize for TierBracket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (
            &self.slug,
            self.status,
            format_date(self.start),
            format_date(self.end),
        )
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TierBracket {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (slug, status, start, end): (String, TierStatus, String, String) =
            Deserialize::deserialize(deserializer)?;
        let start = parse_date(&start).ok_or_else(|| D::Error::custom(format!("invalid start date: {start}")))?;
        let end = parse_date(&end).ok_or_else(|| D::Error::custom(format!("invalid end date: {end}")))?;
        Ok(Self::new(slug, status, start, end))
    }
}
