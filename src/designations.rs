//! Designation record: when each certificate was first awarded.
//!
//! Serialized as one flat JSON object: `{"CGI1": "2023-10-01", "AHGIsPermanent": true}`.
//! Mountain Guide never appears; it is a membership with no underlying designation.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::certificate::{CertificateKind, CertificateRecord};
use crate::dates::format_date;

/// Earliest known award date per certificate kind, plus permanent-apprentice flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Designations {
    dates: BTreeMap<CertificateKind, NaiveDate>,
    permanent: BTreeSet<CertificateKind>,
}

impl Designations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a certificate. Kinds without a date are skipped; an earlier
    /// date replaces a later one.
    pub fn record(&mut self, kind: CertificateKind, record: &CertificateRecord) {
        if kind == CertificateKind::Mg {
            return;
        }
        if let Some(date) = record.date {
            self.dates
                .entry(kind)
                .and_modify(|d| *d = (*d).min(date))
                .or_insert(date);
        }
        if record.is_permanent {
            self.permanent.insert(kind);
        }
    }

    /// Build from every certificate on a profile.
    pub fn from_certificates<'a>(
        certificates: impl IntoIterator<Item = (&'a CertificateKind, &'a CertificateRecord)>,
    ) -> Self {
        let mut designations = Self::new();
        for (kind, record) in certificates {
            designations.record(*kind, record);
        }
        designations
    }

    pub fn date(&self, kind: CertificateKind) -> Option<NaiveDate> {
        self.dates.get(&kind).copied()
    }

    pub fn is_permanent(&self, kind: CertificateKind) -> bool {
        self.permanent.contains(&kind)
    }

    /// Kinds flagged as permanent apprentices.
    pub fn permanent_kinds(&self) -> impl Iterator<Item = CertificateKind> + '_ {
        self.permanent.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() && self.permanent.is_empty()
    }
}

impl Serialize for Designations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.dates.len() + self.permanent.len()))?;
        for (kind, date) in &self.dates {
            map.serialize_entry(kind.code(), &format_date(*date))?;
        }
        for kind in &self.permanent {
            map.serialize_entry(&format!("{}IsPermanent", kind.code()), &true)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::CertificateStatus;
    use crate::dates::parse_date;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn records_dates_and_skips_undated() {
        let mut des = Designations::new();
        des.record(CertificateKind::Cgi1, &CertificateRecord::new(None, Some(d("2023-10-01"))));
        des.record(CertificateKind::Vfg, &CertificateRecord::new(Some(CertificateStatus::Active), None));

        assert_eq!(des.date(CertificateKind::Cgi1), Some(d("2023-10-01")));
        assert_eq!(des.date(CertificateKind::Vfg), None);
    }

    #[test]
    fn keeps_earliest_date() {
        let mut des = Designations::new();
        des.record(CertificateKind::Hg, &CertificateRecord::new(None, Some(d("2010-05-01"))));
        des.record(CertificateKind::Hg, &CertificateRecord::new(None, Some(d("2008-05-01"))));
        des.record(CertificateKind::Hg, &CertificateRecord::new(None, Some(d("2012-05-01"))));
        assert_eq!(des.date(CertificateKind::Hg), Some(d("2008-05-01")));
    }

    #[test]
    fn never_records_mountain_guide() {
        let mut des = Designations::new();
        des.record(
            CertificateKind::Mg,
            &CertificateRecord::new(Some(CertificateStatus::Active), Some(d("2009-04-01"))),
        );
        assert!(des.is_empty());
    }

    #[test]
    fn serializes_flat_with_permanent_flags() {
        let mut des = Designations::new();
        des.record(
            CertificateKind::Ahg,
            &CertificateRecord::new(Some(CertificateStatus::Active), Some(d("2015-06-01"))).permanent(),
        );
        let json = serde_json::to_value(&des).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"AHG": "2015-06-01", "AHGIsPermanent": true})
        );
    }
}
