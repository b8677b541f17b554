//! Batch driver: convert a directory of exported profiles into import rows.
//!
//! Each `*.json` file holds one raw profile. Files are processed in numeric
//! order of their stem (`2.json` before `10.json`). Profiles are independent,
//! so validation and conversion run in parallel; a failing profile is
//! recorded and counted, never fatal to the batch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::bracket::TierBracket;
use crate::certificate::{CertificateKind, ProfileStatus};
use crate::config::BatchConfig;
use crate::convert::Converter;
use crate::dates::{anniversary_in, format_date, parse_date};
use crate::designations::Designations;
use crate::error::{BatchError, ValidationIssue};
use crate::intake;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Why a profile was left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Not ACTIVE, INACTIVE, or RESIGNED (applicants, lapsed accounts, ...).
    UnsupportedStatus { status: Option<String> },
    ResignedWithoutEnd,
    ResignedBeforeCutoff { date_end: NaiveDate },
}

/// What happened to one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Converted {
        professional: Vec<TierBracket>,
        designations: Designations,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        time_limits: BTreeMap<CertificateKind, i32>,
        transforms: Vec<String>,
    },
    ParseError {
        issues: Vec<ValidationIssue>,
        message: String,
    },
    ConversionError {
        message: String,
    },
    Unreadable {
        message: String,
    },
    Skipped(SkipReason),
}

/// Per-profile entry of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileReport {
    /// File stem of the profile.
    pub entry: String,
    pub profile_status: Option<String>,
    pub member_number: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ProfileReport {
    /// The exported status, parsed case-insensitively.
    pub fn status(&self) -> Option<ProfileStatus> {
        self.profile_status.as_deref().and_then(|s| s.parse().ok())
    }

    /// Members are ACTIVE or INACTIVE; RESIGNED profiles are former members.
    fn is_member(&self) -> bool {
        self.status().is_some_and(ProfileStatus::is_member)
    }

    /// Identifier used on import rows.
    fn import_id(&self) -> &str {
        self.member_number.as_deref().unwrap_or(&self.entry)
    }
}

/// Batch-level counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub member_parse_errors: usize,
    pub member_conversion_errors: usize,
    pub nonmember_parse_errors: usize,
    pub nonmember_conversion_errors: usize,
    pub member_count: usize,
    pub nonmember_count: usize,
    pub active_member_count: usize,
    pub inactive_member_count: usize,
    pub converted: usize,
    pub skipped: usize,
    pub unreadable: usize,
}

/// One row of the membership import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Membership Tier Slug")]
    pub slug: String,
    #[serde(rename = "Start Date")]
    pub start: String,
    #[serde(rename = "End Date")]
    pub end: String,
}

/// Designation import columns. A `true` flag means the column holds the
/// award date only while the kind is a permanent apprenticeship.
const DESIGNATION_COLUMNS: [(&str, Option<CertificateKind>, bool); 21] = [
    ("data[mgrecentcert]", Some(CertificateKind::Mg), false),
    ("data[sgrecentcert]", Some(CertificateKind::Sg), false),
    ("data[asgrecentcert]", Some(CertificateKind::Asg), false),
    ("data[pasgrecentcert]", Some(CertificateKind::Asg), true),
    ("data[agrecentcert]", Some(CertificateKind::Ag), false),
    ("data[aagrecentcert]", Some(CertificateKind::Aag), false),
    ("data[paagrecentcert]", Some(CertificateKind::Aag), true),
    ("data[rgrecentcert]", Some(CertificateKind::Rg), false),
    ("data[argrecentcert]", Some(CertificateKind::Arg), false),
    ("data[pargrecentcert]", Some(CertificateKind::Arg), true),
    ("data[hgrecentcert]", Some(CertificateKind::Hg), false),
    ("data[hgbridgerecentcert]", None, false),
    ("data[ahgrecentcert]", Some(CertificateKind::Ahg), false),
    ("data[pahgrecentcert]", Some(CertificateKind::Ahg), true),
    ("data[wtrecentcert]", Some(CertificateKind::WinterTravel), false),
    ("data[dhgrecentcert]", Some(CertificateKind::Dhg), false),
    ("data[cgil1recentcert]", Some(CertificateKind::Cgi1), false),
    ("data[cgil2recentcert]", Some(CertificateKind::Cgi2), false),
    ("data[cgil3recentcert]", Some(CertificateKind::Cgi3), false),
    ("data[trcirecentcert]", Some(CertificateKind::Trci), false),
    ("data[vfgrecentcert]", Some(CertificateKind::Vfg), false),
];

/// Exam extension columns, keyed by apprentice kind.
const EXTENSION_COLUMNS: [(&str, CertificateKind); 4] = [
    ("data[agexamextension]", CertificateKind::Aag),
    ("data[hgexamextension]", CertificateKind::Ahg),
    ("data[rgexamextension]", CertificateKind::Arg),
    ("data[sgexamextension]", CertificateKind::Asg),
];

/// One row of the designation import.
///
/// Serialized as the import's flat column set; every column is present and
/// empty when the member holds no date for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignationRow {
    pub id: String,
    pub designations: Designations,
}

impl DesignationRow {
    /// Value of one import column, if any.
    pub fn column(&self, name: &str) -> Option<NaiveDate> {
        let (_, kind, permanent_only) = DESIGNATION_COLUMNS.iter().find(|(column, ..)| *column == name)?;
        let kind = (*kind)?;
        if *permanent_only && !self.designations.is_permanent(kind) {
            return None;
        }
        self.designations.date(kind)
    }
}

impl Serialize for DesignationRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(DESIGNATION_COLUMNS.len() + 1))?;
        map.serialize_entry("ID", &self.id)?;
        for (column, ..) in DESIGNATION_COLUMNS {
            map.serialize_entry(column, &self.column(column).map(format_date).unwrap_or_default())?;
        }
        map.end()
    }
}

/// Apprenticeship exam time-limit extensions for one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLimitRow {
    pub id: String,
    pub extensions: BTreeMap<CertificateKind, NaiveDate>,
}

impl Serialize for TimeLimitRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(EXTENSION_COLUMNS.len() + 1))?;
        map.serialize_entry("ID", &self.id)?;
        for (column, kind) in EXTENSION_COLUMNS {
            let value = self.extensions.get(&kind).map(|d| format_date(*d)).unwrap_or_default();
            map.serialize_entry(column, &value)?;
        }
        map.end()
    }
}

/// Everything a batch run produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub as_of: Option<NaiveDate>,
    pub stats: BatchStats,
    pub profiles: Vec<ProfileReport>,
    pub memberships: Vec<MembershipRow>,
    pub designations: Vec<DesignationRow>,
    pub time_limit_extensions: Vec<TimeLimitRow>,
}

impl BatchReport {
    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), BatchError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| BatchError::Json {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| BatchError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Read one profile file as JSON.
pub fn load_profile(path: &Path) -> Result<Value, BatchError> {
    let content = std::fs::read_to_string(path).map_err(|e| BatchError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| BatchError::Json {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// List `*.json` files in `dir`, numeric stems first in numeric order, then
/// the rest by name.
pub fn profile_files(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let io_err = |e| BatchError::Io {
        path: dir.display().to_string(),
        source: e,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort_by_cached_key(|path| {
        let stem = file_stem(path);
        (stem.parse::<u64>().unwrap_or(u64::MAX), stem)
    });
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Runs validation and conversion over many profiles.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    converter: Converter,
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(converter: Converter, config: BatchConfig) -> Self {
        Self { converter, config }
    }

    /// Convert every profile file in `dir`.
    pub fn run_dir(&self, dir: &Path) -> Result<BatchReport, BatchError> {
        let files = profile_files(dir)?;
        tracing::info!(dir = %dir.display(), files = files.len(), "running batch");

        let mut entries = Vec::with_capacity(files.len());
        for path in &files {
            let raw = match load_profile(path) {
                Ok(raw) => Ok(raw),
                Err(BatchError::Json { message, .. }) => Err(message),
                Err(io) => return Err(io),
            };
            entries.push((file_stem(path), raw));
        }
        Ok(self.run(entries))
    }

    /// Convert already-loaded profiles, keyed by entry name. An `Err` entry
    /// is a file that could not be parsed as JSON.
    pub fn run(&self, entries: Vec<(String, Result<Value, String>)>) -> BatchReport {
        use rayon::prelude::*;

        let as_of = self.converter.config().resolve_as_of();
        let profiles: Vec<ProfileReport> = entries
            .par_iter()
            .map(|(entry, raw)| match raw {
                Ok(raw) => self.process(entry, raw, as_of),
                Err(message) => ProfileReport {
                    entry: entry.clone(),
                    profile_status: None,
                    member_number: None,
                    outcome: Outcome::Unreadable {
                        message: message.clone(),
                    },
                },
            })
            .collect();

        let report = self.assemble(profiles, as_of);
        let stats = &report.stats;
        tracing::info!(
            converted = stats.converted,
            skipped = stats.skipped,
            members = stats.member_count,
            member_parse_errors = stats.member_parse_errors,
            member_conversion_errors = stats.member_conversion_errors,
            nonmember_parse_errors = stats.nonmember_parse_errors,
            nonmember_conversion_errors = stats.nonmember_conversion_errors,
            "batch complete"
        );
        report
    }

    fn skip_reason(&self, raw: &Value, status: Option<&str>) -> Option<SkipReason> {
        match status.map(str::parse::<ProfileStatus>) {
            Some(Ok(ProfileStatus::Active | ProfileStatus::Inactive)) => None,
            Some(Ok(ProfileStatus::Resigned)) => {
                let date_end = raw.get("DateEnd").and_then(Value::as_str).and_then(parse_date);
                match date_end {
                    None if self.config.skip_resigned_without_end => Some(SkipReason::ResignedWithoutEnd),
                    Some(date_end) if date_end < self.config.resigned_cutoff => {
                        Some(SkipReason::ResignedBeforeCutoff { date_end })
                    }
                    _ => None,
                }
            }
            Some(Err(_)) | None => Some(SkipReason::UnsupportedStatus {
                status: status.map(str::to_string),
            }),
        }
    }

    /// Validate and convert one profile.
    fn process(&self, entry: &str, raw: &Value, as_of: NaiveDate) -> ProfileReport {
        let profile_status = raw.get("ProfileStatus").and_then(Value::as_str).map(str::to_string);
        let member_number = match raw.get("MemberNumber") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let report = |outcome| ProfileReport {
            entry: entry.to_string(),
            profile_status: profile_status.clone(),
            member_number: member_number.clone(),
            outcome,
        };

        if let Some(reason) = self.skip_reason(raw, profile_status.as_deref()) {
            tracing::debug!(entry, ?reason, "skipping profile");
            return report(Outcome::Skipped(reason));
        }

        let normalized = match intake::normalize(raw) {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::warn!(entry, status = ?profile_status, error = %e, "profile failed validation");
                return report(Outcome::ParseError {
                    issues: e.issues().to_vec(),
                    message: e.to_string(),
                });
            }
        };

        match self.converter.convert_as_of(&normalized.profile, as_of) {
            Ok(conversion) => {
                tracing::debug!(entry, brackets = conversion.professional.len(), "profile converted");
                report(Outcome::Converted {
                    professional: conversion.professional,
                    designations: conversion.designations,
                    time_limits: normalized.time_limits,
                    transforms: normalized.transforms,
                })
            }
            Err(e) => {
                tracing::warn!(entry, status = ?profile_status, error = %e, "profile failed conversion");
                report(Outcome::ConversionError { message: e.to_string() })
            }
        }
    }

    /// Tally stats and build import rows, in profile order.
    fn assemble(&self, profiles: Vec<ProfileReport>, as_of: NaiveDate) -> BatchReport {
        let mut report = BatchReport {
            as_of: Some(as_of),
            ..Default::default()
        };

        for profile in &profiles {
            let stats = &mut report.stats;
            match &profile.outcome {
                Outcome::Skipped(_) => {
                    stats.skipped += 1;
                    continue;
                }
                Outcome::Unreadable { .. } => {
                    stats.unreadable += 1;
                    continue;
                }
                _ => {}
            }

            let member = profile.is_member();
            if member {
                stats.member_count += 1;
            } else {
                stats.nonmember_count += 1;
            }
            match profile.status() {
                Some(ProfileStatus::Active) => stats.active_member_count += 1,
                Some(ProfileStatus::Inactive) => stats.inactive_member_count += 1,
                _ => {}
            }

            match &profile.outcome {
                Outcome::ParseError { .. } if member => stats.member_parse_errors += 1,
                Outcome::ParseError { .. } => stats.nonmember_parse_errors += 1,
                Outcome::ConversionError { .. } if member => stats.member_conversion_errors += 1,
                Outcome::ConversionError { .. } => stats.nonmember_conversion_errors += 1,
                Outcome::Converted {
                    professional,
                    designations,
                    time_limits,
                    ..
                } => {
                    stats.converted += 1;
                    let id = profile.import_id();
                    report.memberships.extend(professional.iter().map(|b| MembershipRow {
                        id: id.to_string(),
                        slug: b.slug.clone(),
                        start: format_date(b.start),
                        end: format_date(b.end),
                    }));
                    report.designations.push(DesignationRow {
                        id: id.to_string(),
                        designations: designations.clone(),
                    });

                    let extensions = self.extensions(designations, time_limits);
                    if !extensions.is_empty() {
                        report.time_limit_extensions.push(TimeLimitRow {
                            id: id.to_string(),
                            extensions,
                        });
                    }
                }
                Outcome::Skipped(_) | Outcome::Unreadable { .. } => {}
            }
        }

        report.profiles = profiles;
        report
    }

    /// Exam deadline per apprentice kind: the award anniversary in the
    /// extended year, overridden by the far horizon for permanent apprentices.
    fn extensions(
        &self,
        designations: &Designations,
        time_limits: &BTreeMap<CertificateKind, i32>,
    ) -> BTreeMap<CertificateKind, NaiveDate> {
        let mut extensions: BTreeMap<CertificateKind, NaiveDate> = time_limits
            .iter()
            .filter_map(|(kind, year)| {
                let awarded = designations.date(*kind)?;
                anniversary_in(awarded, *year).map(|deadline| (*kind, deadline))
            })
            .collect();
        for kind in designations.permanent_kinds() {
            extensions.insert(kind, self.config.permanent_apprentice_extension);
        }
        extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use serde_json::json;

    fn runner() -> BatchRunner {
        let converter = Converter::new(ConversionConfig {
            as_of: NaiveDate::from_ymd_opt(2026, 10, 16),
            ..Default::default()
        });
        BatchRunner::new(converter, BatchConfig::default())
    }

    #[test]
    fn skip_rules() {
        let r = runner();
        assert_eq!(
            r.skip_reason(&json!({}), Some("APPLICANT")),
            Some(SkipReason::UnsupportedStatus {
                status: Some("APPLICANT".into())
            })
        );
        assert_eq!(r.skip_reason(&json!({}), None), Some(SkipReason::UnsupportedStatus { status: None }));
        assert_eq!(r.skip_reason(&json!({}), Some("RESIGNED")), Some(SkipReason::ResignedWithoutEnd));
        assert_eq!(
            r.skip_reason(&json!({"DateEnd": "2020-12-31"}), Some("RESIGNED")),
            Some(SkipReason::ResignedBeforeCutoff {
                date_end: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap()
            })
        );
        assert_eq!(r.skip_reason(&json!({"DateEnd": "2021-01-01"}), Some("RESIGNED")), None);
        assert_eq!(r.skip_reason(&json!({}), Some("INACTIVE")), None);
    }

    #[test]
    fn resigned_without_end_kept_when_configured() {
        let r = BatchRunner::new(
            Converter::default(),
            BatchConfig {
                skip_resigned_without_end: false,
                ..Default::default()
            },
        );
        assert_eq!(r.skip_reason(&json!({}), Some("RESIGNED")), None);
    }

    #[test]
    fn unreadable_entry_is_counted_not_fatal() {
        let report = runner().run(vec![("7".into(), Err("expected value at line 1".into()))]);
        assert_eq!(report.stats.unreadable, 1);
        assert_eq!(report.stats.member_count, 0);
        assert!(matches!(report.profiles[0].outcome, Outcome::Unreadable { .. }));
    }

    #[test]
    fn permanent_apprentice_gets_extension_row() {
        let raw = json!({
            "ProfileStatus": "ACTIVE",
            "MemberNumber": "M-1",
            "DateJoined": "2015-01-01",
            "LastAnnualValidation": "2024-01-05",
            "AHG": {"status": "Active", "date": "2015-06-01"},
            "AHGPerm": {"status": "Active"}
        });
        let report = runner().run(vec![("1".into(), Ok(raw))]);

        assert_eq!(report.stats.converted, 1);
        assert_eq!(report.time_limit_extensions.len(), 1);
        let row = &report.time_limit_extensions[0];
        assert_eq!(row.id, "M-1");
        assert_eq!(row.extensions.get(&CertificateKind::Ahg), NaiveDate::from_ymd_opt(2100, 1, 1).as_ref());
        assert_eq!(report.memberships[0].slug, "apprentice_hiking_guide");
    }

    #[test]
    fn status_case_does_not_decide_membership() {
        let raw = json!({
            "ProfileStatus": "Active",
            "DateJoined": "2019-01-01",
            "LastAnnualValidation": "2024-01-05",
            "VFG": {"status": "Active", "date": "2020-06-01"}
        });
        let r = runner();
        assert_eq!(r.skip_reason(&raw, Some("Active")), None);
        assert_eq!(r.skip_reason(&json!({}), Some("resigned")), Some(SkipReason::ResignedWithoutEnd));

        let report = r.run(vec![("1".into(), Ok(raw))]);
        assert!(matches!(report.profiles[0].outcome, Outcome::Converted { .. }));
        assert_eq!(report.stats.member_count, 1);
        assert_eq!(report.stats.active_member_count, 1);
        assert_eq!(report.memberships.len(), 1);
    }

    #[test]
    fn time_limit_extends_to_award_anniversary() {
        let raw = json!({
            "ProfileStatus": "ACTIVE",
            "DateJoined": "2018-01-01",
            "LastAnnualValidation": "2024-01-05",
            "ARG": {"status": "Active", "date": "2019-06-25"},
            "AHG": {"status": "Active", "date": "2020-02-29"},
            "AHGPerm": {"status": "Active"},
            "RockTimeLimit": 2026,
            "HikeTimeLimit": "2025",
            "SkiTimeLimit": 2027
        });
        let report = runner().run(vec![("1".into(), Ok(raw))]);

        let row = &report.time_limit_extensions[0];
        assert_eq!(row.id, "1");
        assert_eq!(
            row.extensions,
            BTreeMap::from([
                (CertificateKind::Arg, NaiveDate::from_ymd_opt(2026, 6, 25).unwrap()),
                (CertificateKind::Ahg, NaiveDate::from_ymd_opt(2100, 1, 1).unwrap()),
            ])
        );
        assert_eq!(
            serde_json::to_value(row).unwrap(),
            json!({
                "ID": "1",
                "data[agexamextension]": "",
                "data[hgexamextension]": "2100-01-01",
                "data[rgexamextension]": "2026-06-25",
                "data[sgexamextension]": ""
            })
        );
    }

    #[test]
    fn designation_row_fills_permanent_columns_only_when_permanent() {
        let raw = json!({
            "ProfileStatus": "ACTIVE",
            "DateJoined": "2018-01-01",
            "LastAnnualValidation": "2024-01-05",
            "ARG": {"status": "Active", "date": "2019-06-25"},
            "AHG": {"status": "Active", "date": "2015-06-01"},
            "AHGPerm": {"status": "Active"},
            "HGWT": {"status": "Acquired", "date": "2016-02-01"}
        });
        let report = runner().run(vec![("1".into(), Ok(raw))]);
        let row = &report.designations[0];

        assert_eq!(row.column("data[argrecentcert]"), NaiveDate::from_ymd_opt(2019, 6, 25));
        assert_eq!(row.column("data[pargrecentcert]"), None);
        assert_eq!(row.column("data[pahgrecentcert]"), NaiveDate::from_ymd_opt(2015, 6, 1));
        assert_eq!(row.column("data[wtrecentcert]"), NaiveDate::from_ymd_opt(2016, 2, 1));
        assert_eq!(row.column("data[hgbridgerecentcert]"), None);
        assert_eq!(row.column("not a column"), None);

        let json = serde_json::to_value(row).unwrap();
        let columns = json.as_object().unwrap();
        assert_eq!(columns.len(), 22);
        assert_eq!(columns["data[ahgrecentcert]"], "2015-06-01");
        assert_eq!(columns["data[mgrecentcert]"], "");
    }
}
