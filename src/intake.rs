//! Intake: validate and repair a raw exported profile into a [`MemberProfile`].
//!
//! The source system exports each profile as a JSON object with PascalCase
//! profile fields and one entry per certificate code. A certificate is either
//! a nested record `{"status", "date", "lastModified"}` under its code, or the
//! flat export form `CGI1`, `CGI1Date`, `CGI1LastModified`.
//!
//! Known data gaps are repaired before validation, and every repair is
//! reported back as a human-readable transform line. Validation collects all
//! issues before failing.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::certificate::{CertificateKind, CertificateRecord, CertificateStatus, MemberProfile, ProfileStatus};
use crate::dates::parse_date;
use crate::error::{ValidationError, ValidationIssue};

/// Suffix of permanent-apprentice certificate codes (`AHGPerm`, ...).
const PERMANENT_SUFFIX: &str = "Perm";

/// Exam time-limit fields and the apprentice certificate each one extends.
pub const TIME_LIMIT_FIELDS: [(&str, CertificateKind); 4] = [
    ("RockTimeLimit", CertificateKind::Arg),
    ("SkiTimeLimit", CertificateKind::Asg),
    ("AlpineTimeLimit", CertificateKind::Aag),
    ("HikeTimeLimit", CertificateKind::Ahg),
];

/// A validated profile plus the repairs applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Normalized {
    pub profile: MemberProfile,
    /// Identifying number in the successor system, when exported.
    pub member_number: Option<String>,
    /// Year each apprentice exam deadline was extended to.
    pub time_limits: BTreeMap<CertificateKind, i32>,
    pub transforms: Vec<String>,
}

/// Validate and repair one raw profile.
pub fn normalize(raw: &Value) -> Result<Normalized, ValidationError> {
    let obj = raw.as_object().ok_or_else(|| ValidationError::Malformed {
        message: format!("expected a JSON object, found {}", json_type(raw)),
    })?;

    let mut reader = Reader::new(obj);

    let overall_status = reader.profile_status();
    let mut profile = MemberProfile::new(overall_status.unwrap_or(ProfileStatus::Active));
    profile.date_joined = reader.date_field("DateJoined");
    profile.date_end = reader.date_field("DateEnd");
    profile.date_reinstate = reader.date_field("DateReinstate");
    profile.last_annual_validation = reader.date_field("LastAnnualValidation");
    profile.ifmga_license_number = reader.text_field("IFMGALicenseNumber");
    profile.ski_exam_mode = reader
        .text_field("SkiExamMode")
        .or_else(|| reader.text_field("Mode"));
    let member_number = reader.text_field("MemberNumber");
    let time_limits: BTreeMap<CertificateKind, i32> = TIME_LIMIT_FIELDS
        .iter()
        .filter_map(|&(field, kind)| reader.year_field(field).map(|year| (kind, year)))
        .collect();

    for kind in CertificateKind::SOURCE {
        if let Some(record) = reader.certificate(kind.code()) {
            profile.certificates.insert(kind, record);
        }
    }
    let mut permanent: BTreeMap<CertificateKind, CertificateRecord> = CertificateKind::PERMANENT_CAPABLE
        .iter()
        .filter_map(|&base| {
            reader
                .certificate(&permanent_code(base))
                .map(|record| (base, record))
        })
        .collect();

    let mut issues = reader.issues;
    let mut transforms = Vec::new();

    repair(&mut profile, &mut permanent, &mut transforms);
    validate(&profile, &permanent, &mut issues);

    if !issues.is_empty() {
        return Err(ValidationError::Invalid { issues });
    }

    coalesce_permanent(&mut profile, permanent);

    Ok(Normalized {
        profile,
        member_number,
        time_limits,
        transforms,
    })
}

fn permanent_code(base: CertificateKind) -> String {
    format!("{}{PERMANENT_SUFFIX}", base.code())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Field reader that records type and format problems as it goes.
struct Reader<'a> {
    obj: &'a Map<String, Value>,
    issues: Vec<ValidationIssue>,
}

impl<'a> Reader<'a> {
    fn new(obj: &'a Map<String, Value>) -> Self {
        Self {
            obj,
            issues: Vec::new(),
        }
    }

    fn profile_status(&mut self) -> Option<ProfileStatus> {
        let Some(text) = self.text_field("ProfileStatus") else {
            self.issues
                .push(ValidationIssue::new(["ProfileStatus"], "ProfileStatus is required"));
            return None;
        };
        match text.parse() {
            Ok(status) => Some(status),
            Err(message) => {
                self.issues.push(ValidationIssue::new(["ProfileStatus"], message));
                None
            }
        }
    }

    fn date_field(&mut self, key: &str) -> Option<NaiveDate> {
        let obj = self.obj;
        let value = obj.get(key);
        self.date(value, &[key])
    }

    fn text_field(&mut self, key: &str) -> Option<String> {
        let obj = self.obj;
        let value = obj.get(key);
        self.text(value, &[key])
    }

    /// A calendar year, as a number or a numeric string.
    fn year_field(&mut self, key: &str) -> Option<i32> {
        let text = self.text_field(key)?;
        match text.parse::<i32>() {
            Ok(year) if (1000..=9999).contains(&year) => Some(year),
            _ => {
                self.issues.push(ValidationIssue::new(
                    [key],
                    format!("Invalid year \"{text}\", expected yyyy"),
                ));
                None
            }
        }
    }

    fn date(&mut self, value: Option<&Value>, path: &[&str]) -> Option<NaiveDate> {
        match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => {
                let parsed = parse_date(s);
                if parsed.is_none() {
                    self.issues.push(ValidationIssue::new(
                        path.iter().copied(),
                        format!("Invalid date \"{s}\", expected yyyy-MM-dd"),
                    ));
                }
                parsed
            }
            Some(other) => {
                self.issues.push(ValidationIssue::new(
                    path.iter().copied(),
                    format!("Expected a date string, received {}", json_type(other)),
                ));
                None
            }
        }
    }

    fn text(&mut self, value: Option<&Value>, path: &[&str]) -> Option<String> {
        match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(other) => {
                self.issues.push(ValidationIssue::new(
                    path.iter().copied(),
                    format!("Expected a string, received {}", json_type(other)),
                ));
                None
            }
        }
    }

    fn status(&mut self, value: Option<&Value>, path: &[&str]) -> Option<CertificateStatus> {
        let text = self.text(value, path)?;
        match text.parse() {
            Ok(status) => Some(status),
            Err(message) => {
                self.issues.push(ValidationIssue::new(path.iter().copied(), message));
                None
            }
        }
    }

    /// Read one certificate in nested or flat form. `None` when the profile
    /// carries nothing for it.
    fn certificate(&mut self, code: &str) -> Option<CertificateRecord> {
        let obj = self.obj;
        let (status, date, last_modified) = match obj.get(code) {
            Some(Value::Object(nested)) => (
                nested.get("status"),
                nested.get("date"),
                nested.get("lastModified"),
            ),
            Some(Value::Array(_)) | Some(Value::Bool(_)) | Some(Value::Number(_)) => {
                self.issues.push(ValidationIssue::new(
                    [code],
                    "Expected a certificate record or a status string",
                ));
                return None;
            }
            flat => (
                flat,
                obj.get(&format!("{code}Date")),
                obj.get(&format!("{code}LastModified")),
            ),
        };

        let record = CertificateRecord {
            status: self.status(status, &[code, "status"]),
            date: self.date(date, &[code, "date"]),
            last_modified: self.date(last_modified, &[code, "lastModified"]),
            is_permanent: false,
        };
        let empty = record.status.is_none() && record.date.is_none() && record.last_modified.is_none();
        (!empty).then_some(record)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Repairs
// ---------------------------------------------------------------------------

fn repair(
    profile: &mut MemberProfile,
    permanent: &mut BTreeMap<CertificateKind, CertificateRecord>,
    transforms: &mut Vec<String>,
) {
    // Mountain guides were often recorded without a certificate date.
    if let (Some(mg), Some(joined)) = (profile.certificates.get_mut(&CertificateKind::Mg), profile.date_joined) {
        if mg.date.is_none() {
            mg.date = Some(joined);
            transforms.push("MG.date backfilled with DateJoined".to_string());
        }
    }

    for (base, perm) in permanent.iter_mut() {
        if perm.date.is_some() {
            continue;
        }
        if let Some(date) = profile.certificate(*base).and_then(|r| r.date) {
            perm.date = Some(date);
            transforms.push(format!("Set {}.date to {}.date", permanent_code(*base), base.code()));
        }
    }

    if let Some(date_end) = profile.date_end {
        let base = profile
            .certificates
            .iter_mut()
            .map(|(k, r)| (k.code().to_string(), r));
        let perms = permanent.iter_mut().map(|(k, r)| (permanent_code(*k), r));
        for (code, record) in base.chain(perms) {
            if record.is_resigned() && record.last_modified.is_none() {
                record.last_modified = Some(date_end);
                transforms.push(format!("{code}.lastModified backfilled with DateEnd"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(
    profile: &MemberProfile,
    permanent: &BTreeMap<CertificateKind, CertificateRecord>,
    issues: &mut Vec<ValidationIssue>,
) {
    if let (Some(end), Some(reinstate)) = (profile.date_end, profile.date_reinstate) {
        if reinstate < end {
            issues.push(ValidationIssue::new(
                ["DateReinstate"],
                "Reinstatement date should be later than the End date",
            ));
        }
    }

    let base = profile
        .certificates
        .iter()
        .map(|(k, r)| (k.code().to_string(), r));
    let perms = permanent.iter().map(|(k, r)| (permanent_code(*k), r));
    for (code, record) in base.chain(perms) {
        let needs_date = matches!(
            record.status,
            Some(CertificateStatus::Active | CertificateStatus::Inactive | CertificateStatus::Resigned)
        );
        if needs_date && record.date.is_none() {
            issues.push(ValidationIssue::new(
                [code.as_str(), "date"],
                "Certificates with Active or Inactive status require a date",
            ));
        }

        let needs_last_modified = matches!(
            record.status,
            Some(CertificateStatus::Inactive | CertificateStatus::Resigned)
        );
        if needs_last_modified && record.last_modified.is_none() {
            issues.push(ValidationIssue::new(
                [code.as_str(), "lastModified"],
                "Certificates with Inactive or Resigned status require a lastModified date",
            ));
        }
    }
}

/// Fold permanent-apprentice records into their base kind.
///
/// Fields already on the base record win; missing ones come from the
/// permanent record. The base is marked permanent only when the permanent
/// record is Active.
fn coalesce_permanent(profile: &mut MemberProfile, permanent: BTreeMap<CertificateKind, CertificateRecord>) {
    for (base, perm) in permanent {
        let is_permanent = perm.is_active();
        let record = profile.certificates.entry(base).or_default();
        record.status = record.status.or(perm.status);
        record.date = record.date.or(perm.date);
        record.last_modified = record.last_modified.or(perm.last_modified);
        record.is_permanent |= is_permanent;
    }
}
