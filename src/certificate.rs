//! Certificate and profile data model.
//!
//! A [`MemberProfile`] is the validated snapshot the converter works from: a
//! handful of profile-level dates plus at most one [`CertificateRecord`] per
//! [`CertificateKind`]. Profiles are built by [`crate::intake`] and never
//! mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Certificate kind
// ---------------------------------------------------------------------------

/// Every certificate kind known to the training and assessment program,
/// plus the tier-only kinds introduced by the successor system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CertificateKind {
    #[serde(rename = "IFMGA")]
    Ifmga,
    #[serde(rename = "MG")]
    Mg,
    #[serde(rename = "AG")]
    Ag,
    #[serde(rename = "SG")]
    Sg,
    #[serde(rename = "RG")]
    Rg,
    #[serde(rename = "AAG")]
    Aag,
    #[serde(rename = "ASG")]
    Asg,
    #[serde(rename = "ARG")]
    Arg,
    #[serde(rename = "AHG")]
    Ahg,
    #[serde(rename = "DHG")]
    Dhg,
    #[serde(rename = "HG")]
    Hg,
    #[serde(rename = "HGW")]
    Hgw,
    #[serde(rename = "AHGW")]
    Ahgw,
    /// Winter travel: a scope extension, never a tier of its own.
    #[serde(rename = "HGWT")]
    WinterTravel,
    #[serde(rename = "CGI1")]
    Cgi1,
    #[serde(rename = "CGI2")]
    Cgi2,
    #[serde(rename = "CGI3")]
    Cgi3,
    #[serde(rename = "TRCI")]
    Trci,
    #[serde(rename = "VFG")]
    Vfg,
}

impl CertificateKind {
    /// All kinds, in declaration order.
    pub const ALL: [CertificateKind; 19] = [
        Self::Ifmga,
        Self::Mg,
        Self::Ag,
        Self::Sg,
        Self::Rg,
        Self::Aag,
        Self::Asg,
        Self::Arg,
        Self::Ahg,
        Self::Dhg,
        Self::Hg,
        Self::Hgw,
        Self::Ahgw,
        Self::WinterTravel,
        Self::Cgi1,
        Self::Cgi2,
        Self::Cgi3,
        Self::Trci,
        Self::Vfg,
    ];

    /// Kinds that may appear on a source profile.
    pub const SOURCE: [CertificateKind; 16] = [
        Self::Mg,
        Self::Ag,
        Self::Sg,
        Self::Rg,
        Self::Aag,
        Self::Asg,
        Self::Arg,
        Self::Ahg,
        Self::Dhg,
        Self::Hg,
        Self::WinterTravel,
        Self::Cgi1,
        Self::Cgi2,
        Self::Cgi3,
        Self::Trci,
        Self::Vfg,
    ];

    /// Apprentice kinds that can carry the permanent-apprentice marker.
    pub const PERMANENT_CAPABLE: [CertificateKind; 4] =
        [Self::Ahg, Self::Aag, Self::Asg, Self::Arg];

    /// Short code used on the wire (`"CGI1"`, `"HGWT"`, ...).
    pub fn code(self) -> &'static str {
        match self {
            Self::Ifmga => "IFMGA",
            Self::Mg => "MG",
            Self::Ag => "AG",
            Self::Sg => "SG",
            Self::Rg => "RG",
            Self::Aag => "AAG",
            Self::Asg => "ASG",
            Self::Arg => "ARG",
            Self::Ahg => "AHG",
            Self::Dhg => "DHG",
            Self::Hg => "HG",
            Self::Hgw => "HGW",
            Self::Ahgw => "AHGW",
            Self::WinterTravel => "HGWT",
            Self::Cgi1 => "CGI1",
            Self::Cgi2 => "CGI2",
            Self::Cgi3 => "CGI3",
            Self::Trci => "TRCI",
            Self::Vfg => "VFG",
        }
    }

    /// Whether this kind maps to a membership tier. Winter travel only
    /// modifies hiking tiers.
    pub fn has_membership(self) -> bool {
        !matches!(self, Self::WinterTravel)
    }

    /// Whether an apprentice of this kind can be a permanent apprentice.
    pub fn is_permanent_capable(self) -> bool {
        Self::PERMANENT_CAPABLE.contains(&self)
    }
}

impl fmt::Display for CertificateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CertificateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown certificate kind: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Status of one certificate on the source profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertificateStatus {
    Active,
    Inactive,
    Resigned,
    /// Used only by scope extensions such as winter travel.
    Acquired,
}

impl FromStr for CertificateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "resigned" => Ok(Self::Resigned),
            "acquired" => Ok(Self::Acquired),
            other => Err(format!("unknown certificate status: {other}")),
        }
    }
}

/// Overall status of the member profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileStatus {
    Active,
    Inactive,
    Resigned,
}

impl ProfileStatus {
    /// Members are ACTIVE or INACTIVE; resigned profiles are former members.
    pub fn is_member(self) -> bool {
        matches!(self, Self::Active | Self::Inactive)
    }
}

impl FromStr for ProfileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            "RESIGNED" => Ok(Self::Resigned),
            other => Err(format!("unsupported profile status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One certificate as held on a profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    pub status: Option<CertificateStatus>,
    pub date: Option<NaiveDate>,
    pub last_modified: Option<NaiveDate>,
    /// Set when a permanent-apprentice record was folded into this one.
    #[serde(default)]
    pub is_permanent: bool,
}

impl CertificateRecord {
    pub fn new(status: Option<CertificateStatus>, date: Option<NaiveDate>) -> Self {
        Self {
            status,
            date,
            ..Default::default()
        }
    }

    /// Set the last-modified date.
    pub fn with_last_modified(mut self, last_modified: NaiveDate) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Mark as a permanent apprentice.
    pub fn permanent(mut self) -> Self {
        self.is_permanent = true;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == Some(CertificateStatus::Active)
    }

    pub fn is_resigned(&self) -> bool {
        self.status == Some(CertificateStatus::Resigned)
    }
}

/// Certificates keyed by kind. Ordered so iteration is deterministic.
pub type CertificateMap = BTreeMap<CertificateKind, CertificateRecord>;

/// A validated member profile snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub date_joined: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub date_reinstate: Option<NaiveDate>,
    /// Absent for account holders who never completed joining.
    pub last_annual_validation: Option<NaiveDate>,
    pub ifmga_license_number: Option<String>,
    pub ski_exam_mode: Option<String>,
    pub overall_status: ProfileStatus,
    pub certificates: CertificateMap,
}

impl MemberProfile {
    /// An empty profile with the given overall status.
    pub fn new(overall_status: ProfileStatus) -> Self {
        Self {
            date_joined: None,
            date_end: None,
            date_reinstate: None,
            last_annual_validation: None,
            ifmga_license_number: None,
            ski_exam_mode: None,
            overall_status,
            certificates: CertificateMap::new(),
        }
    }

    pub fn certificate(&self, kind: CertificateKind) -> Option<&CertificateRecord> {
        self.certificates.get(&kind)
    }

    /// Whether any certificate is currently Active.
    pub fn has_active_certificate(&self) -> bool {
        self.certificates.values().any(CertificateRecord::is_active)
    }

    /// The resignation window, when both ends are known and ordered.
    pub fn resignation_window(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.date_end, self.date_reinstate) {
            (Some(end), Some(reinstate)) if end < reinstate => Some((end, reinstate)),
            _ => None,
        }
    }

    /// Whether the profile carries a real IFMGA license (not blank or `"0"`).
    pub fn has_ifmga_license(&self) -> bool {
        self.ifmga_license_number
            .as_deref()
            .map(str::trim)
            .is_some_and(|n| !n.is_empty() && n != "0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn kind_codes_round_trip_through_from_str() {
        for kind in CertificateKind::ALL {
            assert_eq!(kind.code().parse::<CertificateKind>().unwrap(), kind);
        }
        assert_eq!("cgi2".parse::<CertificateKind>().unwrap(), CertificateKind::Cgi2);
        assert!("XYZ".parse::<CertificateKind>().is_err());
    }

    #[test]
    fn serde_uses_wire_codes() {
        let json = serde_json::to_string(&CertificateKind::WinterTravel).unwrap();
        assert_eq!(json, "\"HGWT\"");
        let back: CertificateKind = serde_json::from_str("\"CGI3\"").unwrap();
        assert_eq!(back, CertificateKind::Cgi3);
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!("ACTIVE".parse::<CertificateStatus>().unwrap(), CertificateStatus::Active);
        assert_eq!("Acquired".parse::<CertificateStatus>().unwrap(), CertificateStatus::Acquired);
        assert!("pending".parse::<CertificateStatus>().is_err());
        assert_eq!("inactive".parse::<ProfileStatus>().unwrap(), ProfileStatus::Inactive);
        assert!("APPLICANT".parse::<ProfileStatus>().is_err());
    }

    #[test]
    fn resignation_window_requires_ordered_dates() {
        let mut p = MemberProfile::new(ProfileStatus::Active);
        assert_eq!(p.resignation_window(), None);

        p.date_end = Some(d("2024-02-15"));
        p.date_reinstate = Some(d("2024-03-15"));
        assert_eq!(p.resignation_window(), Some((d("2024-02-15"), d("2024-03-15"))));

        p.date_reinstate = Some(d("2024-02-15"));
        assert_eq!(p.resignation_window(), None);
    }

    #[test]
    fn ifmga_license_ignores_placeholder() {
        let mut p = MemberProfile::new(ProfileStatus::Active);
        assert!(!p.has_ifmga_license());
        p.ifmga_license_number = Some("0".into());
        assert!(!p.has_ifmga_license());
        p.ifmga_license_number = Some(" 499 ".into());
        assert!(p.has_ifmga_license());
    }

    #[test]
    fn source_kinds_exclude_tier_only_kinds() {
        assert!(!CertificateKind::SOURCE.contains(&CertificateKind::Ifmga));
        assert!(!CertificateKind::SOURCE.contains(&CertificateKind::Hgw));
        assert!(!CertificateKind::SOURCE.contains(&CertificateKind::Ahgw));
        assert!(CertificateKind::SOURCE.contains(&CertificateKind::WinterTravel));
    }
}
