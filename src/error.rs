//! Rich diagnostic error types for the membership-tier converter.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! giving operators an error code and help text that points at the source
//! record that needs attention.

use chrono::NaiveDate;
use miette::Diagnostic;
use thiserror::Error;

use crate::certificate::CertificateKind;

/// Top-level error type for the converter.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the operator.
#[derive(Debug, Error, Diagnostic)]
pub enum TierError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Batch(#[from] BatchError),
}

// ---------------------------------------------------------------------------
// Data-integrity errors
// ---------------------------------------------------------------------------

/// The source record contradicts the conversion model.
///
/// These are the only errors the conversion itself raises. Everything else
/// (undeterminable certificates, degenerate or inverted brackets) resolves to a
/// smaller but valid result.
#[derive(Debug, Error, Diagnostic)]
pub enum IntegrityError {
    #[error(
        "{kind} is superseded by {superseded_by}, but its bracket would end on {end}, which is not before {as_of}"
    )]
    #[diagnostic(
        code(tiers::integrity::supersession_not_in_past),
        help(
            "A superseded certificate must end in the past. Check the date on the \
             superseding certificate; it is probably mistyped or set in the future."
        )
    )]
    SupersessionNotInPast {
        kind: CertificateKind,
        superseded_by: CertificateKind,
        end: NaiveDate,
        as_of: NaiveDate,
    },

    #[error("profile is Inactive but no membership bracket could be built to anchor the inactive tail")]
    #[diagnostic(
        code(tiers::integrity::inactive_without_history),
        help(
            "An Inactive member must have some detectable membership history. \
             Add the missing certificate dates or correct the profile status."
        )
    )]
    InactiveTailWithoutHistory,

    #[error("a membership-year end is needed for {context}, but the profile has no annual validation date")]
    #[diagnostic(
        code(tiers::integrity::missing_annual_validation),
        help("Set LastAnnualValidation on the profile, or mark the certificates as not Active.")
    )]
    MissingAnnualValidation { context: String },
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// One problem found while validating a raw profile.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationIssue {
    /// Location of the offending value, e.g. `["CGI2", "date"]`.
    pub path: Vec<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new<P: Into<String>>(path: impl IntoIterator<Item = P>, message: impl Into<String>) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.join("."), self.message)
    }
}

/// The raw profile could not be normalized into the converter's input shape.
#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    #[error("profile failed validation with {} issue(s): {}", .issues.len(), join_issues(.issues))]
    #[diagnostic(
        code(tiers::validation::invalid),
        help("Correct the listed fields in the source profile and re-run the conversion.")
    )]
    Invalid { issues: Vec<ValidationIssue> },

    #[error("malformed profile: {message}")]
    #[diagnostic(
        code(tiers::validation::malformed),
        help("The profile must be a JSON object exported from the source membership system.")
    )]
    Malformed { message: String },
}

impl ValidationError {
    /// The individual issues, empty for a malformed profile.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Invalid { issues } => issues,
            Self::Malformed { .. } => &[],
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(tiers::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(tiers::config::parse),
        help("Check the TOML syntax. Dates must be quoted strings such as \"2021-01-01\".")
    )]
    Parse { path: String, message: String },

    #[error("invalid renewal cutover: month {month}, day {day}")]
    #[diagnostic(
        code(tiers::config::invalid_cutover),
        help("The renewal cutover must name a real calendar day, e.g. month = 12, day = 1.")
    )]
    InvalidCutover { month: u32, day: u32 },
}

// ---------------------------------------------------------------------------
// Batch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum BatchError {
    #[error("I/O error on {path}")]
    #[diagnostic(
        code(tiers::batch::io),
        help("Check that the profile directory exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {message}")]
    #[diagnostic(
        code(tiers::batch::json),
        help("Each profile file must contain a single JSON object.")
    )]
    Json { path: String, message: String },
}

/// Convenience result type for the converter.
pub type TierResult<T> = std::result::Result<T, TierError>;
