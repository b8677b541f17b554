//! Converter and batch configuration, persisted as TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::RenewalCutover;
use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Settings for converting one profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// "Today" for past/future checks. Defaults to the local date.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    /// Day on which annual renewal rolls into the next membership year.
    #[serde(default)]
    pub renewal_cutover: RenewalCutover,
    /// Clone Active mountain-guide brackets as IFMGA for licensed ski guides.
    #[serde(default)]
    pub clone_ifmga_membership: bool,
}

impl ConversionConfig {
    /// The configured `as_of` date, or today.
    pub fn resolve_as_of(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Settings for the batch driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Skip resigned profiles with no `DateEnd`.
    #[serde(default = "default_skip_resigned_without_end")]
    pub skip_resigned_without_end: bool,
    /// Resigned profiles whose `DateEnd` is earlier than this are skipped.
    #[serde(default = "default_resigned_cutoff")]
    pub resigned_cutoff: NaiveDate,
    /// Time-limit extension granted to permanent apprentices.
    #[serde(default = "default_permanent_apprentice_extension")]
    pub permanent_apprentice_extension: NaiveDate,
}

fn default_skip_resigned_without_end() -> bool {
    true
}
fn default_resigned_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default()
}
fn default_permanent_apprentice_extension() -> NaiveDate {
    NaiveDate::from_ymd_opt(2100, 1, 1).unwrap_or(NaiveDate::MAX)
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            skip_resigned_without_end: default_skip_resigned_without_end(),
            resigned_cutoff: default_resigned_cutoff(),
            permanent_apprentice_extension: default_permanent_apprentice_extension(),
        }
    }
}

impl TierConfig {
    /// Parse from TOML text and check it.
    pub fn from_toml(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.conversion.renewal_cutover.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }
}
