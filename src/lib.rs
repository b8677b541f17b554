// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # membership-tiers
//!
//! Converts a professional's dated certification history into non-overlapping,
//! date-bracketed membership tiers plus a designation record, for import into
//! a successor membership system.
//!
//! ## Architecture
//!
//! - **Rules** (`rules`): hand-curated supersedence table, resolved once into an
//!   immutable [`rules::RuleRegistry`]
//! - **Builder** (`builder`): one candidate bracket per dated certificate
//! - **Pipeline** (`pipeline`): pure post-processors (degenerate filter,
//!   winter-travel split, inactive tail, resignation split, slug merge)
//! - **Conversion** (`convert`): composes the above into a [`convert::Conversion`]
//! - **Intake** (`intake`) and **batch** (`batch`): raw-profile repair and
//!   validation, and directory-wide parallel runs
//!
//! ## Library usage
//!
//! ```no_run
//! use membership_tiers::config::ConversionConfig;
//! use membership_tiers::convert::Converter;
//! use membership_tiers::intake;
//!
//! let raw = serde_json::json!({
//!     "ProfileStatus": "ACTIVE",
//!     "DateJoined": "2023-11-03",
//!     "LastAnnualValidation": "2024-01-05",
//!     "CGI1": {"status": null, "date": "2023-10-01", "lastModified": null},
//!     "CGI2": {"status": "Active", "date": "2024-09-13", "lastModified": null}
//! });
//! let normalized = intake::normalize(&raw).unwrap();
//! let conversion = Converter::new(ConversionConfig::default())
//!     .convert(&normalized.profile)
//!     .unwrap();
//! println!("{}", serde_json::to_string_pretty(&conversion).unwrap());
//! ```

pub mod batch;
pub mod bracket;
pub mod builder;
pub mod certificate;
pub mod config;
pub mod convert;
pub mod dates;
pub mod designations;
pub mod error;
pub mod intake;
pub mod pipeline;
pub mod rules;
