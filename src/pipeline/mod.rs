//! Post-processing pipeline: ordered stages that correct, split, and filter
//! the builder's candidate brackets into a consistent result.
//!
//! Every stage is a pure transformation from one bracket list to the next.
//! [`crate::convert::Converter`] composes them in [`StageKind::ORDER`] and
//! records a [`StageReport`] per stage.

pub mod filter;
pub mod ifmga;
pub mod resign;
pub mod slug;
pub mod tail;
pub mod winter;

use serde::Serialize;

/// Built-in pipeline stage types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Place each certificate as a candidate bracket.
    Build,
    /// Drop zero-length and inverted brackets.
    DropDegenerate,
    /// Split or relabel hiking brackets at the winter-travel date.
    WinterTravel,
    /// Clone Active mountain-guide brackets as IFMGA (off by default).
    IfmgaClone,
    /// Append the inactive-member bracket for Inactive profiles.
    InactiveTail,
    /// Drop brackets that end before they start.
    DropInverted,
    /// Carve the resignation window out of spanning brackets.
    Resignation,
    /// Rename deprecated tier slugs.
    NormalizeSlugs,
}

impl StageKind {
    /// Stages in application order.
    pub const ORDER: [StageKind; 8] = [
        Self::Build,
        Self::DropDegenerate,
        Self::WinterTravel,
        Self::IfmgaClone,
        Self::InactiveTail,
        Self::DropInverted,
        Self::Resignation,
        Self::NormalizeSlugs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::DropDegenerate => "drop_degenerate",
            Self::WinterTravel => "winter_travel",
            Self::IfmgaClone => "ifmga_clone",
            Self::InactiveTail => "inactive_tail",
            Self::DropInverted => "drop_inverted",
            Self::Resignation => "resignation",
            Self::NormalizeSlugs => "normalize_slugs",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bracket counts around one executed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub brackets_in: usize,
    pub brackets_out: usize,
}
