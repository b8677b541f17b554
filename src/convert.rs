//! Profile conversion: certificate history in, tier brackets and designations out.
//!
//! [`Converter`] holds the shared [`RuleRegistry`] and the conversion settings.
//! It has no other state, so a single converter may be used from many threads
//! at once.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::bracket::TierBracket;
use crate::builder::BuildContext;
use crate::certificate::{MemberProfile, ProfileStatus};
use crate::config::ConversionConfig;
use crate::designations::Designations;
use crate::error::{IntegrityError, TierResult};
use crate::intake::{self, Normalized};
use crate::pipeline::{self, StageKind, StageReport};
use crate::rules::RuleRegistry;

/// Result of converting one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    /// Membership-tier brackets, in import order.
    pub professional: Vec<TierBracket>,
    pub designations: Designations,
    /// Bracket counts per executed stage.
    #[serde(skip)]
    pub trace: Vec<StageReport>,
    /// Set when the profile is an account holder that never completed
    /// joining; no stage ran.
    #[serde(skip)]
    pub not_yet_joined: bool,
}

/// Converts member profiles. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Converter {
    registry: Arc<RuleRegistry>,
    config: ConversionConfig,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConversionConfig::default())
    }
}

impl Converter {
    /// A converter over the built-in rule table.
    pub fn new(config: ConversionConfig) -> Self {
        Self::with_registry(Arc::new(RuleRegistry::builtin()), config)
    }

    pub fn with_registry(registry: Arc<RuleRegistry>, config: ConversionConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert one validated profile.
    ///
    /// Only data-integrity violations are errors. Certificates that cannot be
    /// placed and brackets that collapse are left out of the result.
    pub fn convert(&self, profile: &MemberProfile) -> Result<Conversion, IntegrityError> {
        let as_of = self.config.resolve_as_of();
        self.convert_as_of(profile, as_of)
    }

    /// Validate and repair a raw exported profile, then convert it.
    pub fn convert_raw(&self, raw: &serde_json::Value) -> TierResult<(Normalized, Conversion)> {
        let normalized = intake::normalize(raw)?;
        let conversion = self.convert(&normalized.profile)?;
        Ok((normalized, conversion))
    }

    /// Convert with an explicit "today".
    pub fn convert_as_of(&self, profile: &MemberProfile, as_of: NaiveDate) -> Result<Conversion, IntegrityError> {
        let designations = Designations::from_certificates(&profile.certificates);

        // Account holder who never completed joining.
        if profile.last_annual_validation.is_none() && profile.has_active_certificate() {
            tracing::debug!("no annual validation with an Active certificate; not yet a member");
            return Ok(Conversion {
                professional: Vec::new(),
                designations,
                trace: Vec::new(),
                not_yet_joined: true,
            });
        }

        let year_end = profile
            .last_annual_validation
            .map(|validated| self.config.renewal_cutover.membership_year_end(validated));
        let ctx = BuildContext {
            registry: &self.registry,
            profile,
            as_of,
            year_end,
        };

        let mut trace = Vec::with_capacity(StageKind::ORDER.len());
        let mut brackets = Vec::new();
        for stage in StageKind::ORDER {
            let brackets_in = brackets.len();
            brackets = self.run_stage(stage, brackets, &ctx)?;
            tracing::debug!(%stage, brackets_in, brackets_out = brackets.len(), "stage complete");
            trace.push(StageReport {
                stage,
                brackets_in,
                brackets_out: brackets.len(),
            });
        }

        tracing::debug!(brackets = brackets.len(), "profile converted");
        Ok(Conversion {
            professional: brackets,
            designations,
            trace,
            not_yet_joined: false,
        })
    }

    fn run_stage(
        &self,
        stage: StageKind,
        brackets: Vec<TierBracket>,
        ctx: &BuildContext<'_>,
    ) -> Result<Vec<TierBracket>, IntegrityError> {
        let profile = ctx.profile;
        let out = match stage {
            StageKind::Build => ctx.build_all()?,
            StageKind::DropDegenerate => pipeline::filter::drop_degenerate(brackets),
            StageKind::WinterTravel => pipeline::winter::apply(brackets, &self.registry, profile),
            StageKind::IfmgaClone if self.config.clone_ifmga_membership => {
                pipeline::ifmga::clone_memberships(brackets, &self.registry, profile)
            }
            StageKind::IfmgaClone => brackets,
            StageKind::InactiveTail if profile.overall_status == ProfileStatus::Inactive => {
                pipeline::tail::append(brackets, ctx.year_end)?
            }
            StageKind::InactiveTail => brackets,
            StageKind::DropInverted => pipeline::filter::drop_inverted(brackets),
            StageKind::Resignation => match profile.resignation_window() {
                Some((end, reinstate)) => pipeline::resign::split(brackets, end, reinstate),
                None => brackets,
            },
            StageKind::NormalizeSlugs => pipeline::slug::normalize(brackets, &self.registry),
        };
        Ok(out)
    }
}
