//! IFMGA membership clone.
//!
//! A licensed IFMGA guide who was assessed on skis holds the international
//! membership alongside the national mountain-guide tier. The clone is
//! disabled by default (`conversion.clone_ifmga_membership`).

use crate::bracket::{TierBracket, TierStatus};
use crate::certificate::{CertificateKind, MemberProfile};
use crate::rules::RuleRegistry;

/// Ski exam mode that qualifies for the IFMGA membership.
const QUALIFYING_EXAM_MODE: &str = "Ski";

/// Whether the profile qualifies for an IFMGA clone.
pub fn qualifies(profile: &MemberProfile) -> bool {
    profile.has_ifmga_license()
        && profile
            .ski_exam_mode
            .as_deref()
            .is_some_and(|mode| mode.trim().eq_ignore_ascii_case(QUALIFYING_EXAM_MODE))
}

/// Append an IFMGA copy of every Active mountain-guide bracket.
pub fn clone_memberships(
    mut brackets: Vec<TierBracket>,
    registry: &RuleRegistry,
    profile: &MemberProfile,
) -> Vec<TierBracket> {
    if !qualifies(profile) {
        return brackets;
    }
    let (Some(mg), Some(ifmga)) = (registry.slug(CertificateKind::Mg), registry.slug(CertificateKind::Ifmga)) else {
        return brackets;
    };

    let clones: Vec<TierBracket> = brackets
        .iter()
        .filter(|b| b.slug == mg && b.status == TierStatus::Active)
        .map(|b| TierBracket::new(ifmga, b.status, b.start, b.end))
        .collect();
    if !clones.is_empty() {
        tracing::debug!(count = clones.len(), "cloning mountain-guide brackets as IFMGA");
    }
    brackets.extend(clones);
    brackets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::ProfileStatus;
    use crate::dates::parse_date;

    fn mg_bracket(status: TierStatus) -> TierBracket {
        TierBracket::new(
            "mountain_guide",
            status,
            parse_date("2009-04-01").unwrap(),
            parse_date("2025-12-31").unwrap(),
        )
    }

    fn licensed() -> MemberProfile {
        let mut p = MemberProfile::new(ProfileStatus::Active);
        p.ifmga_license_number = Some("1234".into());
        p.ski_exam_mode = Some("Ski".into());
        p
    }

    #[test]
    fn clones_active_mountain_guide() {
        let reg = RuleRegistry::builtin();
        let out = clone_memberships(vec![mg_bracket(TierStatus::Active)], &reg, &licensed());
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].slug, "ifmga");
        assert_eq!(out[1].start, out[0].start);
        assert_eq!(out[1].end, out[0].end);
    }

    #[test]
    fn skips_inactive_brackets_and_unqualified_profiles() {
        let reg = RuleRegistry::builtin();
        let out = clone_memberships(vec![mg_bracket(TierStatus::Inactive)], &reg, &licensed());
        assert_eq!(out.len(), 1);

        let mut splitboard = licensed();
        splitboard.ski_exam_mode = Some("Splitboard".into());
        assert!(!qualifies(&splitboard));

        let mut placeholder = licensed();
        placeholder.ifmga_license_number = Some("0".into());
        assert!(!qualifies(&placeholder));
    }
}
