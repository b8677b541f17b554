//! Winter-travel splitter.
//!
//! Winter travel extends the hiking scope of practice. Once it is acquired,
//! every hiking tier that has a winter variant (per the rule table) continues
//! under that variant. A bracket spanning the acquisition date is split; a
//! bracket starting on or after it is relabeled whole.
//!
//! Two triggers are recognized. They never fire together, since the implicit
//! one requires an undated record:
//!
//! - **implicit**: winter travel is `Acquired` with no date of its own, and a
//!   ski-track certificate (apprentice ski guide or ski guide) is dated. The
//!   earliest such date is the split date.
//! - **explicit**: the winter-travel record carries its own date.

use chrono::NaiveDate;

use crate::bracket::{TierBracket, TierStatus};
use crate::certificate::{CertificateKind, CertificateStatus, MemberProfile};
use crate::dates::day_before;
use crate::rules::RuleRegistry;

/// Where a split date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinterTrigger {
    /// Granted with a ski-track certificate of this kind.
    Implicit(CertificateKind),
    /// Dated on the winter-travel record itself.
    Explicit,
}

/// Certificates whose date implicitly grants winter travel.
const SKI_TRACK: [CertificateKind; 2] = [CertificateKind::Asg, CertificateKind::Sg];

/// Split dates to apply, in order.
pub fn split_dates(profile: &MemberProfile) -> Vec<(NaiveDate, WinterTrigger)> {
    let Some(travel) = profile.certificate(CertificateKind::WinterTravel) else {
        return Vec::new();
    };

    let mut dates = Vec::with_capacity(2);
    if travel.status == Some(CertificateStatus::Acquired) && travel.date.is_none() {
        let implicit = SKI_TRACK
            .iter()
            .filter_map(|k| profile.certificate(*k).and_then(|r| r.date).map(|d| (d, *k)))
            .min();
        if let Some((date, kind)) = implicit {
            dates.push((date, WinterTrigger::Implicit(kind)));
        }
    }
    if let Some(date) = travel.date {
        dates.push((date, WinterTrigger::Explicit));
    }
    dates
}

/// Split or relabel every hiking bracket with a winter variant at `split`.
///
/// New winter brackets are appended, then the list is stably re-sorted by
/// start date, so a bracket built earlier keeps precedence on a shared start.
pub fn split_at(brackets: Vec<TierBracket>, registry: &RuleRegistry, split: NaiveDate) -> Vec<TierBracket> {
    let variants: Vec<(&'static str, &'static str)> = registry
        .iter()
        .filter_map(|rule| {
            let winter = rule.winter_variant.and_then(|w| registry.slug(w))?;
            Some((rule.slug, winter))
        })
        .collect();

    let mut out = Vec::with_capacity(brackets.len() + variants.len());
    let mut added = Vec::new();

    for mut bracket in brackets {
        if let Some(&(_, winter)) = variants.iter().find(|(base, _)| *base == bracket.slug) {
            if bracket.start >= split {
                tracing::debug!(bracket = %bracket, winter, "relabeling bracket to winter variant");
                bracket.slug = winter.to_string();
            } else if bracket.contains(split) {
                tracing::debug!(bracket = %bracket, %split, "splitting bracket at winter travel");
                added.push(TierBracket::new(winter, bracket.status, split, bracket.end));
                bracket.end = day_before(split);
                bracket.status = TierStatus::Inactive;
            }
        }
        out.push(bracket);
    }

    out.extend(added);
    out.sort_by_key(|b| b.start);
    out
}

/// Apply every winter-travel split the profile calls for.
pub fn apply(brackets: Vec<TierBracket>, registry: &RuleRegistry, profile: &MemberProfile) -> Vec<TierBracket> {
    split_dates(profile)
        .into_iter()
        .fold(brackets, |acc, (date, trigger)| {
            tracing::debug!(%date, ?trigger, "applying winter-travel split");
            split_at(acc, registry, date)
        })
}
