//! Slug normalizer: deprecated tiers take their successor's slug.

use crate::bracket::TierBracket;
use crate::rules::RuleRegistry;

/// Rename every bracket whose tier is merged into another.
pub fn normalize(brackets: Vec<TierBracket>, registry: &RuleRegistry) -> Vec<TierBracket> {
    let renames: Vec<(&'static str, &'static str)> = registry
        .iter()
        .filter_map(|rule| Some((rule.slug, registry.slug(rule.merged_into?)?)))
        .collect();
    if renames.is_empty() {
        return brackets;
    }

    brackets
        .into_iter()
        .map(|mut bracket| {
            if let Some(&(_, to)) = renames.iter().find(|(from, _)| *from == bracket.slug) {
                bracket.slug = to.to_string();
            }
            bracket
        })
        .collect()
}
