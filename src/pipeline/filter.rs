//! Filters that drop brackets carrying no membership signal.

use crate::bracket::TierBracket;

/// Drop brackets that start and end on the same day, or end before they start.
///
/// Supersedence chains routinely produce these when one certificate is
/// superseded the day after it was awarded.
pub fn drop_degenerate(brackets: Vec<TierBracket>) -> Vec<TierBracket> {
    brackets
        .into_iter()
        .filter(|b| {
            let keep = b.span_days() > 0;
            if !keep {
                tracing::debug!(bracket = %b, "dropping degenerate bracket");
            }
            keep
        })
        .collect()
}

/// Drop brackets whose end precedes their start.
pub fn drop_inverted(brackets: Vec<TierBracket>) -> Vec<TierBracket> {
    brackets
        .into_iter()
        .filter(|b| {
            let keep = b.is_ordered();
            if !keep {
                tracing::debug!(bracket = %b, "dropping inverted bracket");
            }
            keep
        })
        .collect()
}
