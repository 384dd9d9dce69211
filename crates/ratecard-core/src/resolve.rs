//! Specificity precedence for overlapping rate limits.
//!
//! Ordering is computed here, after rows are fetched, from
//! [`ScopeKind::rank`]. It never depends on how a backend happens to sort
//! scope labels.

use std::cmp::Ordering;

use crate::limit::RateLimit;

fn by_specificity(a: &RateLimit, b: &RateLimit) -> Ordering {
  b.applies_to
    .rank()
    .cmp(&a.applies_to.rank())
    .then_with(|| a.model.cmp(&b.model))
    .then_with(|| a.endpoint.cmp(&b.endpoint))
}

/// Most specific first: endpoint, then model, then account.
pub fn sort_by_specificity(limits: &mut [RateLimit]) { limits.sort_by(by_specificity); }

/// Grouped by limit type, each group most specific first.
pub fn sort_for_display(limits: &mut [RateLimit]) {
  limits.sort_by(|a, b| a.limit_type.cmp(&b.limit_type).then_with(|| by_specificity(a, b)));
}

/// The limit that takes effect from a list already ordered by
/// [`sort_by_specificity`].
pub fn effective(limits: &[RateLimit]) -> Option<&RateLimit> { limits.first() }
