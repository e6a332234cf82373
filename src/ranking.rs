//! Display priority for widget line items.
//!
//! Total, deterministic order:
//! 1. depleted/expired lines first (they need the user's attention)
//! 2. higher usage first
//! 3. fewer days remaining first
//!
//! The sort is stable, so lines equal on all three keys keep input order.

use std::cmp::Ordering;

use crate::types::LineItem;

/// Rank line items for display. Returns a new list; input order breaks ties.
pub fn rank(items: &[LineItem]) -> Vec<LineItem> {
    let mut ranked = items.to_vec();
    ranked.sort_by(compare_priority);
    ranked
}

fn compare_priority(a: &LineItem, b: &LineItem) -> Ordering {
    b.status
        .needs_attention()
        .cmp(&a.status.needs_attention())
        .then_with(|| b.usage_percent.cmp(&a.usage_percent))
        .then_with(|| a.days_remaining.cmp(&b.days_remaining))
}
