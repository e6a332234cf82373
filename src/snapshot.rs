//! Snapshot assembly: ranked line items + metadata → one immutable snapshot.

use chrono::{DateTime, Utc};

use crate::types::{LineItem, Snapshot};

/// Widgets show at most this many lines.
pub const MAX_WIDGET_ITEMS: usize = 3;

/// Build the snapshot for a ranked list.
///
/// `total_active_count` is the untruncated length. When logged out, the
/// ranked list is ignored and the canonical empty snapshot is returned.
pub fn build_snapshot(
    ranked: Vec<LineItem>,
    is_logged_in: bool,
    now: DateTime<Utc>,
    app_version: &str,
) -> Snapshot {
    if !is_logged_in {
        return logged_out_snapshot(now, app_version);
    }

    let total_active_count = ranked.len();
    let mut active_esims = ranked;
    active_esims.truncate(MAX_WIDGET_ITEMS);

    Snapshot {
        last_updated: now,
        app_version: app_version.to_string(),
        is_logged_in: true,
        active_esims,
        total_active_count,
        has_active_esims: total_active_count > 0,
    }
}

/// The canonical snapshot written on sign-out and by `clear()`.
pub fn logged_out_snapshot(now: DateTime<Utc>, app_version: &str) -> Snapshot {
    Snapshot {
        last_updated: now,
        app_version: app_version.to_string(),
        is_logged_in: false,
        active_esims: Vec::new(),
        total_active_count: 0,
        has_active_esims: false,
    }
}
