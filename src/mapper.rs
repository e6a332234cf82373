//! Subscription record → widget line item.
//!
//! Upstream records are partially redundant and sometimes contradictory, so
//! every derived field has a fallback. A malformed record resolves to zeros
//! rather than failing, and never blocks the rest of the batch.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::regions::{resolve_region_name, RegionLookup};
use crate::status::classify;
use crate::types::{BackendStatus, LineItem, SubscriptionRecord};

pub const BYTES_PER_MB: u64 = 1024 * 1024;
pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const MAX_TOTAL_BYTES: u64 = i64::MAX as u64;

fn re_plan_mb() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*MB\b").unwrap())
}

fn re_plan_gb() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*GB\b").unwrap())
}

/// Map one record, or `None` when it should not reach the widget.
///
/// Records are dropped when they have no usable plan, or when they are
/// expired and the backend no longer reports them as active/completed.
/// A record that just crossed its expiry while the backend still says
/// "active" is kept so it surfaces once more as expired.
pub fn map_record(
    record: &SubscriptionRecord,
    now: DateTime<Utc>,
    regions: &dyn RegionLookup,
) -> Option<LineItem> {
    let plan = record.plan.as_ref()?;
    let name = plan.name.trim();
    if name.is_empty() {
        return None;
    }

    let backend_status = BackendStatus::parse(&record.status);

    let total = resolve_total_bytes(record.data_total_bytes, name);
    let total_signed = i64::try_from(total).unwrap_or(i64::MAX);
    let remaining = record.data_remaining_bytes.unwrap_or(total_signed);
    let used = total_signed.saturating_sub(remaining).max(0) as u64;
    let remaining_bytes = remaining.max(0) as u64;
    let usage_percent = usage_percent(used, total);

    let days_remaining = days_remaining(record.expires_at, now);
    let is_expired = backend_status == BackendStatus::Expired
        || (record.expires_at.is_some() && days_remaining == 0);
    let is_depleted = backend_status == BackendStatus::Depleted || remaining <= 0;

    if is_expired && !backend_status.is_live() {
        return None;
    }

    let region_code = record.region_code.clone().unwrap_or_default();
    let region_name = resolve_region_name(regions, &region_code);

    Some(LineItem {
        id: record.id.clone(),
        name: name.to_string(),
        region_code,
        region_name,
        data_used_bytes: used,
        data_total_bytes: total,
        data_remaining_bytes: remaining_bytes,
        data_used_gb: bytes_to_gb(used),
        data_total_gb: bytes_to_gb(total),
        data_remaining_gb: bytes_to_gb(remaining_bytes),
        usage_percent,
        activated_at: record.activated_at,
        expires_at: record.expires_at,
        days_remaining,
        status: classify(usage_percent, is_expired, is_depleted),
    })
}

/// Map a batch, dropping records that don't qualify.
pub fn map_records(
    records: &[SubscriptionRecord],
    now: DateTime<Utc>,
    regions: &dyn RegionLookup,
) -> Vec<LineItem> {
    let items: Vec<LineItem> = records
        .iter()
        .filter_map(|r| map_record(r, now, regions))
        .collect();

    let dropped = records.len() - items.len();
    if dropped > 0 {
        log::debug!(
            "Widget mapper: kept {} of {} subscriptions ({} dropped)",
            items.len(),
            records.len(),
            dropped
        );
    }
    items
}

/// Total bytes: explicit field if positive, else MB then GB parsed from the plan name.
/// Capped at `i64::MAX` so it can be compared with the signed remaining count.
fn resolve_total_bytes(explicit: Option<i64>, plan_name: &str) -> u64 {
    if let Some(bytes) = explicit.filter(|b| *b > 0) {
        return bytes as u64;
    }
    let parsed = if let Some(mb) = parse_plan_amount(re_plan_mb(), plan_name) {
        mb * BYTES_PER_MB as f64
    } else if let Some(gb) = parse_plan_amount(re_plan_gb(), plan_name) {
        gb * BYTES_PER_GB as f64
    } else {
        return 0;
    };
    // Float to int casts saturate.
    (parsed.round() as u64).min(MAX_TOTAL_BYTES)
}

fn parse_plan_amount(re: &Regex, plan_name: &str) -> Option<f64> {
    re.captures(plan_name)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn usage_percent(used: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (used as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Whole days until expiry, rounded up; 0 when already past or no expiry.
fn days_remaining(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    match expires_at {
        Some(expiry) => {
            let days = (expiry - now).num_milliseconds() as f64 / MILLIS_PER_DAY;
            days.ceil().max(0.0) as u32
        }
        None => 0,
    }
}

/// Bytes → GB rounded to one decimal place.
pub fn bytes_to_gb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_GB as f64 * 10.0).round() / 10.0
}
