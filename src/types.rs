//! Shared data types for the widget sync pipeline.
//!
//! `SubscriptionRecord` is what the backend hands us. `LineItem` and
//! `Snapshot` are what the widgets read, so their serde shape is the native
//! storage schema and must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Backend input
// =============================================================================

/// Plan descriptor attached to a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// One subscription as returned by the backend for the signed-in user.
///
/// Byte fields are signed because upstream data is not always consistent
/// (negative remaining has been seen after plan migrations).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub id: String,
    #[serde(default)]
    pub plan: Option<PlanDescriptor>,
    #[serde(default)]
    pub region_code: Option<String>,
    #[serde(default)]
    pub data_total_bytes: Option<i64>,
    #[serde(default)]
    pub data_remaining_bytes: Option<i64>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Raw lifecycle code, e.g. "ACTIVE", "completed", "expired".
    #[serde(default)]
    pub status: String,
}

/// Backend lifecycle code, parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Active,
    /// Backend's finished-provisioning state; treated like `Active`.
    Completed,
    Expired,
    Depleted,
    Pending,
    Unknown,
}

impl BackendStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => BackendStatus::Active,
            "completed" | "complete" => BackendStatus::Completed,
            "expired" => BackendStatus::Expired,
            "depleted" | "exhausted" => BackendStatus::Depleted,
            "pending" | "provisioning" => BackendStatus::Pending,
            _ => BackendStatus::Unknown,
        }
    }

    /// Active or its completed-equivalent.
    pub fn is_live(self) -> bool {
        matches!(self, BackendStatus::Active | BackendStatus::Completed)
    }
}

// =============================================================================
// Widget-facing output
// =============================================================================

/// Lifecycle status shown on the widget face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EsimStatus {
    Active,
    Low,
    Critical,
    Depleted,
    Expired,
}

impl EsimStatus {
    /// Depleted and expired lines need the user's attention first.
    pub fn needs_attention(self) -> bool {
        matches!(self, EsimStatus::Depleted | EsimStatus::Expired)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EsimStatus::Active => "active",
            EsimStatus::Low => "low",
            EsimStatus::Critical => "critical",
            EsimStatus::Depleted => "depleted",
            EsimStatus::Expired => "expired",
        }
    }
}

/// One subscription, derived and ready for the widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub name: String,
    pub region_code: String,
    pub region_name: String,
    pub data_used_bytes: u64,
    pub data_total_bytes: u64,
    pub data_remaining_bytes: u64,
    #[serde(rename = "dataUsedGB")]
    pub data_used_gb: f64,
    #[serde(rename = "dataTotalGB")]
    pub data_total_gb: f64,
    #[serde(rename = "dataRemainingGB")]
    pub data_remaining_gb: f64,
    /// Always within 0..=100.
    pub usage_percent: u8,
    pub activated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub days_remaining: u32,
    pub status: EsimStatus,
}

/// The single state object pushed to native storage.
///
/// Built fresh on every successful refresh and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub last_updated: DateTime<Utc>,
    pub app_version: String,
    pub is_logged_in: bool,
    /// Ranked and truncated; at most `MAX_WIDGET_ITEMS` entries.
    pub active_esims: Vec<LineItem>,
    /// Size of the ranked list before truncation.
    pub total_active_count: usize,
    pub has_active_esims: bool,
}
