//! Lifecycle status classification (pure, no I/O).

use crate::types::EsimStatus;

/// Usage at or above this is shown as critical.
pub const CRITICAL_USAGE_PERCENT: u8 = 90;
/// Usage at or above this is shown as low.
pub const LOW_USAGE_PERCENT: u8 = 80;

/// Classify a line from its usage and expiry flags.
///
/// First match wins: expired, depleted, critical, low, active.
pub fn classify(usage_percent: u8, is_expired: bool, is_depleted: bool) -> EsimStatus {
    if is_expired {
        EsimStatus::Expired
    } else if is_depleted {
        EsimStatus::Depleted
    } else if usage_percent >= CRITICAL_USAGE_PERCENT {
        EsimStatus::Critical
    } else if usage_percent >= LOW_USAGE_PERCENT {
        EsimStatus::Low
    } else {
        EsimStatus::Active
    }
}
