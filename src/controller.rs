//! Widget refresh controller.
//!
//! Owns `last_update_time` and orchestrates one refresh:
//! fetch → map → rank → build → persist, strictly in sequence.
//!
//! - `should_refresh()` is a pure query against the 30-minute throttle window.
//! - `refresh()` always runs the pipeline; the caller decides when to ask.
//!   Any failure is logged and returned, and leaves `last_update_time` alone
//!   so the next call retries. The widget keeps its last good snapshot.
//! - `force_refresh()` resets the window, then refreshes.
//! - `clear()` writes the logged-out snapshot straight through the bridge.
//!
//! Overlapping `refresh()` calls on one controller join the run already in
//! flight instead of racing it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::bridge::{PersistOutcome, WidgetBridge};
use crate::clock::Clock;
use crate::error::SyncError;
use crate::mapper::map_records;
use crate::ranking::rank;
use crate::regions::{RegionLookup, StaticRegionLookup};
use crate::snapshot::{build_snapshot, logged_out_snapshot};
use crate::source::SubscriptionSource;

/// Minimum time between two non-forced refreshes (30 minutes)
pub const REFRESH_INTERVAL_MINUTES: i64 = 30;

/// Summary of a completed refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub completed_at: DateTime<Utc>,
    pub logged_in: bool,
    /// Lines written to the widget (after truncation).
    pub shown: usize,
    pub total_active_count: usize,
    pub outcome: PersistOutcome,
    /// True when this caller joined another caller's in-flight refresh.
    pub joined: bool,
}

pub struct RefreshController {
    source: Arc<dyn SubscriptionSource>,
    bridge: Arc<dyn WidgetBridge>,
    clock: Arc<dyn Clock>,
    regions: Arc<dyn RegionLookup>,
    app_version: String,
    last_update_time: Mutex<DateTime<Utc>>,
    in_flight: tokio::sync::Mutex<()>,
    completed_runs: AtomicU64,
    last_result: Mutex<Option<Result<RefreshReport, SyncError>>>,
}

impl RefreshController {
    pub fn new(
        source: Arc<dyn SubscriptionSource>,
        bridge: Arc<dyn WidgetBridge>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            bridge,
            clock,
            regions: Arc::new(StaticRegionLookup),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            last_update_time: Mutex::new(DateTime::<Utc>::UNIX_EPOCH),
            in_flight: tokio::sync::Mutex::new(()),
            completed_runs: AtomicU64::new(0),
            last_result: Mutex::new(None),
        }
    }

    pub fn with_regions(mut self, regions: Arc<dyn RegionLookup>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = app_version.into();
        self
    }

    pub fn with_last_update_time(mut self, last_update_time: DateTime<Utc>) -> Self {
        self.last_update_time = Mutex::new(last_update_time);
        self
    }

    /// Seed the throttle window from the snapshot the bridge last published,
    /// so a new process honours the window of the one before it.
    ///
    /// Only a signed-in snapshot counts: `clear()` never moves the window, so
    /// the snapshot it leaves behind must not either. A timestamp in the
    /// future is ignored.
    pub fn resume_from_bridge(self) -> Self {
        match persisted_update_time(self.bridge.as_ref()) {
            Some(at) if at <= self.clock.now() => {
                log::debug!("Widget refresh: resuming throttle window from {}", at);
                self.with_last_update_time(at)
            }
            _ => self,
        }
    }

    pub fn bridge(&self) -> &Arc<dyn WidgetBridge> {
        &self.bridge
    }

    /// When the last refresh completed; the Unix epoch if never.
    pub fn last_update_time(&self) -> DateTime<Utc> {
        *self.last_update_time.lock()
    }

    /// Whether the throttle window has elapsed. No side effects.
    pub fn should_refresh(&self) -> bool {
        self.clock.now() - self.last_update_time() >= Duration::minutes(REFRESH_INTERVAL_MINUTES)
    }

    /// Run the full pipeline, or join the one already running.
    pub async fn refresh(&self) -> Result<RefreshReport, SyncError> {
        let observed = self.completed_runs.load(Ordering::Acquire);
        let _flight = self.in_flight.lock().await;

        if self.completed_runs.load(Ordering::Acquire) != observed {
            let previous = self.last_result.lock().clone();
            if let Some(result) = previous {
                log::debug!("Widget refresh: joined in-flight refresh");
                return result.map(|report| RefreshReport {
                    joined: true,
                    ..report
                });
            }
        }

        let result = self.run_pipeline().await;
        *self.last_result.lock() = Some(result.clone());
        self.completed_runs.fetch_add(1, Ordering::Release);
        result
    }

    /// Bypass the throttle window and refresh now.
    pub async fn force_refresh(&self) -> Result<RefreshReport, SyncError> {
        *self.last_update_time.lock() = DateTime::<Utc>::UNIX_EPOCH;
        log::info!("Widget refresh: forced");
        self.refresh().await
    }

    /// Write the logged-out snapshot. Skips fetch/map/rank/build and leaves
    /// `last_update_time` untouched.
    pub async fn clear(&self) -> Result<PersistOutcome, SyncError> {
        match self.bridge.clear().await {
            Ok(outcome) => {
                log::info!("Widget refresh: cleared widget data via {}", self.bridge.name());
                Ok(outcome)
            }
            Err(e) => {
                log::warn!(
                    "Widget refresh: clear failed: {}. {}",
                    e,
                    e.recovery_suggestion()
                );
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self) -> Result<RefreshReport, SyncError> {
        let records = match self.source.fetch_subscriptions().await {
            Ok(records) => records,
            Err(e) => {
                log::warn!(
                    "Widget refresh: fetch failed, keeping last snapshot (retryable: {}): {}. {}",
                    e.is_retryable(),
                    e,
                    e.recovery_suggestion()
                );
                return Err(e);
            }
        };

        let now = self.clock.now();
        let snapshot = match records {
            Some(records) => {
                let items = map_records(&records, now, self.regions.as_ref());
                build_snapshot(rank(&items), true, now, &self.app_version)
            }
            None => {
                log::info!("Widget refresh: signed out, publishing empty snapshot");
                logged_out_snapshot(now, &self.app_version)
            }
        };

        let outcome = match self.bridge.write(&snapshot).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!(
                    "Widget refresh: {} write failed, keeping last snapshot (retryable: {}): {}. {}",
                    self.bridge.name(),
                    e.is_retryable(),
                    e,
                    e.recovery_suggestion()
                );
                return Err(e);
            }
        };

        let completed_at = self.clock.now();
        *self.last_update_time.lock() = completed_at;

        log::info!(
            "Widget refresh: published {} of {} lines via {} ({:?})",
            snapshot.active_esims.len(),
            snapshot.total_active_count,
            self.bridge.name(),
            outcome
        );

        Ok(RefreshReport {
            completed_at,
            logged_in: snapshot.is_logged_in,
            shown: snapshot.active_esims.len(),
            total_active_count: snapshot.total_active_count,
            outcome,
            joined: false,
        })
    }
}

fn persisted_update_time(bridge: &dyn WidgetBridge) -> Option<DateTime<Utc>> {
    let current = match bridge.read_current() {
        Ok(Some(current)) => current,
        Ok(None) => return None,
        Err(e) => {
            log::warn!(
                "Widget refresh: could not read {} state, starting with an open window: {}",
                bridge.name(),
                e
            );
            return None;
        }
    };
    if current.get("isLoggedIn").and_then(|v| v.as_bool()) != Some(true) {
        return None;
    }
    let raw = current.get("lastUpdated")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
