//! Single-process native widget host (Variant A).
//!
//! The widget extension only ever renders one line, so we store just the
//! highest-priority line item plus the aggregate counters, one key each, in
//! the app-group suite. A write is followed by a reload of every widget
//! timeline. Widgets need OS 14 or later; below that the bridge reports
//! unsupported without touching native storage.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{OsVersion, PersistOutcome, WidgetBridge};
use crate::clock::{Clock, SystemClock};
use crate::error::SyncError;
use crate::snapshot::logged_out_snapshot;
use crate::store::{KeyValueStore, WidgetReloader};
use crate::types::{LineItem, Snapshot};

/// First OS release with home-screen widgets.
pub const MIN_NATIVE_OS_VERSION: OsVersion = OsVersion::new(14, 0, 0);

pub const KEY_LAST_UPDATED: &str = "widget.lastUpdated";
pub const KEY_APP_VERSION: &str = "widget.appVersion";
pub const KEY_IS_LOGGED_IN: &str = "widget.isLoggedIn";
pub const KEY_TOP_ESIM: &str = "widget.topEsim";
pub const KEY_TOTAL_ACTIVE_COUNT: &str = "widget.totalActiveCount";
pub const KEY_HAS_ACTIVE_ESIMS: &str = "widget.hasActiveEsims";

pub struct NativeWidgetBridge {
    store: Option<Arc<dyn KeyValueStore>>,
    reloader: Option<Arc<dyn WidgetReloader>>,
    os_version: Option<OsVersion>,
    min_os_version: OsVersion,
    app_version: String,
    clock: Arc<dyn Clock>,
}

impl NativeWidgetBridge {
    /// `store` / `reloader` are `None` when the native module isn't linked
    /// into this host (reduced or sandboxed builds).
    pub fn new(
        store: Option<Arc<dyn KeyValueStore>>,
        reloader: Option<Arc<dyn WidgetReloader>>,
        os_version: Option<OsVersion>,
    ) -> Self {
        Self {
            store,
            reloader,
            os_version,
            min_os_version: MIN_NATIVE_OS_VERSION,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_min_os_version(mut self, min: OsVersion) -> Self {
        self.min_os_version = min;
        self
    }

    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = app_version.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// All six keys land together or not at all, so a failed write leaves
    /// the previous snapshot intact.
    fn persist(&self, store: &dyn KeyValueStore, snapshot: &Snapshot) -> Result<(), SyncError> {
        let top: Option<&LineItem> = snapshot.active_esims.first();
        let top_json = top.map(serde_json::to_string).transpose()?;
        let last_updated = snapshot.last_updated.to_rfc3339();
        let total = snapshot.total_active_count.to_string();

        store.set_many(&[
            (KEY_LAST_UPDATED, Some(last_updated.as_str())),
            (KEY_APP_VERSION, Some(snapshot.app_version.as_str())),
            (KEY_IS_LOGGED_IN, Some(bool_str(snapshot.is_logged_in))),
            (KEY_TOP_ESIM, top_json.as_deref()),
            (KEY_TOTAL_ACTIVE_COUNT, Some(total.as_str())),
            (KEY_HAS_ACTIVE_ESIMS, Some(bool_str(snapshot.has_active_esims))),
        ])
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[async_trait]
impl WidgetBridge for NativeWidgetBridge {
    fn name(&self) -> &'static str {
        "native-widget"
    }

    fn is_supported(&self) -> bool {
        self.store.is_some()
            && self
                .os_version
                .map(|v| v >= self.min_os_version)
                .unwrap_or(false)
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<PersistOutcome, SyncError> {
        if !self.is_supported() {
            log::debug!(
                "Widget bridge (native-widget): unsupported on OS {:?}, skipping write",
                self.os_version.map(|v| v.to_string())
            );
            return Ok(PersistOutcome::Skipped);
        }
        let store = match self.store.as_deref() {
            Some(store) => store,
            None => return Ok(PersistOutcome::Skipped),
        };

        if let Err(e) = self.persist(store, snapshot) {
            log::warn!("Widget bridge (native-widget): write failed: {}", e);
            return Err(SyncError::BridgeWrite(e.to_string()));
        }

        let redraw_requested = match self.reloader.as_deref() {
            Some(reloader) => {
                if let Err(e) = reloader.reload_all() {
                    log::warn!("Widget bridge (native-widget): timeline reload failed: {}", e);
                    return Err(SyncError::BridgeWrite(e.to_string()));
                }
                true
            }
            None => {
                log::debug!("Widget bridge (native-widget): no widget center, skipping reload");
                false
            }
        };

        log::info!(
            "Widget bridge (native-widget): stored top line of {} ({} total)",
            snapshot.active_esims.len(),
            snapshot.total_active_count
        );
        Ok(PersistOutcome::Persisted { redraw_requested })
    }

    async fn clear(&self) -> Result<PersistOutcome, SyncError> {
        let empty = logged_out_snapshot(self.clock.now(), &self.app_version);
        self.write(&empty).await
    }

    fn read_current(&self) -> Result<Option<serde_json::Value>, SyncError> {
        let store = match self.store.as_deref() {
            Some(store) => store,
            None => return Ok(None),
        };
        let last_updated = match store.get(KEY_LAST_UPDATED)? {
            Some(v) => v,
            None => return Ok(None),
        };
        let top_esim = match store.get(KEY_TOP_ESIM)? {
            Some(raw) => serde_json::from_str::<serde_json::Value>(&raw)?,
            None => serde_json::Value::Null,
        };
        let total: usize = store
            .get(KEY_TOTAL_ACTIVE_COUNT)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Ok(Some(json!({
            "lastUpdated": last_updated,
            "appVersion": store.get(KEY_APP_VERSION)?.unwrap_or_default(),
            "isLoggedIn": store.get(KEY_IS_LOGGED_IN)?.as_deref() == Some("true"),
            "topEsim": top_esim,
            "totalActiveCount": total,
            "hasActiveEsims": store.get(KEY_HAS_ACTIVE_ESIMS)?.as_deref() == Some("true"),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::{RecordingReloader, RecordingStore};
    use crate::clock::ManualClock;
    use crate::snapshot::build_snapshot;
    use crate::store::SqliteSuiteStore;
    use crate::types::EsimStatus;
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn line(id: &str, usage_percent: u8) -> LineItem {
        LineItem {
            id: id.to_string(),
            name: "Japan 5GB".to_string(),
            region_code: "JP".to_string(),
            region_name: "Japan".to_string(),
            data_used_bytes: 4,
            data_total_bytes: 5,
            data_remaining_bytes: 1,
            data_used_gb: 4.0,
            data_total_gb: 5.0,
            data_remaining_gb: 1.0,
            usage_percent,
            activated_at: None,
            expires_at: None,
            days_remaining: 10,
            status: EsimStatus::Low,
        }
    }

    fn bridge_with(
        store: Arc<RecordingStore>,
        reloader: Option<Arc<RecordingReloader>>,
        os: &str,
    ) -> NativeWidgetBridge {
        NativeWidgetBridge::new(
            Some(store as Arc<dyn KeyValueStore>),
            reloader.map(|r| r as Arc<dyn WidgetReloader>),
            OsVersion::parse(os),
        )
        .with_app_version("1.2.1")
        .with_clock(Arc::new(ManualClock::new(now())))
    }

    #[test]
    fn below_minimum_os_is_unsupported_without_native_calls() {
        let store = Arc::new(RecordingStore::default());
        let bridge = bridge_with(store.clone(), None, "13.7");
        assert!(!bridge.is_supported());
        assert_eq!(store.call_count(), 0);
    }

    #[test]
    fn unknown_os_or_missing_module_is_unsupported() {
        let store = Arc::new(RecordingStore::default());
        let bridge = NativeWidgetBridge::new(Some(store as Arc<dyn KeyValueStore>), None, None);
        assert!(!bridge.is_supported());

        let bridge = NativeWidgetBridge::new(None, None, OsVersion::parse("17.0"));
        assert!(!bridge.is_supported());
    }

    #[tokio::test]
    async fn unsupported_write_is_skipped() {
        let store = Arc::new(RecordingStore::default());
        let bridge = bridge_with(store.clone(), None, "12.0");
        let snapshot = build_snapshot(vec![line("a", 80)], true, now(), "1.2.1");
        assert_eq!(bridge.write(&snapshot).await, Ok(PersistOutcome::Skipped));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn stores_only_top_line_and_counters_then_reloads() {
        let store = Arc::new(RecordingStore::default());
        let reloader = Arc::new(RecordingReloader::default());
        let bridge = bridge_with(store.clone(), Some(reloader.clone()), "17.2");

        let snapshot = build_snapshot(
            vec![line("top", 95), line("second", 50), line("third", 10), line("fourth", 5)],
            true,
            now(),
            "1.2.1",
        );
        let outcome = bridge.write(&snapshot).await.expect("write");
        assert_eq!(
            outcome,
            PersistOutcome::Persisted {
                redraw_requested: true
            }
        );
        assert_eq!(reloader.count(), 1);

        let top: LineItem = serde_json::from_str(&store.value(KEY_TOP_ESIM).unwrap()).unwrap();
        assert_eq!(top.id, "top");
        assert_eq!(store.value(KEY_TOTAL_ACTIVE_COUNT).as_deref(), Some("4"));
        assert_eq!(store.value(KEY_HAS_ACTIVE_ESIMS).as_deref(), Some("true"));
        assert_eq!(store.value(KEY_IS_LOGGED_IN).as_deref(), Some("true"));
        assert!(!store.entries.lock().values().any(|v| v.contains("second")));
    }

    #[tokio::test]
    async fn clear_removes_top_line_and_zeroes_counters() {
        let store = Arc::new(RecordingStore::default());
        let bridge = bridge_with(store.clone(), None, "17.2");
        let snapshot = build_snapshot(vec![line("a", 80)], true, now(), "1.2.1");
        bridge.write(&snapshot).await.expect("write");

        let outcome = bridge.clear().await.expect("clear");
        assert_eq!(
            outcome,
            PersistOutcome::Persisted {
                redraw_requested: false
            }
        );
        assert_eq!(store.value(KEY_TOP_ESIM), None);
        assert_eq!(store.value(KEY_TOTAL_ACTIVE_COUNT).as_deref(), Some("0"));
        assert_eq!(store.value(KEY_IS_LOGGED_IN).as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn clear_is_safe_when_never_logged_in() {
        let store = Arc::new(RecordingStore::default());
        let bridge = bridge_with(store.clone(), None, "17.2");
        assert!(bridge.clear().await.is_ok());
        assert_eq!(store.value(KEY_HAS_ACTIVE_ESIMS).as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn store_failure_is_caught_and_returned() {
        let store = Arc::new(RecordingStore::failing());
        let reloader = Arc::new(RecordingReloader::default());
        let bridge = bridge_with(store, Some(reloader.clone()), "17.2");
        let snapshot = build_snapshot(vec![line("a", 80)], true, now(), "1.2.1");

        let result = bridge.write(&snapshot).await;
        assert!(matches!(result, Err(SyncError::BridgeWrite(_))));
        assert_eq!(reloader.count(), 0);
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_snapshot_whole() {
        let store = Arc::new(RecordingStore::default());
        let reloader = Arc::new(RecordingReloader::default());
        let first = bridge_with(store.clone(), Some(reloader.clone()), "17.2");
        first
            .write(&build_snapshot(vec![line("old", 80)], true, now(), "1.2.1"))
            .await
            .expect("first write");
        let before = first.read_current().unwrap().expect("stored");

        let later = now() + chrono::Duration::days(1);
        let second = bridge_with(store.clone(), Some(reloader.clone()), "17.2")
            .with_app_version("2.0.0");
        store.fail_nth_write(4);
        let result = second
            .write(&build_snapshot(
                vec![line("new", 95), line("other", 10)],
                true,
                later,
                "2.0.0",
            ))
            .await;

        assert!(matches!(result, Err(SyncError::BridgeWrite(_))));
        assert_eq!(first.read_current().unwrap(), Some(before.clone()));
        assert_eq!(before["topEsim"]["id"], "old");
        assert_eq!(before["appVersion"], "1.2.1");
        assert_eq!(reloader.count(), 1, "no reload after a failed write");
    }

    #[tokio::test]
    async fn reload_failure_is_a_write_failure() {
        let store = Arc::new(RecordingStore::default());
        let reloader = Arc::new(RecordingReloader::failing());
        let bridge = bridge_with(store, Some(reloader), "17.2");
        let snapshot = build_snapshot(vec![line("a", 80)], true, now(), "1.2.1");
        assert!(matches!(
            bridge.write(&snapshot).await,
            Err(SyncError::BridgeWrite(_))
        ));
    }

    #[tokio::test]
    async fn read_current_reflects_sqlite_suite() {
        let suite = Arc::new(SqliteSuiteStore::open_in_memory().expect("suite"));
        let bridge = NativeWidgetBridge::new(
            Some(suite as Arc<dyn KeyValueStore>),
            None,
            OsVersion::parse("16.4"),
        )
        .with_app_version("1.2.1");
        assert_eq!(bridge.read_current().unwrap(), None);

        let snapshot = build_snapshot(vec![line("a", 80), line("b", 20)], true, now(), "1.2.1");
        bridge.write(&snapshot).await.expect("write");

        let current = bridge.read_current().unwrap().expect("stored");
        assert_eq!(current["topEsim"]["id"], "a");
        assert_eq!(current["totalActiveCount"], 2);
        assert_eq!(current["isLoggedIn"], true);
        assert_eq!(current["appVersion"], "1.2.1");
    }
}
