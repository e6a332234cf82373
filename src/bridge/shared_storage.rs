//! Separate widget engine over shared local storage (Variant B).
//!
//! The whole snapshot goes into one JSON document under `SNAPSHOT_KEY`. If
//! the host exposes a widget module we ask it to redraw; if it doesn't, the
//! write still counts and the widget picks the document up on its next
//! scheduled render.

use std::sync::Arc;

use async_trait::async_trait;

use super::{PersistOutcome, WidgetBridge};
use crate::clock::{Clock, SystemClock};
use crate::error::SyncError;
use crate::snapshot::logged_out_snapshot;
use crate::store::{KeyValueStore, WidgetReloader};
use crate::types::Snapshot;

pub const SNAPSHOT_KEY: &str = "widget.snapshot";

pub struct SharedStorageBridge {
    store: Option<Arc<dyn KeyValueStore>>,
    widget_module: Option<Arc<dyn WidgetReloader>>,
    app_version: String,
    clock: Arc<dyn Clock>,
}

impl SharedStorageBridge {
    pub fn new(
        store: Option<Arc<dyn KeyValueStore>>,
        widget_module: Option<Arc<dyn WidgetReloader>>,
    ) -> Self {
        Self {
            store,
            widget_module,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = app_version.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Decode the stored snapshot, if any.
    pub fn read_snapshot(&self) -> Result<Option<Snapshot>, SyncError> {
        let store = match self.store.as_deref() {
            Some(store) => store,
            None => return Ok(None),
        };
        match store.get(SNAPSHOT_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn request_redraw(&self) -> bool {
        match self.widget_module.as_deref() {
            Some(module) => match module.reload_all() {
                Ok(()) => true,
                Err(e) => {
                    log::warn!(
                        "Widget bridge (shared-storage): redraw request failed, widget will refresh lazily: {}",
                        e
                    );
                    false
                }
            },
            None => {
                log::debug!("Widget bridge (shared-storage): no widget module, widget will refresh lazily");
                false
            }
        }
    }
}

#[async_trait]
impl WidgetBridge for SharedStorageBridge {
    fn name(&self) -> &'static str {
        "shared-storage"
    }

    fn is_supported(&self) -> bool {
        self.store.is_some()
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<PersistOutcome, SyncError> {
        let store = match self.store.as_deref() {
            Some(store) => store,
            None => {
                log::debug!("Widget bridge (shared-storage): no shared store, skipping write");
                return Ok(PersistOutcome::Skipped);
            }
        };

        let document = match serde_json::to_string(snapshot) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("Widget bridge (shared-storage): failed to encode snapshot: {}", e);
                return Err(SyncError::from(e));
            }
        };

        if let Err(e) = store.set(SNAPSHOT_KEY, &document) {
            log::warn!("Widget bridge (shared-storage): write failed: {}", e);
            return Err(SyncError::BridgeWrite(e.to_string()));
        }

        let redraw_requested = self.request_redraw();
        log::info!(
            "Widget bridge (shared-storage): stored snapshot with {} of {} lines",
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
        match self.store.as_deref() {
            Some(store) => match store.get(SNAPSHOT_KEY)? {
                Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::{RecordingReloader, RecordingStore};
    use crate::clock::ManualClock;
    use crate::snapshot::build_snapshot;
    use crate::store::JsonFileStore;
    use crate::types::{EsimStatus, LineItem};
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn line(id: &str) -> LineItem {
        LineItem {
            id: id.to_string(),
            name: "Europe 3GB".to_string(),
            region_code: "EU".to_string(),
            region_name: "Europe".to_string(),
            data_used_bytes: 0,
            data_total_bytes: 3,
            data_remaining_bytes: 3,
            data_used_gb: 0.0,
            data_total_gb: 3.0,
            data_remaining_gb: 3.0,
            usage_percent: 0,
            activated_at: Some(now()),
            expires_at: None,
            days_remaining: 0,
            status: EsimStatus::Active,
        }
    }

    #[tokio::test]
    async fn stores_whole_snapshot_without_widget_module() {
        let store = Arc::new(RecordingStore::default());
        let bridge = SharedStorageBridge::new(Some(store.clone() as Arc<dyn KeyValueStore>), None);

        let snapshot = build_snapshot(vec![line("a"), line("b")], true, now(), "1.2.1");
        let outcome = bridge.write(&snapshot).await.expect("soft success");
        assert_eq!(
            outcome,
            PersistOutcome::Persisted {
                redraw_requested: false
            }
        );

        let stored: Snapshot = serde_json::from_str(&store.value(SNAPSHOT_KEY).unwrap()).unwrap();
        assert_eq!(stored, snapshot);
    }

    #[tokio::test]
    async fn requests_redraw_when_module_present() {
        let store = Arc::new(RecordingStore::default());
        let module = Arc::new(RecordingReloader::default());
        let bridge = SharedStorageBridge::new(
            Some(store as Arc<dyn KeyValueStore>),
            Some(module.clone() as Arc<dyn WidgetReloader>),
        );
        let snapshot = build_snapshot(vec![line("a")], true, now(), "1.2.1");
        let outcome = bridge.write(&snapshot).await.expect("write");
        assert_eq!(
            outcome,
            PersistOutcome::Persisted {
                redraw_requested: true
            }
        );
        assert_eq!(module.count(), 1);
    }

    #[tokio::test]
    async fn redraw_failure_does_not_fail_the_write() {
        let store = Arc::new(RecordingStore::default());
        let module = Arc::new(RecordingReloader::failing());
        let bridge = SharedStorageBridge::new(
            Some(store.clone() as Arc<dyn KeyValueStore>),
            Some(module as Arc<dyn WidgetReloader>),
        );
        let snapshot = build_snapshot(vec![line("a")], true, now(), "1.2.1");
        assert!(bridge.write(&snapshot).await.is_ok());
        assert!(store.value(SNAPSHOT_KEY).is_some());
    }

    #[tokio::test]
    async fn storage_failure_is_caught_and_returned() {
        let store = Arc::new(RecordingStore::failing());
        let bridge = SharedStorageBridge::new(Some(store as Arc<dyn KeyValueStore>), None);
        let snapshot = build_snapshot(vec![line("a")], true, now(), "1.2.1");
        assert!(matches!(
            bridge.write(&snapshot).await,
            Err(SyncError::BridgeWrite(_))
        ));
    }

    #[tokio::test]
    async fn missing_store_is_unsupported_and_skips() {
        let bridge = SharedStorageBridge::new(None, None);
        assert!(!bridge.is_supported());
        let snapshot = build_snapshot(vec![line("a")], true, now(), "1.2.1");
        assert_eq!(bridge.write(&snapshot).await, Ok(PersistOutcome::Skipped));
        assert_eq!(bridge.read_snapshot().unwrap(), None);
    }

    #[tokio::test]
    async fn clear_writes_canonical_empty_snapshot_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(JsonFileStore::new(dir.path().join("widget.json")));
        let bridge = SharedStorageBridge::new(Some(store as Arc<dyn KeyValueStore>), None)
            .with_app_version("1.2.1")
            .with_clock(Arc::new(ManualClock::new(now())));

        bridge
            .write(&build_snapshot(vec![line("a")], true, now(), "1.2.1"))
            .await
            .expect("write");
        bridge.clear().await.expect("clear");

        let stored = bridge.read_snapshot().unwrap().expect("stored");
        assert_eq!(stored, logged_out_snapshot(now(), "1.2.1"));
    }

    #[tokio::test]
    async fn file_document_matches_native_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(JsonFileStore::new(dir.path().join("widget.json")));
        let bridge = SharedStorageBridge::new(Some(store as Arc<dyn KeyValueStore>), None);
        bridge
            .write(&build_snapshot(vec![line("a")], true, now(), "1.2.1"))
            .await
            .expect("write");

        let doc = bridge.read_current().unwrap().expect("stored");
        for field in [
            "lastUpdated",
            "appVersion",
            "isLoggedIn",
            "activeEsims",
            "totalActiveCount",
            "hasActiveEsims",
        ] {
            assert!(doc.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(doc["activeEsims"][0]["regionName"], "Europe");
    }
}
