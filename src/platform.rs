//! One-time bridge selection at startup.
//!
//! The host picks its widget surface once from config and injects the
//! resulting bridge into the refresh controller; nothing re-checks the
//! platform per call.

use std::sync::Arc;

use crate::bridge::{NativeWidgetBridge, SharedStorageBridge, WidgetBridge};
use crate::clock::Clock;
use crate::config::{WidgetPlatform, WidgetSyncConfig};
use crate::error::SyncError;
use crate::store::{JsonFileStore, KeyValueStore, SqliteSuiteStore, WidgetReloader};

pub const SUITE_DB_FILE: &str = "widget-suite.db";
pub const SHARED_STORE_FILE: &str = "widget-storage.json";

/// Build the bridge for the configured platform.
///
/// A store that can't be opened leaves the bridge unsupported rather than
/// failing startup. `reloader` is the host's redraw hook, if it has one.
pub fn select_bridge(
    config: &WidgetSyncConfig,
    reloader: Option<Arc<dyn WidgetReloader>>,
    clock: Arc<dyn Clock>,
) -> Arc<dyn WidgetBridge> {
    let storage_dir = match config.resolved_storage_dir() {
        Ok(dir) => Some(dir),
        Err(e) => {
            log_unavailable(format!("no shared storage directory: {}", e));
            None
        }
    };

    match config.platform {
        WidgetPlatform::NativeWidget => {
            let store = storage_dir.and_then(|dir| {
                match SqliteSuiteStore::open_at(&dir.join(SUITE_DB_FILE)) {
                    Ok(store) => Some(Arc::new(store) as Arc<dyn KeyValueStore>),
                    Err(e) => {
                        log_unavailable(format!("failed to open app-group suite: {}", e));
                        None
                    }
                }
            });
            log::info!(
                "Widget platform: native widget host (OS {:?}, min {})",
                config.os_version,
                config.min_native_os()
            );
            Arc::new(
                NativeWidgetBridge::new(store, reloader, config.host_os_version())
                    .with_min_os_version(config.min_native_os())
                    .with_app_version(config.app_version.clone())
                    .with_clock(clock),
            )
        }
        WidgetPlatform::SharedStorage => {
            let store = storage_dir.map(|dir| {
                Arc::new(JsonFileStore::new(dir.join(SHARED_STORE_FILE))) as Arc<dyn KeyValueStore>
            });
            log::info!("Widget platform: shared storage widget engine");
            Arc::new(
                SharedStorageBridge::new(store, reloader)
                    .with_app_version(config.app_version.clone())
                    .with_clock(clock),
            )
        }
    }
}

/// Startup carries on without a store; the bridge then reports unsupported.
fn log_unavailable(reason: String) -> SyncError {
    let err = SyncError::BridgeUnavailable(reason);
    log::warn!("Widget platform: {}. {}", err, err.recovery_suggestion());
    err
}
