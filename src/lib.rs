//! Home-screen widget sync for eSIM subscriptions.
//!
//! Pulls the user's subscriptions, derives a per-line status, ranks lines so
//! the ones needing attention come first, and publishes a compact snapshot to
//! whichever native widget surface the host runs on.

pub mod bridge;
pub mod clock;
pub mod config;
pub mod controller;
pub mod deep_links;
pub mod error;
pub mod mapper;
pub mod platform;
pub mod ranking;
pub mod regions;
pub mod snapshot;
pub mod source;
pub mod status;
pub mod store;
pub mod types;

pub use bridge::{NativeWidgetBridge, PersistOutcome, SharedStorageBridge, WidgetBridge};
pub use clock::{Clock, SystemClock};
pub use config::{load_config, WidgetPlatform, WidgetSyncConfig};
pub use controller::{RefreshController, RefreshReport, REFRESH_INTERVAL_MINUTES};
pub use error::SyncError;
pub use source::{JsonFileSource, SubscriptionSource};
pub use types::{EsimStatus, LineItem, Snapshot, SubscriptionRecord};
