//! Native shared key-value stores.
//!
//! Both widget surfaces read from a store shared between the host app and
//! the widget process. Only the host app writes, so the discipline is last
//! write wins with no locking across processes. Multi-key updates go through
//! `set_many` so the widget never reads half of one snapshot and half of the
//! previous one.
//!
//! - `sqlite`: app-group suite database (native widget host)
//! - `json_file`: single JSON document store (separate widget engine)

pub mod json_file;
pub mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteSuiteStore;

use crate::error::SyncError;

/// A string key-value store shared with the widget process.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError>;

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), SyncError>;

    /// Apply every entry or none of them. `None` removes the key.
    fn set_many(&self, entries: &[(&str, Option<&str>)]) -> Result<(), SyncError>;
}

/// Redraw signal for widget instances.
pub trait WidgetReloader: Send + Sync {
    /// Ask the widget host to redraw every instance.
    fn reload_all(&self) -> Result<(), SyncError>;
}
