//! Persistence bridge to the native widget surfaces.
//!
//! One capability set, two implementations picked once at startup:
//! - `native_widget`: single-process widget host. Stores the top line plus
//!   counters in an app-group suite and reloads every widget timeline.
//! - `shared_storage`: separate widget engine. Stores the whole snapshot as
//!   one JSON document and pokes the widget module if it is present.
//!
//! `write` and `clear` never panic past this boundary. Native failures are
//! logged here and come back as a `SyncError` the caller may ignore.

pub mod native_widget;
pub mod shared_storage;

pub use native_widget::NativeWidgetBridge;
pub use shared_storage::SharedStorageBridge;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SyncError;
use crate::types::Snapshot;

/// What a successful write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PersistOutcome {
    /// Snapshot stored; `redraw_requested` is false when no redraw hook was reachable.
    #[serde(rename_all = "camelCase")]
    Persisted { redraw_requested: bool },
    /// Bridge unsupported on this host; nothing was touched.
    Skipped,
}

#[async_trait]
pub trait WidgetBridge: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    /// Whether widgets can be driven on this host. Never touches native storage.
    fn is_supported(&self) -> bool;

    async fn write(&self, snapshot: &Snapshot) -> Result<PersistOutcome, SyncError>;

    /// Write the canonical logged-out snapshot. Safe if never logged in.
    async fn clear(&self) -> Result<PersistOutcome, SyncError>;

    /// What native storage currently holds, as JSON (diagnostics).
    fn read_current(&self) -> Result<Option<serde_json::Value>, SyncError>;
}

/// Host OS version, compared numerically (`17.2` > `9.3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl OsVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse "17", "17.2" or "17.2.1". Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = match parts.next() {
            Some(p) => p.trim().parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.trim().parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }
}

impl std::fmt::Display for OsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
