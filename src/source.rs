//! Where subscription records come from.
//!
//! The backend transport lives in the host app; this crate only sees the
//! `SubscriptionSource` seam. Records arrive already authorized and
//! filtered for the signed-in user.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SyncError;
use crate::types::SubscriptionRecord;

#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    /// Current records, or `None` when nobody is signed in.
    ///
    /// Owns its own timeout policy; the refresh controller never cancels it.
    async fn fetch_subscriptions(&self) -> Result<Option<Vec<SubscriptionRecord>>, SyncError>;
}

/// Backend export file shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionExport {
    #[serde(default = "default_logged_in")]
    logged_in: bool,
    #[serde(default)]
    subscriptions: Vec<SubscriptionRecord>,
}

fn default_logged_in() -> bool {
    true
}

/// Reads records from a JSON export (`{"loggedIn": true, "subscriptions": [...]}`).
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SubscriptionSource for JsonFileSource {
    async fn fetch_subscriptions(&self) -> Result<Option<Vec<SubscriptionRecord>>, SyncError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SyncError::Fetch(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        let export: SubscriptionExport = serde_json::from_str(&content).map_err(|e| {
            SyncError::Fetch(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        if !export.logged_in {
            return Ok(None);
        }
        Ok(Some(export.subscriptions))
    }
}
