//! Error types for the widget sync pipeline
//!
//! Errors are classified by recoverability:
//! - Retryable: backend fetch failures, native write failures, storage I/O
//! - NonRetryable: serialization and configuration errors
//! - Unavailable: the native widget module is missing or the OS is too old
//!
//! Nothing here is ever raised into the host app. Every public entry point
//! hands these back as a plain `Result` after logging them.

use thiserror::Error;

/// Error types for widget snapshot sync.
///
/// Payloads are strings so one result can be cloned out to every caller that
/// joined the same in-flight refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    // Retryable errors
    #[error("Subscription fetch failed: {0}")]
    Fetch(String),

    #[error("Widget write failed: {0}")]
    BridgeWrite(String),

    #[error("Shared storage error: {0}")]
    Storage(String),

    // Non-retryable errors
    #[error("Widget bridge unavailable: {0}")]
    BridgeUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Returns true if a later refresh could reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Fetch(_) | SyncError::BridgeWrite(_) | SyncError::Storage(_)
        )
    }

    /// Get an operator-facing recovery suggestion for the log line
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SyncError::Fetch(_) => "The widget keeps its last snapshot. Retry on the next refresh.",
            SyncError::BridgeWrite(_) => "Check the shared app-group container is writable.",
            SyncError::Storage(_) => "Check file permissions and disk space for the shared store.",
            SyncError::BridgeUnavailable(_) => {
                "Widgets are not supported on this device; nothing to do."
            }
            SyncError::Serialization(_) => "The snapshot could not be encoded. Report a bug.",
            SyncError::Config(_) => "Check ~/.esim-widget/config.json is valid JSON.",
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::Storage(err.to_string())
    }
}
