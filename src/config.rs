//! Widget sync configuration stored in ~/.esim-widget/config.json.
//!
//! Every field has a default, so a missing file is a valid configuration.
//! The refresh interval is deliberately absent: it is a fixed constant.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bridge::OsVersion;
use crate::error::SyncError;

/// Which native widget surface this host drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetPlatform {
    /// Single-process native widget host (app-group suite + timeline reload).
    NativeWidget,
    /// Separate widget engine reading shared local storage.
    SharedStorage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSyncConfig {
    #[serde(default = "default_app_version")]
    pub app_version: String,
    #[serde(default = "default_platform")]
    pub platform: WidgetPlatform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default = "default_min_native_os_version")]
    pub min_native_os_version: String,
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_platform() -> WidgetPlatform {
    WidgetPlatform::SharedStorage
}

fn default_min_native_os_version() -> String {
    "14.0".to_string()
}

impl Default for WidgetSyncConfig {
    fn default() -> Self {
        Self {
            app_version: default_app_version(),
            platform: default_platform(),
            storage_dir: None,
            os_version: None,
            min_native_os_version: default_min_native_os_version(),
        }
    }
}

impl WidgetSyncConfig {
    /// Shared store directory: configured, else `~/.esim-widget/shared`.
    pub fn resolved_storage_dir(&self) -> Result<PathBuf, SyncError> {
        match &self.storage_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(state_dir()?.join("shared")),
        }
    }

    pub fn host_os_version(&self) -> Option<OsVersion> {
        self.os_version.as_deref().and_then(OsVersion::parse)
    }

    /// Falls back to 14.0 when the configured value doesn't parse.
    pub fn min_native_os(&self) -> OsVersion {
        OsVersion::parse(&self.min_native_os_version).unwrap_or_else(|| {
            log::warn!(
                "Invalid minNativeOsVersion '{}', using 14.0",
                self.min_native_os_version
            );
            OsVersion::new(14, 0, 0)
        })
    }
}

/// ~/.esim-widget
fn state_dir() -> Result<PathBuf, SyncError> {
    let home = dirs::home_dir().ok_or_else(|| SyncError::Config("Could not find home directory".into()))?;
    Ok(home.join(".esim-widget"))
}

/// Get the canonical config file path (~/.esim-widget/config.json)
pub fn config_path() -> Result<PathBuf, SyncError> {
    Ok(state_dir()?.join("config.json"))
}

/// Load configuration from ~/.esim-widget/config.json
pub fn load_config() -> Result<WidgetSyncConfig, SyncError> {
    load_config_from(&config_path()?)
}

/// Load configuration from an explicit path. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<WidgetSyncConfig, SyncError> {
    if !path.exists() {
        log::info!("No widget config at {}, using defaults", path.display());
        return Ok(WidgetSyncConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| SyncError::Config(format!("Failed to read config: {}", e)))?;
    serde_json::from_str(&content)
        .map_err(|e| SyncError::Config(format!("Failed to parse config: {}", e)))
}
