//! Storage configuration
//!
//! Where the persistent database lives and how much the session store may
//! hold. Defaults follow the platform data directory; environment variables
//! override them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Overrides `StorageConfig::data_dir`
pub const DATA_DIR_ENV: &str = "BROWSER_STORAGE_DIR";

/// Sets `StorageConfig::session_quota` (bytes)
pub const SESSION_QUOTA_ENV: &str = "BROWSER_STORAGE_SESSION_QUOTA";

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persistent database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Database file name inside `data_dir`
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Byte limit for the session store (None = unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_quota: Option<usize>,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("browser-storage"))
        .unwrap_or_else(|| PathBuf::from(".browser-storage"))
}

fn default_file_name() -> String {
    "storage.redb".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_name: default_file_name(),
            session_quota: None,
        }
    }
}

impl StorageConfig {
    /// Defaults, overridden by `BROWSER_STORAGE_DIR` and
    /// `BROWSER_STORAGE_SESSION_QUOTA`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(raw) = std::env::var(SESSION_QUOTA_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(quota) => config.session_quota = Some(quota),
                Err(e) => warn!(
                    "Ignoring invalid {}={:?}: {}",
                    SESSION_QUOTA_ENV, raw, e
                ),
            }
        }

        config
    }

    /// Config rooted at `data_dir`, other fields default
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn session_quota(mut self, quota: usize) -> Self {
        self.session_quota = Some(quota);
        self
    }

    /// Full path of the persistent database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}
