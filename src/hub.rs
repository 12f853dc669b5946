//! Backend registry
//!
//! `BrowserStorage` owns one backend per `StorageKind` and hands out
//! `StorageBackedValue`s bound to the right one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::StorageConfig;
use crate::state::{StorageBackedValue, StorageOptions};
use crate::storage::{MemoryStorage, RedbStorage, StorageBackend, StorageError, StorageKind};

/// Persistent and session backends, selected by `StorageKind`
#[derive(Clone)]
pub struct BrowserStorage {
    local: Arc<dyn StorageBackend>,
    session: Arc<dyn StorageBackend>,
}

impl BrowserStorage {
    /// Open the redb store described by `config` and a fresh session store
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&config.data_dir)?;

        let local = RedbStorage::open(config.db_path())?;
        let session = match config.session_quota {
            Some(quota) => MemoryStorage::with_quota(quota),
            None => MemoryStorage::new(),
        };

        info!(
            "Browser storage ready: local={:?}, session quota={:?}",
            local.path(),
            config.session_quota
        );

        Ok(Self::with_backends(Arc::new(local), Arc::new(session)))
    }

    /// Use caller-provided backends
    pub fn with_backends(
        local: Arc<dyn StorageBackend>,
        session: Arc<dyn StorageBackend>,
    ) -> Self {
        Self { local, session }
    }

    /// `window.localStorage` and `window.sessionStorage`
    #[cfg(feature = "web")]
    pub fn web() -> Self {
        use crate::storage::WebStorage;

        Self::with_backends(
            Arc::new(WebStorage::local()),
            Arc::new(WebStorage::session()),
        )
    }

    pub fn backend(&self, kind: StorageKind) -> Arc<dyn StorageBackend> {
        match kind {
            StorageKind::Local => self.local.clone(),
            StorageKind::Session => self.session.clone(),
        }
    }

    /// Bind a value to `options.key` in the backend named by `options.storage`
    pub fn use_storage<T>(&self, options: StorageOptions<T>) -> StorageBackedValue<T>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        StorageBackedValue::new(self.backend(options.storage), options)
    }
}
