//! Browser `localStorage` / `sessionStorage` backend
//!
//! The `web_sys::Storage` handle is resolved on every call instead of being
//! held, so the backend stays `Send + Sync` like the native ones.

use super::{StorageBackend, StorageError, StorageKind};

/// Browser Web Storage backend
#[derive(Debug, Clone, Copy)]
pub struct WebStorage {
    kind: StorageKind,
}

impl WebStorage {
    /// `window.localStorage`
    pub fn local() -> Self {
        Self {
            kind: StorageKind::Local,
        }
    }

    /// `window.sessionStorage`
    pub fn session() -> Self {
        Self {
            kind: StorageKind::Session,
        }
    }

    fn storage(&self) -> Result<web_sys::Storage, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no global window".to_string()))?;

        let storage = match self.kind {
            StorageKind::Local => window.local_storage(),
            StorageKind::Session => window.session_storage(),
        };

        storage
            .map_err(|e| StorageError::Unavailable(format!("{} storage: {:?}", self.kind, e)))?
            .ok_or_else(|| StorageError::Unavailable(format!("{} storage disabled", self.kind)))
    }
}

impl StorageBackend for WebStorage {
    fn kind(&self) -> StorageKind {
        self.kind
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| StorageError::Backend(format!("getItem({}): {:?}", key, e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Backend(format!("setItem({}): {:?}", key, e)))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Backend(format!("removeItem({}): {:?}", key, e)))
    }
}
