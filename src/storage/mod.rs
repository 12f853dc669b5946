//! Key-value storage backends
//!
//! A backend is a flat string-to-string store addressed by slot key. Two kinds
//! exist: a persistent store that survives restarts (redb on native targets,
//! `localStorage` in the browser) and a session store that lives as long as
//! the process or browser session (in-memory map, `sessionStorage`).

pub mod error;
pub mod memory;
pub mod store;
#[cfg(feature = "web")]
pub mod web;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use store::{RedbStorage, STORE_VERSION};
#[cfg(feature = "web")]
pub use web::WebStorage;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which backend a value is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Survives across sessions
    #[default]
    Local,
    /// Cleared when the session ends
    Session,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Session => write!(f, "session"),
        }
    }
}

impl FromStr for StorageKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "session" => Ok(Self::Session),
            other => Err(StorageError::InvalidKind(other.to_string())),
        }
    }
}

/// Three-operation key-value contract every backend implements.
///
/// `remove` on an absent key succeeds.
pub trait StorageBackend: Send + Sync {
    /// Backend kind, used for logging
    fn kind(&self) -> StorageKind;

    /// Read the raw text stored at `key`
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` at `key`, replacing any previous entry
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the entry at `key`
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
