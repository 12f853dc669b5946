//! Typed values mirrored into browser-style key-value storage.
//!
//! A [`StorageBackedValue`] binds one value to one slot in either a
//! persistent backend (`redb` natively, `localStorage` with the `web`
//! feature) or a session backend (in-memory natively, `sessionStorage` with
//! the `web` feature). Updates are shallow merges written through to the
//! backend; `clear` removes the slot and restores the initial value.
//!
//! ```no_run
//! use browser_storage::{BrowserStorage, StorageConfig, StorageOptions};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), browser_storage::StorageError> {
//! let storage = BrowserStorage::open(&StorageConfig::from_env())?;
//! let mut prefs = storage.use_storage(StorageOptions::new("prefs", json!({"theme": "light"})));
//! prefs.set(&json!({"theme": "dark"}))?;
//! prefs.clear()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod hub;
pub mod state;
pub mod storage;

pub use config::StorageConfig;
pub use hub::BrowserStorage;
pub use state::{LoadOutcome, StorageBackedValue, StorageOptions};
pub use storage::{MemoryStorage, RedbStorage, StorageBackend, StorageError, StorageKind};

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
