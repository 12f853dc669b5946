//! Persistent backend using redb
//!
//! Every slot is a row in the `slots` table, keyed by slot key and holding the
//! serialized JSON text. Each write is its own committed transaction, so a
//! successful `set` or `remove` is durable when it returns.

// Allow large error types - redb::TransactionError is large (160 bytes) but we accept this
// to avoid the overhead of boxing error types in common error paths
#![allow(clippy::result_large_err)]

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{StorageBackend, StorageError, StorageKind};

/// Store layout version
pub const STORE_VERSION: u32 = 1;

/// Table definitions
const SLOTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("slots");
const METADATA_TABLE: TableDefinition<&str, u32> = TableDefinition::new("metadata");

/// Persistent key-value store backed by a redb file
pub struct RedbStorage {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbStorage {
    /// Open the store at `path`, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let db = match Database::create(&path) {
            Ok(db) => {
                info!("Storage database opened at {:?}", path);
                db
            }
            Err(e) => {
                warn!(
                    "Failed to open storage database: {:?}, attempting recovery",
                    e
                );

                // Keep the unreadable file around for inspection
                let backup_path = path.with_extension("redb.backup");
                if let Err(e) = std::fs::rename(&path, &backup_path) {
                    error!("Failed to backup corrupted database: {:?}", e);
                } else {
                    info!("Backed up corrupted database to {:?}", backup_path);
                }

                Database::create(&path)?
            }
        };

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            {
                warn!(
                    "Failed to set restrictive permissions on database file: {}",
                    e
                );
            }
        }

        let store = Self {
            db: Arc::new(db),
            path,
        };
        store.initialize()?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create tables and stamp the layout version
    fn initialize(&self) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write().map_err(|e| {
            error!(
                "Failed to begin write transaction during initialization: {}",
                e
            );
            e
        })?;

        {
            let _ = write_txn.open_table(SLOTS_TABLE)?;
            let mut metadata = write_txn.open_table(METADATA_TABLE)?;

            let stored = metadata.get("version")?.map(|v| v.value());
            match stored {
                Some(found) if found > STORE_VERSION => {
                    return Err(StorageError::VersionMismatch {
                        found,
                        expected: STORE_VERSION,
                    });
                }
                Some(found) => {
                    debug!("Storage database version: {}", found);
                }
                None => {
                    metadata.insert("version", STORE_VERSION)?;
                    info!("Initialized storage database version: {}", STORE_VERSION);
                }
            }
        }

        write_txn.commit().map_err(|e| {
            error!(
                "Failed to commit initialization transaction (possible disk full): {}",
                e
            );
            e
        })?;

        Ok(())
    }

    /// List all slot keys
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SLOTS_TABLE)?;

        let mut keys = Vec::new();
        for item in table.iter()? {
            let (key, _) = item?;
            keys.push(key.value().to_string());
        }

        Ok(keys)
    }

    /// Number of stored slots
    pub fn len(&self) -> Result<usize, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SLOTS_TABLE)?;
        let len = table.len()?;
        usize::try_from(len)
            .map_err(|_| StorageError::Backend(format!("Slot count {} exceeds usize", len)))
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl StorageBackend for RedbStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SLOTS_TABLE)?;

        let value = table.get(key)?.map(|v| v.value().to_string());
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write()?;

        {
            let mut table = write_txn.open_table(SLOTS_TABLE)?;
            table.insert(key, value)?;
        }

        write_txn.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write()?;

        {
            let mut table = write_txn.open_table(SLOTS_TABLE)?;
            table.remove(key)?;
        }

        write_txn.commit()?;
        Ok(())
    }
}
