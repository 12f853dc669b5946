//! Storage error types

// redb::TransactionError is large (160 bytes); boxing would add allocation
// overhead on every error path, so the larger size is accepted.
#![allow(clippy::result_large_err)]

use thiserror::Error;

/// Errors raised by storage backends and storage-backed values
#[derive(Debug, Error)]
#[allow(clippy::result_large_err)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Quota exceeded writing {key}: {needed} bytes (limit: {limit} bytes)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    #[error("Value is not mergeable: {0}")]
    NotMergeable(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown storage kind: {0}")]
    InvalidKind(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },
}

impl serde::Serialize for StorageError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
