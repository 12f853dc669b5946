//! Storage-backed values
//!
//! A `StorageBackedValue` mirrors one typed value into one backend slot:
//!
//! ```text
//!   new()  ── get(key) ──► Restored | Missing | Recovered ──► current
//!   set(p) ── merge(current, p) ──► set(key, json) ──► current
//!   clear() ── remove(key) ──► current = initial
//! ```
//!
//! Reads never fail: missing or unreadable slots fall back to the initial
//! value and the reason is kept in `LoadOutcome`. Writes are fail-hard and
//! leave the in-memory value untouched when the backend rejects them.

pub mod codec;
pub mod merge;

pub use merge::shallow_merge;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::storage::{StorageBackend, StorageError, StorageKind};

/// Construction options for a storage-backed value
#[derive(Debug, Clone)]
pub struct StorageOptions<T = Value> {
    /// Which backend to use (default: local)
    pub storage: StorageKind,
    /// Slot key
    pub key: String,
    /// Fallback value and reset target for `clear`
    pub initial: T,
}

impl<T> StorageOptions<T> {
    pub fn new(key: impl Into<String>, initial: T) -> Self {
        Self {
            storage: StorageKind::default(),
            key: key.into(),
            initial,
        }
    }

    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }
}

/// How the current value was obtained at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Parsed from the backend slot
    Restored,
    /// Slot was empty; initial value used
    Missing,
    /// Slot could not be read or parsed; initial value used
    Recovered { reason: String },
}

impl LoadOutcome {
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restored => write!(f, "restored"),
            Self::Missing => write!(f, "missing"),
            Self::Recovered { reason } => write!(f, "recovered ({})", reason),
        }
    }
}

/// A value kept in sync with a backend slot
pub struct StorageBackedValue<T = Value> {
    backend: Arc<dyn StorageBackend>,
    key: String,
    /// Private copy of the caller's initial value
    initial: T,
    current: T,
    outcome: LoadOutcome,
}

impl<T> StorageBackedValue<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Bind `options.key` in `backend` and load its current value.
    ///
    /// `options.storage` is informational here; `BrowserStorage::use_storage`
    /// uses it to pick the backend.
    pub fn new(backend: Arc<dyn StorageBackend>, options: StorageOptions<T>) -> Self {
        let StorageOptions { key, initial, .. } = options;

        let (current, outcome) = match Self::load(backend.as_ref(), &key) {
            Ok(Some(value)) => (value, LoadOutcome::Restored),
            Ok(None) => (initial.clone(), LoadOutcome::Missing),
            Err(e) => {
                warn!(
                    "Failed to load {} storage slot {}: {}, using initial value",
                    backend.kind(),
                    key,
                    e
                );
                (
                    initial.clone(),
                    LoadOutcome::Recovered {
                        reason: e.to_string(),
                    },
                )
            }
        };

        debug!("Storage slot {} loaded: {}", key, outcome);

        Self {
            backend,
            key,
            initial,
            current,
            outcome,
        }
    }

    fn load(backend: &dyn StorageBackend, key: &str) -> Result<Option<T>, StorageError> {
        match backend.get(key)? {
            Some(raw) if !raw.is_empty() => Ok(Some(codec::decode(&raw)?)),
            _ => Ok(None),
        }
    }

    /// Current value
    pub fn value(&self) -> &T {
        &self.current
    }

    /// Initial value captured at construction
    pub fn initial(&self) -> &T {
        &self.initial
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.outcome
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> StorageKind {
        self.backend.kind()
    }

    /// Shallow-merge `partial` into the current value and persist the result.
    ///
    /// The in-memory value only changes once the backend write succeeded.
    pub fn set<P: Serialize + ?Sized>(&mut self, partial: &P) -> Result<(), StorageError> {
        let merged = shallow_merge(
            serde_json::to_value(&self.current)?,
            serde_json::to_value(partial)?,
        )?;
        let next: T = serde_json::from_value(merged)?;

        let raw = codec::encode(&next)?;
        self.backend.set(&self.key, &raw)?;
        self.current = next;

        debug!("Storage slot {} updated ({} bytes)", self.key, raw.len());
        Ok(())
    }

    /// Remove the slot and reset to the initial value
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.backend.remove(&self.key)?;
        self.current = self.initial.clone();

        debug!("Storage slot {} cleared", self.key);
        Ok(())
    }

    /// Consume the binding, returning the current value
    pub fn into_value(self) -> T {
        self.current
    }
}

impl<T: fmt::Debug> fmt::Debug for StorageBackedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageBackedValue")
            .field("kind", &self.backend.kind())
            .field("key", &self.key)
            .field("current", &self.current)
            .field("outcome", &self.outcome)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, RedbStorage};
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::TempDir;

    /// Backend whose every operation fails
    struct BrokenStorage;

    impl StorageBackend for BrokenStorage {
        fn kind(&self) -> StorageKind {
            StorageKind::Local
        }

        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("broken".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("broken".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("broken".to_string()))
        }
    }

    fn memory() -> Arc<MemoryStorage> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn test_empty_backend_uses_initial() {
        let value = StorageBackedValue::new(memory(), StorageOptions::new("u", json!({"a": 1})));

        assert_eq!(value.value(), &json!({"a": 1}));
        assert_eq!(value.load_outcome(), &LoadOutcome::Missing);
    }

    #[test]
    fn test_existing_entry_is_restored() {
        let backend = memory();
        backend.set("u", "{\"a\":2}").unwrap();

        let value = StorageBackedValue::new(backend, StorageOptions::new("u", json!({"a": 1})));

        assert_eq!(value.value(), &json!({"a": 2}));
        assert_eq!(value.load_outcome(), &LoadOutcome::Restored);
    }

    #[test]
    fn test_corrupted_entry_recovers() {
        let backend = memory();
        backend.set("u", "not-json").unwrap();

        let value = StorageBackedValue::new(backend.clone(), StorageOptions::new("u", json!({"a": 1})));

        assert_eq!(value.value(), &json!({"a": 1}));
        assert!(value.load_outcome().is_recovered());
        // The bad entry is left alone until the next write
        assert_eq!(backend.get("u").unwrap().as_deref(), Some("not-json"));
    }

    /// Writer that collects formatted log output for assertions
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[test]
    fn test_corrupted_entry_is_logged() {
        let backend = memory();
        backend.set("settings-slot", "not-json").unwrap();

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let value = tracing::subscriber::with_default(subscriber, || {
            StorageBackedValue::new(backend, StorageOptions::new("settings-slot", json!({"a": 1})))
        });

        assert!(value.load_outcome().is_recovered());
        let output = logs.contents();
        assert!(output.contains("WARN"), "missing warning in: {}", output);
        assert!(output.contains("settings-slot"), "missing key in: {}", output);
    }

    #[test]
    fn test_stored_null_accepts_set() {
        let backend = memory();
        backend.set("u", "null").unwrap();

        let mut value =
            StorageBackedValue::new(backend.clone(), StorageOptions::new("u", json!({"a": 1})));
        assert_eq!(value.load_outcome(), &LoadOutcome::Restored);
        assert_eq!(value.value(), &Value::Null);

        value.set(&json!({"b": 2})).unwrap();
        assert_eq!(value.value(), &json!({"b": 2}));
        assert_eq!(backend.get("u").unwrap().as_deref(), Some("{\"b\":2}"));
    }

    #[test]
    fn test_null_initial_accepts_set_after_clear() {
        let mut value = StorageBackedValue::new(memory(), StorageOptions::new("u", Value::Null));

        value.set(&json!({"a": 1})).unwrap();
        assert_eq!(value.value(), &json!({"a": 1}));

        value.clear().unwrap();
        assert_eq!(value.value(), &Value::Null);
        assert_eq!(value.initial(), &Value::Null);

        value.set(&json!({"b": 2})).unwrap();
        assert_eq!(value.into_value(), json!({"b": 2}));
    }

    #[test]
    fn test_empty_string_entry_is_missing() {
        let backend = memory();
        backend.set("u", "").unwrap();

        let value = StorageBackedValue::new(backend, StorageOptions::new("u", json!({"a": 1})));

        assert_eq!(value.value(), &json!({"a": 1}));
        assert_eq!(value.load_outcome(), &LoadOutcome::Missing);
    }

    #[test]
    fn test_read_failure_recovers() {
        let value = StorageBackedValue::new(
            Arc::new(BrokenStorage),
            StorageOptions::new("u", json!({"a": 1})),
        );

        assert_eq!(value.value(), &json!({"a": 1}));
        match value.load_outcome() {
            LoadOutcome::Recovered { reason } => assert!(reason.contains("broken")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_set_performs_shallow_merge() {
        let backend = memory();
        let mut value = StorageBackedValue::new(
            backend.clone(),
            StorageOptions::new("u", json!({"a": 1, "b": 2})),
        );

        value.set(&json!({"b": 3})).unwrap();

        assert_eq!(value.value(), &json!({"a": 1, "b": 3}));
        let stored: Value = codec::decode(&backend.get("u").unwrap().unwrap()).unwrap();
        assert_eq!(&stored, value.value());
    }

    #[test]
    fn test_clear_resets_and_removes() {
        let backend = memory();
        let mut value =
            StorageBackedValue::new(backend.clone(), StorageOptions::new("u", json!({"a": 1})));

        value.set(&json!({"a": 5})).unwrap();
        value.set(&json!({"b": true})).unwrap();
        value.clear().unwrap();

        assert_eq!(value.value(), &json!({"a": 1}));
        assert!(backend.get("u").unwrap().is_none());
    }

    #[test]
    fn test_clear_uses_private_initial_copy() {
        let mut initial = json!({"a": 1});
        let mut value =
            StorageBackedValue::new(memory(), StorageOptions::new("u", initial.clone()));

        initial["a"] = json!(99);
        value.set(&json!({"a": 2})).unwrap();
        value.clear().unwrap();

        assert_eq!(value.value(), &json!({"a": 1}));
        assert_eq!(value.initial(), &json!({"a": 1}));
    }

    #[test]
    fn test_keys_are_isolated() {
        let backend = memory();
        let mut first =
            StorageBackedValue::new(backend.clone(), StorageOptions::new("first", json!({})));
        let mut second =
            StorageBackedValue::new(backend.clone(), StorageOptions::new("second", json!({})));

        first.set(&json!({"x": 1})).unwrap();
        second.set(&json!({"y": 2})).unwrap();
        first.clear().unwrap();

        assert!(backend.get("first").unwrap().is_none());
        assert_eq!(backend.get("second").unwrap().as_deref(), Some("{\"y\":2}"));
        assert_eq!(second.value(), &json!({"y": 2}));
    }

    #[test]
    fn test_failed_write_leaves_state_unchanged() {
        let backend = Arc::new(MemoryStorage::with_quota(16));
        let mut value =
            StorageBackedValue::new(backend.clone(), StorageOptions::new("u", json!({"a": 1})));
        value.set(&json!({"a": 2})).unwrap();

        let err = value
            .set(&json!({"big": "xxxxxxxxxxxxxxxxxxxxxxxx"}))
            .unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));

        assert_eq!(value.value(), &json!({"a": 2}));
        assert_eq!(backend.get("u").unwrap().as_deref(), Some("{\"a\":2}"));
    }

    #[test]
    fn test_failed_clear_propagates() {
        let mut value = StorageBackedValue::new(
            Arc::new(BrokenStorage),
            StorageOptions::new("u", json!({"a": 1})),
        );
        assert!(value.clear().is_err());
        assert!(value.set(&json!({"a": 2})).is_err());
        assert_eq!(value.value(), &json!({"a": 1}));
    }

    #[test]
    fn test_non_object_value_is_not_mergeable() {
        let mut value = StorageBackedValue::new(memory(), StorageOptions::new("u", json!([1, 2])));
        assert!(matches!(
            value.set(&json!({"a": 1})),
            Err(StorageError::NotMergeable(_))
        ));
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        font_size: u32,
        #[serde(default)]
        pinned: Vec<String>,
    }

    #[test]
    fn test_typed_value_merge() {
        let backend = memory();
        let initial = Prefs {
            theme: "light".to_string(),
            font_size: 12,
            pinned: Vec::new(),
        };
        let mut prefs = StorageBackedValue::new(
            backend.clone(),
            StorageOptions::new("prefs", initial.clone()).storage(StorageKind::Session),
        );

        prefs.set(&json!({"theme": "dark"})).unwrap();
        assert_eq!(prefs.value().theme, "dark");
        assert_eq!(prefs.value().font_size, 12);

        // A patch that does not fit the type is rejected without side effects
        assert!(prefs.set(&json!({"font_size": "huge"})).is_err());
        assert_eq!(prefs.value().font_size, 12);

        let restored = StorageBackedValue::new(backend, StorageOptions::new("prefs", initial));
        assert_eq!(restored.value(), prefs.value());
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.redb");

        {
            let store = Arc::new(RedbStorage::open(&db_path).unwrap());
            let mut value = StorageBackedValue::new(store, StorageOptions::new("u", json!({"a": 1})));
            value.set(&json!({"b": 2})).unwrap();
        }

        let store = Arc::new(RedbStorage::open(&db_path).unwrap());
        let value = StorageBackedValue::new(store, StorageOptions::new("u", json!({"a": 1})));
        assert_eq!(value.value(), &json!({"a": 1, "b": 2}));
        assert_eq!(value.load_outcome(), &LoadOutcome::Restored);
    }
}
