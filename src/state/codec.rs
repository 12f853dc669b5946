//! JSON text encoding for stored values

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage::StorageError;

/// Serialize a value to the text stored in a slot
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    Ok(serde_json::to_string(value)?)
}

/// Parse slot text back into a value
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    Ok(serde_json::from_str(raw)?)
}
