//! Shallow object merge used by `StorageBackedValue::set`

use serde_json::{Map, Value};

use crate::storage::StorageError;

/// Merge the top-level entries of `patch` over `base`.
///
/// Keys in `patch` replace same-named keys in `base`; keys only in `base` are
/// kept. Nested objects are replaced wholesale, never merged recursively. A
/// `null` on either side counts as an empty object.
pub fn shallow_merge(base: Value, patch: Value) -> Result<Value, StorageError> {
    let mut merged = match base {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(StorageError::NotMergeable(format!(
                "current value is {}, expected an object",
                type_name(&other)
            )))
        }
    };

    match patch {
        Value::Object(patch) => merged.extend(patch),
        Value::Null => {}
        other => {
            return Err(StorageError::NotMergeable(format!(
                "update is {}, expected an object",
                type_name(&other)
            )))
        }
    }

    Ok(Value::Object(merged))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
