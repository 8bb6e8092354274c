//! Serialization of structured values into persisted strings.
//!
//! Structured values have no native kind, so they are encoded to a string and
//! stored as [`Value::String`](crate::value::Value::String). The serde impls
//! of the value type act as its descriptor; the strategy only picks the
//! format.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{DataStoreError, Result};

/// Converts structured values to and from their persisted string form.
///
/// Failures are reported as `Err`, never by panicking.
pub trait SerializationStrategy: Send + Sync + 'static {
    /// Encode `value` for storage under `key`.
    fn serialize<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<String>;

    /// Decode the string persisted under `key`.
    fn deserialize<T: DeserializeOwned>(&self, key: &str, encoded: &str) -> Result<T>;
}

/// JSON encoding via serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerialization;

impl SerializationStrategy for JsonSerialization {
    fn serialize<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(|e| DataStoreError::SerializationFailed {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn deserialize<T: DeserializeOwned>(&self, key: &str, encoded: &str) -> Result<T> {
        serde_json::from_str(encoded).map_err(|e| DataStoreError::DeserializationFailed {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}
