//! Key and value validation.
//!
//! Runs before every mutating or keyed read operation. A failure
//! short-circuits the operation before the store or cache is touched.

use crate::config::DataStoreConfig;
use crate::error::{DataStoreError, Result};
use crate::value::Value;

/// Validates keys and values against configured limits.
#[derive(Debug, Clone)]
pub struct DataStoreValidator {
    max_key_length: usize,
    max_value_length: usize,
}

impl DataStoreValidator {
    pub fn new(config: &DataStoreConfig) -> Self {
        Self {
            max_key_length: config.max_key_length,
            max_value_length: config.max_value_length,
        }
    }

    /// Validate that a key is well-formed.
    pub fn validate_key(&self, key: &str) -> Result<()> {
        if key.trim().is_empty() {
            return Err(DataStoreError::ValidationFailed(
                "key cannot be blank".to_string(),
            ));
        }
        if key.len() > self.max_key_length {
            return Err(DataStoreError::ValidationFailed(format!(
                "key exceeds maximum length of {} bytes",
                self.max_key_length
            )));
        }
        if key.chars().any(char::is_control) {
            return Err(DataStoreError::ValidationFailed(
                "key cannot contain control characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate a value before it is written.
    ///
    /// NaN is rejected because it never compares equal to itself, which
    /// would defeat change deduplication for observers.
    pub fn validate_value(&self, value: &Value) -> Result<()> {
        match value {
            Value::Float(v) if v.is_nan() => Err(DataStoreError::ValidationFailed(
                "float value cannot be NaN".to_string(),
            )),
            Value::Double(v) if v.is_nan() => Err(DataStoreError::ValidationFailed(
                "double value cannot be NaN".to_string(),
            )),
            _ if value.payload_len() > self.max_value_length => {
                Err(DataStoreError::ValidationFailed(format!(
                    "value exceeds maximum length of {} bytes",
                    self.max_value_length
                )))
            }
            _ => Ok(()),
        }
    }

    /// Reject an absent value where one is required.
    pub fn require_present<T>(&self, value: Option<T>) -> Result<T> {
        value.ok_or_else(|| DataStoreError::ValidationFailed("value cannot be null".to_string()))
    }
}

impl Default for DataStoreValidator {
    fn default() -> Self {
        Self::new(&DataStoreConfig::default())
    }
}
