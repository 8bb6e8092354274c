//! Data store configuration.

use serde::{Deserialize, Serialize};

/// Maximum key length in bytes.
pub const MAX_KEY_LENGTH: usize = 1024;

/// Maximum string or serialized payload length in bytes.
pub const MAX_VALUE_LENGTH: usize = 1024 * 1024;

/// Default number of entries kept by the value cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Default buffer of the change broadcast channel.
pub const DEFAULT_CHANGE_BUFFER: usize = 1024;

/// Tunables for [`EnhancedDataStore`](crate::enhanced::EnhancedDataStore) and
/// [`ReactiveDataStore`](crate::reactive::ReactiveDataStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataStoreConfig {
    /// LRU capacity of the value cache.
    pub cache_capacity: usize,
    /// Events buffered per change subscriber before it lags.
    pub change_buffer: usize,
    pub max_key_length: usize,
    pub max_value_length: usize,
}

impl Default for DataStoreConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            change_buffer: DEFAULT_CHANGE_BUFFER,
            max_key_length: MAX_KEY_LENGTH,
            max_value_length: MAX_VALUE_LENGTH,
        }
    }
}

impl DataStoreConfig {
    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_change_buffer(mut self, buffer: usize) -> Self {
        self.change_buffer = buffer;
        self
    }

    pub fn with_max_key_length(mut self, length: usize) -> Self {
        self.max_key_length = length;
        self
    }

    pub fn with_max_value_length(mut self, length: usize) -> Self {
        self.max_value_length = length;
        self
    }
}
