//! Error types for preference store operations.
//!
//! Every public operation of the data store returns [`Result`]. The taxonomy
//! keeps validation, type dispatch, serialization and backend failures apart
//! so callers can tell them from one another.

use thiserror::Error;

/// Errors raised by a [`KeyValueStore`](crate::store::KeyValueStore) backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Database error from SQLx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted entry could not be decoded into a value.
    #[error("corrupted entry for key {key}: {reason}")]
    Corrupted { key: String, reason: String },

    /// The backend is temporarily unable to serve requests.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur during data store operations.
#[derive(Debug, Error)]
pub enum DataStoreError {
    /// The key or value was rejected before the store was touched.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// No primitive kind matches the runtime type and no serializer applies.
    #[error("unsupported value type: {0}")]
    UnsupportedType(String),

    /// A structured value could not be encoded.
    #[error("serialization failed for key {key}: {reason}")]
    SerializationFailed { key: String, reason: String },

    /// A persisted structured value could not be decoded.
    #[error("deserialization failed for key {key}: {reason}")]
    DeserializationFailed { key: String, reason: String },

    /// The underlying key-value store failed.
    #[error("store operation `{operation}` failed: {source}")]
    StoreOperationFailed {
        operation: &'static str,
        #[source]
        source: BackendError,
    },
}

/// Result type alias for data store operations.
pub type Result<T> = std::result::Result<T, DataStoreError>;

impl DataStoreError {
    pub(crate) fn store(operation: &'static str, source: BackendError) -> Self {
        DataStoreError::StoreOperationFailed { operation, source }
    }

    pub(crate) fn unsupported(type_name: &str) -> Self {
        DataStoreError::UnsupportedType(type_name.to_string())
    }

    /// Returns true if the key or value failed validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, DataStoreError::ValidationFailed(_))
    }

    /// Returns true if the underlying store raised the error.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, DataStoreError::StoreOperationFailed { .. })
    }

    /// Returns true if retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataStoreError::StoreOperationFailed {
                source: BackendError::Unavailable(_) | BackendError::Database(_),
                ..
            }
        )
    }
}
