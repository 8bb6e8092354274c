//! KeyValueStore trait - the contract every durable backend implements.
//!
//! The data store layers (cache, validation, change notification) sit on top
//! of this trait and never depend on a concrete backend. Any implementation
//! satisfying it (in-memory map, SQLite file, OS preference service) is
//! interchangeable.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::BackendError;
use crate::value::Value;

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// The underlying key-value store.
///
/// Last write wins: `put` replaces whatever value and kind the key held.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`, or `None` if it does not exist.
    async fn get(&self, key: &str) -> BackendResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Value) -> BackendResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> BackendResult<()>;

    /// Delete every key.
    async fn clear(&self) -> BackendResult<()>;

    /// All keys currently stored.
    async fn keys(&self) -> BackendResult<BTreeSet<String>>;

    /// Check if a key exists.
    async fn has_key(&self, key: &str) -> BackendResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Number of stored keys.
    async fn size(&self) -> BackendResult<usize> {
        Ok(self.keys().await?.len())
    }
}
