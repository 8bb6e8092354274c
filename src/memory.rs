//! In-memory key-value backend.
//!
//! This backend is NOT durable - data is lost on process exit.
//! Use it for tests, previews and ephemeral sessions.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::store::{BackendResult, KeyValueStore};
use crate::value::Value;

/// In-memory implementation of KeyValueStore.
///
/// Uses a BTreeMap for ordered key iteration and RwLock for concurrency.
/// Cloning shares the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given entries.
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let data = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Get the number of entries in the store.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> BackendResult<Option<Value>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> BackendResult<()> {
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> BackendResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn clear(&self) -> BackendResult<()> {
        self.data.write().clear();
        Ok(())
    }

    async fn keys(&self) -> BackendResult<BTreeSet<String>> {
        Ok(self.data.read().keys().cloned().collect())
    }

    async fn has_key(&self, key: &str) -> BackendResult<bool> {
        Ok(self.data.read().contains_key(key))
    }

    async fn size(&self) -> BackendResult<usize> {
        Ok(self.len())
    }
}
