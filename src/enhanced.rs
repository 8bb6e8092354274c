//! Typed, cached, validated key-value store.
//!
//! [`EnhancedDataStore`] layers validation, type dispatch, structured value
//! serialization and an LRU cache over any [`KeyValueStore`]. All operations
//! are serialized: each takes a turn on the store through a
//! [`StoreSession`], so the backend and the cache shadowing it are never
//! observed half-updated. Turns are granted in FIFO order.

use serde::{de::DeserializeOwned, Serialize};
use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::cache::{CacheManager, CacheStats};
use crate::config::DataStoreConfig;
use crate::error::{DataStoreError, Result};
use crate::handler::{self, PrimitiveType};
use crate::serialization::{JsonSerialization, SerializationStrategy};
use crate::store::KeyValueStore;
use crate::validator::DataStoreValidator;
use crate::value::Value;

/// Non-reactive typed data store.
pub struct EnhancedDataStore<S = JsonSerialization> {
    backend: Arc<dyn KeyValueStore>,
    validator: DataStoreValidator,
    serializer: S,
    cache: Mutex<CacheManager<String, Value>>,
}

impl EnhancedDataStore<JsonSerialization> {
    /// Create a store with the default configuration and JSON serialization.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_config(backend, &DataStoreConfig::default())
    }

    /// Create a store with the given configuration and JSON serialization.
    pub fn with_config(backend: Arc<dyn KeyValueStore>, config: &DataStoreConfig) -> Self {
        Self::with_serializer(backend, config, JsonSerialization)
    }
}

impl<S: SerializationStrategy> EnhancedDataStore<S> {
    /// Create a store that encodes structured values with `serializer`.
    pub fn with_serializer(
        backend: Arc<dyn KeyValueStore>,
        config: &DataStoreConfig,
        serializer: S,
    ) -> Self {
        Self {
            backend,
            validator: DataStoreValidator::new(config),
            serializer,
            cache: Mutex::new(CacheManager::new(config.cache_capacity)),
        }
    }

    /// The backend this store writes through to.
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Wait for a turn on the store.
    ///
    /// Every other operation waits until the returned session is dropped, so
    /// several calls on one session are observed as a single step.
    pub async fn session(&self) -> StoreSession<'_, S> {
        StoreSession {
            store: self,
            cache: self.cache.lock().await,
        }
    }

    /// Write a primitive value.
    pub async fn put_value<T: PrimitiveType>(&self, key: &str, value: T) -> Result<()> {
        self.session().await.put_value(key, value).await
    }

    /// Read a primitive value, or `default` if the key is absent.
    pub async fn get_value<T: PrimitiveType>(&self, key: &str, default: T) -> Result<T> {
        self.session().await.get_value(key, default).await
    }

    /// Write a type-erased value; see [`StoreSession::put_any`].
    pub async fn put_any<V: Any>(&self, key: &str, value: Option<&V>) -> Result<()> {
        self.session().await.put_any(key, value).await
    }

    /// Encode a structured value and write it.
    pub async fn put_serializable_value<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        self.session().await.put_serializable_value(key, value).await
    }

    /// Read a structured value, or `default` if it is absent or undecodable.
    pub async fn get_serializable_value<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        self.session().await.get_serializable_value(key, default).await
    }

    /// Whether the backend holds `key`.
    pub async fn has_key(&self, key: &str) -> Result<bool> {
        self.session().await.has_key(key).await
    }

    /// Remove a key from the backend and the cache.
    pub async fn remove_value(&self, key: &str) -> Result<()> {
        self.session().await.remove_value(key).await
    }

    /// Remove every key from the backend and the cache.
    pub async fn clear_all(&self) -> Result<()> {
        self.session().await.clear_all().await
    }

    /// Every key held by the backend.
    pub async fn get_all_keys(&self) -> Result<BTreeSet<String>> {
        self.session().await.get_all_keys().await
    }

    /// Number of keys held by the backend.
    pub async fn get_size(&self) -> Result<usize> {
        self.session().await.get_size().await
    }

    /// Drop one key from the cache; the backend is untouched.
    pub async fn invalidate_cache(&self, key: &str) {
        self.session().await.invalidate_cache(key);
    }

    /// Drop every cached entry; the backend is untouched.
    pub async fn invalidate_all_cache(&self) {
        self.session().await.invalidate_all_cache();
    }

    /// Number of cached entries.
    pub async fn get_cache_size(&self) -> usize {
        self.session().await.cache_size()
    }

    pub async fn is_cached(&self, key: &str) -> bool {
        self.session().await.is_cached(key)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.session().await.cache.stats()
    }
}

/// Exclusive turn on an [`EnhancedDataStore`].
pub struct StoreSession<'a, S> {
    store: &'a EnhancedDataStore<S>,
    cache: MutexGuard<'a, CacheManager<String, Value>>,
}

impl<'a, S: SerializationStrategy> StoreSession<'a, S> {
    fn backend(&self) -> &'a dyn KeyValueStore {
        self.store.backend.as_ref()
    }

    /// Check a key without touching the store or cache.
    pub fn validate_key(&self, key: &str) -> Result<()> {
        self.store.validator.validate_key(key)
    }

    /// Check a pending write without touching the store or cache.
    pub fn validate_write(&self, key: &str, value: &Value) -> Result<()> {
        self.store.validator.validate_key(key)?;
        self.store.validator.validate_value(value)
    }

    /// Write a primitive value.
    pub async fn put_value<T: PrimitiveType>(&mut self, key: &str, value: T) -> Result<()> {
        self.store.validator.validate_key(key)?;
        self.write(key, value.into_value()).await
    }

    /// Write an already-built stored value.
    pub async fn put_raw(&mut self, key: &str, value: Value) -> Result<()> {
        self.store.validator.validate_key(key)?;
        self.write(key, value).await
    }

    /// Write a value whose type is only known at runtime.
    ///
    /// `None` is rejected as a validation failure; a type with no primitive
    /// kind fails with `UnsupportedType`.
    pub async fn put_any<V: Any>(&mut self, key: &str, value: Option<&V>) -> Result<()> {
        let value = self.value_of_any(key, value)?;
        self.write(key, value).await
    }

    /// Resolve a type-erased value to its stored form without writing it.
    pub fn value_of_any<V: Any>(&self, key: &str, value: Option<&V>) -> Result<Value> {
        self.store.validator.validate_key(key)?;
        let value = self.store.validator.require_present(value)?;
        handler::require_value_of_any(value, std::any::type_name::<V>())
    }

    /// Read a primitive value, or `default` if the key is absent or holds
    /// another kind.
    pub async fn get_value<T: PrimitiveType>(&mut self, key: &str, default: T) -> Result<T> {
        Ok(self
            .peek(key)
            .await?
            .and_then(T::from_value)
            .unwrap_or(default))
    }

    /// Encode a structured value without writing it.
    pub fn encode<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<Value> {
        self.store
            .serializer
            .serialize(key, value)
            .map(Value::String)
    }

    pub async fn put_serializable_value<T>(&mut self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        self.store.validator.validate_key(key)?;
        let encoded = self.encode(key, value)?;
        self.write(key, encoded).await
    }

    /// Read a structured value.
    ///
    /// A persisted value that no longer decodes yields `default`, so a
    /// corrupted entry never fails a read.
    pub async fn get_serializable_value<T>(&mut self, key: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        match self.peek(key).await? {
            Some(Value::String(encoded)) => {
                match self.store.serializer.deserialize(key, &encoded) {
                    Ok(value) => Ok(value),
                    Err(err) => {
                        warn!(key, error = %err, "stored value no longer decodes, using default");
                        Ok(default)
                    }
                }
            }
            Some(other) => {
                warn!(key, kind = %other.kind(), "structured read of a primitive value, using default");
                Ok(default)
            }
            None => Ok(default),
        }
    }

    /// Current raw value of a key, read through the cache.
    pub async fn peek(&mut self, key: &str) -> Result<Option<Value>> {
        self.store.validator.validate_key(key)?;

        if let Some(value) = self.cache.get(key) {
            debug!(key, "cache hit");
            return Ok(Some(value.clone()));
        }

        debug!(key, "cache miss");
        let value = handler::get_raw(self.backend(), key).await?;
        if let Some(value) = &value {
            self.cache.put(key.to_string(), value.clone());
        }
        Ok(value)
    }

    /// Whether the backend holds `key`. Never answered from the cache.
    pub async fn has_key(&mut self, key: &str) -> Result<bool> {
        self.store.validator.validate_key(key)?;
        self.backend()
            .has_key(key)
            .await
            .map_err(|e| DataStoreError::store("has_key", e))
    }

    pub async fn remove_value(&mut self, key: &str) -> Result<()> {
        self.store.validator.validate_key(key)?;
        self.backend()
            .remove(key)
            .await
            .map_err(|e| DataStoreError::store("remove", e))?;
        self.cache.remove(key);
        Ok(())
    }

    pub async fn clear_all(&mut self) -> Result<()> {
        self.backend()
            .clear()
            .await
            .map_err(|e| DataStoreError::store("clear", e))?;
        self.cache.clear();
        Ok(())
    }

    pub async fn get_all_keys(&mut self) -> Result<BTreeSet<String>> {
        self.backend()
            .keys()
            .await
            .map_err(|e| DataStoreError::store("keys", e))
    }

    pub async fn get_size(&mut self) -> Result<usize> {
        self.backend()
            .size()
            .await
            .map_err(|e| DataStoreError::store("size", e))
    }

    pub fn invalidate_cache(&mut self, key: &str) {
        self.cache.remove(key);
    }

    pub fn invalidate_all_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.size()
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    async fn write(&mut self, key: &str, value: Value) -> Result<()> {
        self.store.validator.validate_value(&value)?;
        handler::put(self.backend(), key, value.clone()).await?;
        self.cache.put(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::memory::MemoryStore;
    use crate::store::BackendResult;
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct UserData {
        name: String,
        followed_topics: Vec<String>,
    }

    fn store_with(capacity: usize) -> (Arc<MemoryStore>, EnhancedDataStore) {
        let backend = Arc::new(MemoryStore::new());
        let config = DataStoreConfig::default().with_cache_capacity(capacity);
        let store = EnhancedDataStore::with_config(backend.clone(), &config);
        (backend, store)
    }

    /// Backend whose every call fails.
    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, _key: &str) -> BackendResult<Option<Value>> {
            Err(BackendError::Unavailable("offline".into()))
        }
        async fn put(&self, _key: &str, _value: Value) -> BackendResult<()> {
            Err(BackendError::Unavailable("offline".into()))
        }
        async fn remove(&self, _key: &str) -> BackendResult<()> {
            Err(BackendError::Unavailable("offline".into()))
        }
        async fn clear(&self) -> BackendResult<()> {
            Err(BackendError::Unavailable("offline".into()))
        }
        async fn keys(&self) -> BackendResult<BTreeSet<String>> {
            Err(BackendError::Unavailable("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_round_trip_every_primitive() {
        let (_, store) = store_with(16);

        store.put_value("int", -12i32).await.unwrap();
        store.put_value("long", 1i64 << 40).await.unwrap();
        store.put_value("float", 1.25f32).await.unwrap();
        store.put_value("double", -0.125f64).await.unwrap();
        store.put_value("string", "dark".to_string()).await.unwrap();
        store.put_value("bool", true).await.unwrap();

        assert_eq!(store.get_value("int", 0i32).await.unwrap(), -12);
        assert_eq!(store.get_value("long", 0i64).await.unwrap(), 1i64 << 40);
        assert_eq!(store.get_value("float", 0f32).await.unwrap(), 1.25);
        assert_eq!(store.get_value("double", 0f64).await.unwrap(), -0.125);
        assert_eq!(store.get_value("string", String::new()).await.unwrap(), "dark");
        assert!(store.get_value("bool", false).await.unwrap());
    }

    #[tokio::test]
    async fn test_round_trip_bypassing_cache() {
        let (_, store) = store_with(0);

        store.put_value("count", 5i32).await.unwrap();
        assert_eq!(store.get_cache_size().await, 0);
        assert_eq!(store.get_value("count", 0i32).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_missing_key_returns_default() {
        let (_, store) = store_with(16);

        let result = store.get_value("never_written", 17i32).await;
        assert_eq!(result.unwrap(), 17);
        assert!(!store.is_cached("never_written").await);
    }

    #[tokio::test]
    async fn test_cache_invalidation_leaves_backend() {
        let (_, store) = store_with(16);

        store.put_value("k", 1i32).await.unwrap();
        assert!(store.is_cached("k").await);
        assert_eq!(store.get_cache_size().await, 1);

        store.invalidate_cache("k").await;
        assert!(!store.is_cached("k").await);
        assert!(store.has_key("k").await.unwrap());
        assert_eq!(store.get_value("k", 0i32).await.unwrap(), 1);
        assert!(store.is_cached("k").await);

        store.invalidate_all_cache().await;
        assert_eq!(store.get_cache_size().await, 0);
        assert_eq!(store.get_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cache_evicts_least_recently_used() {
        let (_, store) = store_with(2);

        store.put_value("k1", 1i32).await.unwrap();
        store.put_value("k2", 2i32).await.unwrap();
        store.put_value("k3", 3i32).await.unwrap();

        assert!(!store.is_cached("k1").await);
        assert!(store.is_cached("k2").await);
        assert!(store.is_cached("k3").await);
        assert_eq!(store.get_cache_size().await, 2);

        // Evicted entries are still readable from the backend.
        assert_eq!(store.get_value("k1", 0i32).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_served_without_backend() {
        let (backend, store) = store_with(4);

        store.put_value("k", 1i32).await.unwrap();
        backend.put("k", Value::Int(99)).await.unwrap();

        assert_eq!(store.get_value("k", 0i32).await.unwrap(), 1);
        assert_eq!(store.cache_stats().await.hits, 1);

        store.invalidate_cache("k").await;
        assert_eq!(store.get_value("k", 0i32).await.unwrap(), 99);
    }

    #[tokio::test]
    async fn test_blank_key_rejected_before_store() {
        let (backend, store) = store_with(4);

        let err = store.put_value("  ", 1i32).await.unwrap_err();
        assert!(err.is_validation());
        assert!(backend.is_empty());

        let err = store.get_value("", 0i32).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.get_cache_size().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_value_rejected() {
        let (backend, store) = store_with(4);

        let err = store.put_value("ratio", f64::NAN).await.unwrap_err();
        assert!(err.is_validation());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_put_any_dispatches_by_runtime_type() {
        let (_, store) = store_with(4);

        store.put_any("count", Some(&5i32)).await.unwrap();
        assert_eq!(store.get_value("count", 0i32).await.unwrap(), 5);

        let err = store.put_any("bytes", Some(&vec![1u8])).await.unwrap_err();
        assert!(matches!(err, DataStoreError::UnsupportedType(ref t) if t.contains("Vec")));

        let err = store.put_any::<i32>("nothing", None).await.unwrap_err();
        assert!(err.is_validation());
        assert!(!store.has_key("nothing").await.unwrap());
    }

    #[tokio::test]
    async fn test_serializable_round_trip() {
        let (_, store) = store_with(4);
        let user = UserData {
            name: "Ada".into(),
            followed_topics: vec!["compose".into(), "kotlin".into()],
        };

        store.put_serializable_value("user", &user).await.unwrap();
        let loaded = store
            .get_serializable_value("user", UserData {
                name: String::new(),
                followed_topics: vec![],
            })
            .await
            .unwrap();
        assert_eq!(loaded, user);
    }

    #[tokio::test]
    async fn test_corrupted_serializable_returns_default() {
        let (backend, store) = store_with(4);
        let user = UserData {
            name: "Ada".into(),
            followed_topics: vec![],
        };
        let fallback = UserData {
            name: "guest".into(),
            followed_topics: vec![],
        };

        store.put_serializable_value("user", &user).await.unwrap();
        backend
            .put("user", Value::String("{\"name\": 12".into()))
            .await
            .unwrap();
        store.invalidate_cache("user").await;

        let loaded = store
            .get_serializable_value("user", fallback.clone())
            .await
            .unwrap();
        assert_eq!(loaded, fallback);
    }

    #[tokio::test]
    async fn test_serializable_read_of_primitive_returns_default() {
        let (_, store) = store_with(4);
        store.put_value("count", 3i32).await.unwrap();

        let loaded: Vec<String> = store
            .get_serializable_value("count", vec!["x".to_string()])
            .await
            .unwrap();
        assert_eq!(loaded, vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (_, store) = store_with(4);

        store.put_value("count", 5i32).await.unwrap();
        assert_eq!(store.get_value("count", 0i32).await.unwrap(), 5);

        store.remove_value("count").await.unwrap();
        assert_eq!(store.get_value("count", 0i32).await.unwrap(), 0);
        assert!(!store.get_all_keys().await.unwrap().contains("count"));

        store.put_value("a", true).await.unwrap();
        store.put_value("b", false).await.unwrap();
        assert_eq!(store.get_size().await.unwrap(), 2);

        store.clear_all().await.unwrap();
        assert_eq!(store.get_size().await.unwrap(), 0);
        assert_eq!(store.get_cache_size().await, 0);
    }

    #[tokio::test]
    async fn test_backend_failure_is_wrapped() {
        let store = EnhancedDataStore::new(Arc::new(FailingStore));

        let err = store.put_value("k", 1i32).await.unwrap_err();
        assert!(matches!(
            err,
            DataStoreError::StoreOperationFailed { operation: "put", .. }
        ));
        assert!(err.is_retryable());
        assert_eq!(store.get_cache_size().await, 0);

        let err = store.get_value("k", 0i32).await.unwrap_err();
        assert!(err.is_store_failure());
        assert!(store.clear_all().await.unwrap_err().is_store_failure());
        assert!(store.get_all_keys().await.unwrap_err().is_store_failure());
    }

    #[tokio::test]
    async fn test_session_groups_operations() {
        let (_, store) = store_with(4);

        let mut session = store.session().await;
        session.put_value("a", 1i32).await.unwrap();
        let previous = session.peek("a").await.unwrap();
        session.put_value("a", 2i32).await.unwrap();
        drop(session);

        assert_eq!(previous, Some(Value::Int(1)));
        assert_eq!(store.get_value("a", 0i32).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_writers_are_serialized() {
        let (_, store) = store_with(64);
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..32i32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.put_value(&format!("key{i}"), i).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.get_size().await.unwrap(), 32);
        assert_eq!(store.get_cache_size().await, 32);
        assert_eq!(store.get_value("key7", 0i32).await.unwrap(), 7);
    }
}
