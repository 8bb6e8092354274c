//! Reactive data store.
//!
//! Wraps an [`EnhancedDataStore`] so that every committed mutation publishes
//! a [`DataStoreChange`], and exposes values, key sets and size as
//! deduplicated streams.
//!
//! A mutation classifies, commits and publishes within one store session,
//! so changes reach subscribers in exactly the order they were committed.

use serde::{de::DeserializeOwned, Serialize};
use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

use crate::config::DataStoreConfig;
use crate::enhanced::{EnhancedDataStore, StoreSession};
use crate::error::Result;
use crate::handler::PrimitiveType;
use crate::observer::ValueObserver;
use crate::serialization::{JsonSerialization, SerializationStrategy};
use crate::store::KeyValueStore;
use crate::value::Value;
use crate::watch::{ChangeNotifier, ChangeStream, DataStoreChange, ValueStream};

/// Observable typed data store.
pub struct ReactiveDataStore<S = JsonSerialization> {
    store: Arc<EnhancedDataStore<S>>,
    notifier: ChangeNotifier,
    observer: ValueObserver,
}

impl ReactiveDataStore<JsonSerialization> {
    /// Create a store with the default configuration.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_config(backend, &DataStoreConfig::default())
    }

    /// Create a store with the given configuration.
    pub fn with_config(backend: Arc<dyn KeyValueStore>, config: &DataStoreConfig) -> Self {
        Self::from_parts(
            Arc::new(EnhancedDataStore::with_config(backend, config)),
            ChangeNotifier::new(config.change_buffer),
        )
    }
}

impl<S: SerializationStrategy> ReactiveDataStore<S> {
    /// Assemble from an existing store and notifier.
    ///
    /// Mutations made directly on `store` bypass change publication.
    pub fn from_parts(store: Arc<EnhancedDataStore<S>>, notifier: ChangeNotifier) -> Self {
        let observer = ValueObserver::new(notifier.clone());
        Self {
            store,
            notifier,
            observer,
        }
    }

    /// The non-reactive store underneath.
    pub fn enhanced(&self) -> &Arc<EnhancedDataStore<S>> {
        &self.store
    }

    /// The notifier every mutation publishes to.
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Write a primitive value and publish the change.
    pub async fn put_value<T: PrimitiveType>(&self, key: &str, value: T) -> Result<()> {
        let mut session = self.store.session().await;
        self.commit_write(&mut session, key, value.into_value()).await
    }

    /// Write a value whose type is only known at runtime and publish the
    /// change; see [`StoreSession::put_any`].
    pub async fn put_any<V: Any>(&self, key: &str, value: Option<&V>) -> Result<()> {
        let mut session = self.store.session().await;
        let value = session.value_of_any(key, value)?;
        self.commit_write(&mut session, key, value).await
    }

    /// Encode and write a structured value, then publish the change.
    pub async fn put_serializable_value<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let mut session = self.store.session().await;
        session.validate_key(key)?;
        let encoded = session.encode(key, value)?;
        self.commit_write(&mut session, key, encoded).await
    }

    /// Remove a key. Removing an absent key succeeds and publishes nothing.
    pub async fn remove_value(&self, key: &str) -> Result<()> {
        let mut session = self.store.session().await;
        session.validate_key(key)?;
        let previous = prior_value(&mut session, key).await;
        session.remove_value(key).await?;
        if let Some(old) = previous {
            self.notifier
                .notify_change(DataStoreChange::removed(key, old));
        }
        Ok(())
    }

    /// Remove every key and publish `StoreCleared`.
    pub async fn clear_all(&self) -> Result<()> {
        let mut session = self.store.session().await;
        session.clear_all().await?;
        self.notifier.notify_change(DataStoreChange::StoreCleared);
        Ok(())
    }

    async fn commit_write(
        &self,
        session: &mut StoreSession<'_, S>,
        key: &str,
        value: Value,
    ) -> Result<()> {
        // Validate before the prior read: a rejected write leaves the cache as is.
        session.validate_write(key, &value)?;
        let previous = prior_value(session, key).await;
        session.put_raw(key, value.clone()).await?;
        self.notifier
            .notify_change(DataStoreChange::for_write(key, previous, value));
        Ok(())
    }

    /// Read a primitive value, or `default` if the key is absent.
    pub async fn get_value<T: PrimitiveType>(&self, key: &str, default: T) -> Result<T> {
        self.store.get_value(key, default).await
    }

    /// Read a structured value, or `default` if it is absent or undecodable.
    pub async fn get_serializable_value<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        self.store.get_serializable_value(key, default).await
    }

    /// Whether the backend holds `key`.
    pub async fn has_key(&self, key: &str) -> Result<bool> {
        self.store.has_key(key).await
    }

    /// Every stored key.
    pub async fn get_all_keys(&self) -> Result<BTreeSet<String>> {
        self.store.get_all_keys().await
    }

    /// Number of stored keys.
    pub async fn get_size(&self) -> Result<usize> {
        self.store.get_size().await
    }

    /// Observe a primitive value, starting with its current value.
    pub fn observe_value<T: PrimitiveType>(&self, key: &str, default: T) -> ValueStream<T> {
        let store = Arc::clone(&self.store);
        let fetch_key = key.to_string();
        let fetch_default = default.clone();
        self.observer
            .create_distinct_value_flow(key, default, move || {
                let store = Arc::clone(&store);
                let key = fetch_key.clone();
                let default = fetch_default.clone();
                async move { store.get_value(&key, default).await }
            })
    }

    /// Observe a structured value, starting with its current value.
    pub fn observe_serializable_value<T>(&self, key: &str, default: T) -> ValueStream<T>
    where
        T: DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
    {
        let store = Arc::clone(&self.store);
        let fetch_key = key.to_string();
        let fetch_default = default.clone();
        self.observer
            .create_distinct_value_flow(key, default, move || {
                let store = Arc::clone(&store);
                let key = fetch_key.clone();
                let default = fetch_default.clone();
                async move { store.get_serializable_value(&key, default).await }
            })
    }

    /// Observe the set of stored keys; re-emits only when the set changes.
    pub fn observe_keys(&self) -> ValueStream<BTreeSet<String>> {
        let store = Arc::clone(&self.store);
        self.observer
            .create_distinct_value_flow("*keys", BTreeSet::new(), move || {
                let store = Arc::clone(&store);
                async move { store.get_all_keys().await }
            })
    }

    /// Observe the number of stored keys; re-emits only when it changes.
    pub fn observe_size(&self) -> ValueStream<usize> {
        let store = Arc::clone(&self.store);
        self.observer
            .create_distinct_value_flow("*size", 0, move || {
                let store = Arc::clone(&store);
                async move { store.get_size().await }
            })
    }

    /// Subscribe to raw change events.
    pub fn observe_changes(&self) -> ChangeStream {
        self.notifier.observe_changes()
    }
}

/// Prior value of `key`, for classifying a mutation.
///
/// An unreadable prior value (a corrupted row, a failing read) is treated as
/// absent so the mutation itself can still go through.
async fn prior_value<S: SerializationStrategy>(
    session: &mut StoreSession<'_, S>,
    key: &str,
) -> Option<Value> {
    match session.peek(key).await {
        Ok(previous) => previous,
        Err(err) => {
            warn!(key, error = %err, "prior value unreadable, treating it as absent");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataStoreError;
    use crate::memory::MemoryStore;
    use serde::Deserialize;
    use std::time::Duration;
    use tokio_stream::{Stream, StreamExt};

    fn reactive() -> ReactiveDataStore {
        ReactiveDataStore::new(Arc::new(MemoryStore::new()))
    }

    async fn next_within<S: Stream + Unpin>(stream: &mut S) -> Option<S::Item> {
        tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out waiting for emission")
    }

    async fn assert_silent<S>(stream: &mut S)
    where
        S: Stream + Unpin,
        S::Item: std::fmt::Debug,
    {
        let next = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
        assert!(next.is_err(), "unexpected emission: {next:?}");
    }

    #[tokio::test]
    async fn test_change_classification() {
        let store = reactive();
        let mut changes = store.observe_changes();

        store.put_value("theme", "light".to_string()).await.unwrap();
        store.put_value("theme", "dark".to_string()).await.unwrap();
        store.remove_value("theme").await.unwrap();
        store.clear_all().await.unwrap();

        assert_eq!(
            next_within(&mut changes).await,
            Some(DataStoreChange::added("theme", Value::String("light".into())))
        );
        assert_eq!(
            next_within(&mut changes).await,
            Some(DataStoreChange::updated(
                "theme",
                Value::String("light".into()),
                Value::String("dark".into())
            ))
        );
        assert_eq!(
            next_within(&mut changes).await,
            Some(DataStoreChange::removed("theme", Value::String("dark".into())))
        );
        assert_eq!(
            next_within(&mut changes).await,
            Some(DataStoreChange::StoreCleared)
        );
    }

    #[tokio::test]
    async fn test_remove_absent_key_publishes_nothing() {
        let store = reactive();
        let mut changes = store.observe_changes();

        store.remove_value("ghost").await.unwrap();
        assert_silent(&mut changes).await;
    }

    #[tokio::test]
    async fn test_failed_mutation_publishes_nothing() {
        let store = reactive();
        let mut changes = store.observe_changes();

        assert!(store.put_value("", 1i32).await.unwrap_err().is_validation());
        assert!(store.put_value("ratio", f32::NAN).await.is_err());
        assert_silent(&mut changes).await;
    }

    #[tokio::test]
    async fn test_rejected_write_leaves_cache_untouched() {
        let backend = Arc::new(MemoryStore::with_entries([(
            "ratio".to_string(),
            Value::Float(0.5),
        )]));
        let config = DataStoreConfig::default().with_max_value_length(8);
        let store = ReactiveDataStore::with_config(backend, &config);
        let stats = store.enhanced().cache_stats().await;

        let err = store.put_value("ratio", f32::NAN).await.unwrap_err();
        assert!(err.is_validation());
        let err = store
            .put_serializable_value("ratio", &"far too long for the limit")
            .await
            .unwrap_err();
        assert!(err.is_validation());

        assert!(!store.enhanced().is_cached("ratio").await);
        assert_eq!(store.enhanced().cache_stats().await, stats);
        assert_eq!(store.get_value("ratio", 0f32).await.unwrap(), 0.5);
    }

    #[tokio::test]
    async fn test_put_any_publishes_change() {
        let store = reactive();
        let mut changes = store.observe_changes();

        store.put_any("count", Some(&3i32)).await.unwrap();
        store.put_any("count", Some(&4i32)).await.unwrap();
        let err = store.put_any("bytes", Some(&vec![1u8])).await.unwrap_err();
        assert!(matches!(err, DataStoreError::UnsupportedType(_)));
        assert!(store.put_any::<i32>("count", None).await.unwrap_err().is_validation());

        assert_eq!(
            next_within(&mut changes).await,
            Some(DataStoreChange::added("count", Value::Int(3)))
        );
        assert_eq!(
            next_within(&mut changes).await,
            Some(DataStoreChange::updated("count", Value::Int(3), Value::Int(4)))
        );
        assert_silent(&mut changes).await;
    }

    #[tokio::test]
    async fn test_observe_value_replays_and_dedups() {
        let store = reactive();
        store.put_value("count", 1i32).await.unwrap();

        let mut values = store.observe_value("count", 0i32);
        assert_eq!(next_within(&mut values).await, Some(1));

        store.put_value("count", 1i32).await.unwrap();
        assert_silent(&mut values).await;

        store.put_value("count", 2i32).await.unwrap();
        assert_eq!(next_within(&mut values).await, Some(2));
        assert_silent(&mut values).await;
    }

    #[tokio::test]
    async fn test_observe_value_defaults_and_tracks_removal() {
        let store = reactive();

        let mut values = store.observe_value("dark_mode", false);
        assert_eq!(next_within(&mut values).await, Some(false));

        store.put_value("dark_mode", true).await.unwrap();
        assert_eq!(next_within(&mut values).await, Some(true));

        store.remove_value("dark_mode").await.unwrap();
        assert_eq!(next_within(&mut values).await, Some(false));
    }

    #[tokio::test]
    async fn test_observe_serializable_value() {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct Layout {
            columns: u8,
        }

        let store = reactive();
        let mut layouts = store.observe_serializable_value("layout", Layout { columns: 1 });
        assert_eq!(next_within(&mut layouts).await, Some(Layout { columns: 1 }));

        store
            .put_serializable_value("layout", &Layout { columns: 3 })
            .await
            .unwrap();
        assert_eq!(next_within(&mut layouts).await, Some(Layout { columns: 3 }));
    }

    #[tokio::test]
    async fn test_observe_keys_emits_on_set_change_only() {
        let store = reactive();
        let mut keys = store.observe_keys();
        assert_eq!(next_within(&mut keys).await, Some(BTreeSet::new()));

        store.put_value("a", 1i32).await.unwrap();
        assert_eq!(
            next_within(&mut keys).await,
            Some(BTreeSet::from(["a".to_string()]))
        );

        // Overwriting leaves the key set unchanged.
        store.put_value("a", 2i32).await.unwrap();
        assert_silent(&mut keys).await;

        store.clear_all().await.unwrap();
        assert_eq!(next_within(&mut keys).await, Some(BTreeSet::new()));
    }

    #[tokio::test]
    async fn test_observe_size() {
        let store = reactive();
        let mut size = store.observe_size();
        assert_eq!(next_within(&mut size).await, Some(0));

        store.put_value("a", 1i64).await.unwrap();
        assert_eq!(next_within(&mut size).await, Some(1));
        store.put_value("b", 1i64).await.unwrap();
        assert_eq!(next_within(&mut size).await, Some(2));
    }

    #[tokio::test]
    async fn test_multiple_observers_see_same_order() {
        let store = Arc::new(reactive());
        let mut first = store.observe_changes();
        let mut second = store.observe_changes();

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..10i32 {
                    store.put_value(&format!("k{}", i % 3), i).await.unwrap();
                }
            })
        };
        writer.await.unwrap();

        let mut seen_first = Vec::new();
        let mut seen_second = Vec::new();
        for _ in 0..10 {
            seen_first.push(next_within(&mut first).await.unwrap());
            seen_second.push(next_within(&mut second).await.unwrap());
        }
        assert_eq!(seen_first, seen_second);
        assert_eq!(
            seen_first[3],
            DataStoreChange::updated("k0", Value::Int(0), Value::Int(3))
        );
    }

    #[tokio::test]
    async fn test_end_to_end_count() {
        let store = reactive();

        store.put_value("count", 5i32).await.unwrap();
        assert_eq!(store.get_value("count", 0i32).await.unwrap(), 5);

        store.remove_value("count").await.unwrap();
        assert_eq!(store.get_value("count", 0i32).await.unwrap(), 0);
        assert!(!store.get_all_keys().await.unwrap().contains("count"));
        assert!(!store.has_key("count").await.unwrap());
        assert_eq!(store.get_size().await.unwrap(), 0);
    }
}
