//! Domain-facing preference repositories.
//!
//! UI and domain code depend on [`UserPreferencesRepository`] and
//! [`ReactiveUserPreferencesRepository`] only; the cache, validator and
//! change notifier stay hidden behind them. Failures come back as `Err` and
//! are meant to be treated as "nothing changed".

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::enhanced::EnhancedDataStore;
use crate::error::Result;
use crate::handler::PrimitiveType;
use crate::reactive::ReactiveDataStore;
use crate::serialization::{JsonSerialization, SerializationStrategy};
use crate::watch::{DataStoreChange, ValueStream};

/// Request/response access to user preferences.
#[async_trait]
pub trait UserPreferencesRepository: Send + Sync {
    async fn save_preference<T: PrimitiveType>(&self, key: &str, value: T) -> Result<()>;

    async fn get_preference<T: PrimitiveType>(&self, key: &str, default: T) -> Result<T>;

    async fn save_serializable_preference<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync;

    async fn get_serializable_preference<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned + Send;

    async fn remove_preference(&self, key: &str) -> Result<()>;

    async fn has_preference(&self, key: &str) -> Result<bool>;

    async fn get_all_keys(&self) -> Result<BTreeSet<String>>;

    async fn clear_all_preferences(&self) -> Result<()>;
}

/// Observable access to user preferences.
pub trait ReactiveUserPreferencesRepository: UserPreferencesRepository {
    fn observe_preference<T: PrimitiveType>(&self, key: &str, default: T) -> ValueStream<T>;

    fn observe_serializable_preference<T>(&self, key: &str, default: T) -> ValueStream<T>
    where
        T: DeserializeOwned + Clone + PartialEq + Send + Sync + 'static;

    fn observe_all_keys(&self) -> ValueStream<BTreeSet<String>>;

    fn observe_preference_count(&self) -> ValueStream<usize>;

    fn observe_preference_changes(&self) -> ValueStream<DataStoreChange>;
}

/// Repository over a non-reactive [`EnhancedDataStore`].
pub struct PreferencesRepository<S = JsonSerialization> {
    store: Arc<EnhancedDataStore<S>>,
}

impl<S: SerializationStrategy> PreferencesRepository<S> {
    pub fn new(store: Arc<EnhancedDataStore<S>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: SerializationStrategy> UserPreferencesRepository for PreferencesRepository<S> {
    async fn save_preference<T: PrimitiveType>(&self, key: &str, value: T) -> Result<()> {
        self.store.put_value(key, value).await
    }

    async fn get_preference<T: PrimitiveType>(&self, key: &str, default: T) -> Result<T> {
        self.store.get_value(key, default).await
    }

    async fn save_serializable_preference<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        self.store.put_serializable_value(key, value).await
    }

    async fn get_serializable_preference<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        self.store.get_serializable_value(key, default).await
    }

    async fn remove_preference(&self, key: &str) -> Result<()> {
        self.store.remove_value(key).await
    }

    async fn has_preference(&self, key: &str) -> Result<bool> {
        self.store.has_key(key).await
    }

    async fn get_all_keys(&self) -> Result<BTreeSet<String>> {
        self.store.get_all_keys().await
    }

    async fn clear_all_preferences(&self) -> Result<()> {
        self.store.clear_all().await
    }
}

/// Repository over a [`ReactiveDataStore`].
pub struct ReactivePreferencesRepository<S = JsonSerialization> {
    store: Arc<ReactiveDataStore<S>>,
}

impl<S: SerializationStrategy> ReactivePreferencesRepository<S> {
    pub fn new(store: Arc<ReactiveDataStore<S>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: SerializationStrategy> UserPreferencesRepository for ReactivePreferencesRepository<S> {
    async fn save_preference<T: PrimitiveType>(&self, key: &str, value: T) -> Result<()> {
        self.store.put_value(key, value).await
    }

    async fn get_preference<T: PrimitiveType>(&self, key: &str, default: T) -> Result<T> {
        self.store.get_value(key, default).await
    }

    async fn save_serializable_preference<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        self.store.put_serializable_value(key, value).await
    }

    async fn get_serializable_preference<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        self.store.get_serializable_value(key, default).await
    }

    async fn remove_preference(&self, key: &str) -> Result<()> {
        self.store.remove_value(key).await
    }

    async fn has_preference(&self, key: &str) -> Result<bool> {
        self.store.has_key(key).await
    }

    async fn get_all_keys(&self) -> Result<BTreeSet<String>> {
        self.store.get_all_keys().await
    }

    async fn clear_all_preferences(&self) -> Result<()> {
        self.store.clear_all().await
    }
}

impl<S: SerializationStrategy> ReactiveUserPreferencesRepository
    for ReactivePreferencesRepository<S>
{
    fn observe_preference<T: PrimitiveType>(&self, key: &str, default: T) -> ValueStream<T> {
        self.store.observe_value(key, default)
    }

    fn observe_serializable_preference<T>(&self, key: &str, default: T) -> ValueStream<T>
    where
        T: DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
    {
        self.store.observe_serializable_value(key, default)
    }

    fn observe_all_keys(&self) -> ValueStream<BTreeSet<String>> {
        self.store.observe_keys()
    }

    fn observe_preference_count(&self) -> ValueStream<usize> {
        self.store.observe_size()
    }

    fn observe_preference_changes(&self) -> ValueStream<DataStoreChange> {
        Box::pin(self.store.observe_changes())
    }
}
