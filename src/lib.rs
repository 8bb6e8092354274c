//! # prefstore
//!
//! Reactive, cached key-value store for user preferences.
//!
//! The store is built in layers over any [`KeyValueStore`] backend:
//!
//! - **Typed values**: the primitive kinds ([`Value`]) plus structured
//!   values encoded by a [`SerializationStrategy`]
//! - **Validation**: keys and values are checked before the store is touched
//! - **LRU cache**: a bounded shadow of recently used values
//! - **Serialized access**: one operation at a time, in FIFO order
//! - **Change streams**: every committed mutation is broadcast, and values,
//!   key sets and sizes can be observed as deduplicated streams
//!
//! ## Backends
//!
//! - [`SqliteStore`]: Embedded SQLite database
//! - [`MemoryStore`]: In-memory store (testing and previews)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use prefstore::{EnhancedDataStore, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> prefstore::Result<()> {
//!     let store = EnhancedDataStore::new(Arc::new(MemoryStore::new()));
//!
//!     store.put_value("count", 5i32).await?;
//!     assert_eq!(store.get_value("count", 0i32).await?, 5);
//!
//!     // Missing keys yield the default.
//!     assert!(!store.get_value("dark_mode", false).await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Observing Preferences
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use prefstore::prelude::*;
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> prefstore::Result<()> {
//!     let store = ReactiveDataStore::new(Arc::new(MemoryStore::new()));
//!     let repo = ReactivePreferencesRepository::new(Arc::new(store));
//!
//!     let mut label = repo.combine_preferences("a", "x".to_string(), "b", "y".to_string(), |a, b| {
//!         format!("{a}-{b}")
//!     });
//!     assert_eq!(label.next().await.as_deref(), Some("x-y"));
//!
//!     repo.save_preference("a", "z".to_string()).await?;
//!     assert_eq!(label.next().await.as_deref(), Some("z-y"));
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod enhanced;
pub mod error;
pub mod handler;
pub mod memory;
pub mod observer;
pub mod operators;
pub mod reactive;
pub mod repository;
pub mod serialization;
pub mod sqlite;
pub mod store;
pub mod validator;
pub mod value;
pub mod watch;

// Re-export main types
pub use cache::{CacheManager, CacheStats};
pub use config::DataStoreConfig;
pub use enhanced::{EnhancedDataStore, StoreSession};
pub use error::{BackendError, DataStoreError, Result};
pub use handler::PrimitiveType;
pub use memory::MemoryStore;
pub use observer::ValueObserver;
pub use operators::PreferenceFlowOperators;
pub use reactive::ReactiveDataStore;
pub use repository::{
    PreferencesRepository, ReactivePreferencesRepository, ReactiveUserPreferencesRepository,
    UserPreferencesRepository,
};
pub use serialization::{JsonSerialization, SerializationStrategy};
pub use sqlite::SqliteStore;
pub use store::KeyValueStore;
pub use validator::DataStoreValidator;
pub use value::{Value, ValueKind};
pub use watch::{ChangeNotifier, ChangeStream, DataStoreChange, ValueStream};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::DataStoreConfig;
    pub use crate::enhanced::EnhancedDataStore;
    pub use crate::error::{DataStoreError, Result};
    pub use crate::handler::PrimitiveType;
    pub use crate::memory::MemoryStore;
    pub use crate::operators::PreferenceFlowOperators;
    pub use crate::reactive::ReactiveDataStore;
    pub use crate::repository::{
        ReactivePreferencesRepository, ReactiveUserPreferencesRepository,
        UserPreferencesRepository,
    };
    pub use crate::sqlite::SqliteStore;
    pub use crate::store::KeyValueStore;
    pub use crate::value::Value;
    pub use crate::watch::{DataStoreChange, ValueStream};
}
