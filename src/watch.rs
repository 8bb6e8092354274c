//! Change events and their broadcast to observers.
//!
//! Every committed mutation produces one [`DataStoreChange`], published
//! through a [`ChangeNotifier`]. Each call to
//! [`ChangeNotifier::observe_changes`] opens an independent subscription that
//! sees every event published after it was opened, in publication order.
//! Past events are not replayed.

use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;

use crate::config::DEFAULT_CHANGE_BUFFER;
use crate::value::Value;

/// A boxed, sendable stream of observed values.
pub type ValueStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// One committed mutation of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataStoreChange {
    /// Key was written and did not exist before.
    ValueAdded { key: String, value: Value },
    /// Key existed and was overwritten.
    ValueUpdated { key: String, old: Value, new: Value },
    /// Key was removed.
    ValueRemoved { key: String, old: Value },
    /// Every key was removed.
    StoreCleared,
}

impl DataStoreChange {
    pub fn added(key: impl Into<String>, value: Value) -> Self {
        Self::ValueAdded {
            key: key.into(),
            value,
        }
    }

    pub fn updated(key: impl Into<String>, old: Value, new: Value) -> Self {
        Self::ValueUpdated {
            key: key.into(),
            old,
            new,
        }
    }

    pub fn removed(key: impl Into<String>, old: Value) -> Self {
        Self::ValueRemoved {
            key: key.into(),
            old,
        }
    }

    /// Classify a write by the value the key held before it.
    pub fn for_write(key: impl Into<String>, previous: Option<Value>, new: Value) -> Self {
        match previous {
            Some(old) => Self::updated(key, old, new),
            None => Self::added(key, new),
        }
    }

    /// The key this change concerns; `None` for [`DataStoreChange::StoreCleared`].
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::ValueAdded { key, .. }
            | Self::ValueUpdated { key, .. }
            | Self::ValueRemoved { key, .. } => Some(key),
            Self::StoreCleared => None,
        }
    }

    /// Whether this change may have altered `key`.
    pub fn affects(&self, key: &str) -> bool {
        self.key().map_or(true, |k| k == key)
    }
}

/// A subscription to the change broadcast.
///
/// Subscribers that fall more than the channel buffer behind skip the
/// events they missed.
pub struct ChangeStream {
    inner: BroadcastStream<DataStoreChange>,
}

impl Stream for ChangeStream {
    type Item = DataStoreChange;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(change))) => return Poll::Ready(Some(change)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    tracing::warn!(skipped, "change subscriber lagged");
                    continue;
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Handle for publishing change events to subscribers.
///
/// Cloning yields another handle onto the same broadcast.
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<DataStoreChange>,
}

impl ChangeNotifier {
    /// Create a notifier with the given per-subscriber buffer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a change to all current subscribers.
    pub fn notify_change(&self, change: DataStoreChange) {
        tracing::debug!(?change, subscribers = self.sender.receiver_count(), "publishing change");
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(change);
    }

    /// Open a new subscription.
    pub fn observe_changes(&self) -> ChangeStream {
        ChangeStream {
            inner: BroadcastStream::new(self.sender.subscribe()),
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<DataStoreChange> {
        self.sender.subscribe()
    }

    /// Get the number of current subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_BUFFER)
    }
}
