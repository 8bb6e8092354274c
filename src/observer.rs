//! Deduplicated value observation.
//!
//! An observed value has no identity of its own: it is recomputed from a
//! fetch callback every time the change broadcast fires, and only emitted
//! when it differs from the previous emission. Every change, whichever key
//! it concerns, triggers a refetch in every live observer.

use std::future::Future;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::error::Result;
use crate::watch::{ChangeNotifier, ValueStream};

/// Builds observable value streams on top of a [`ChangeNotifier`].
#[derive(Clone)]
pub struct ValueObserver {
    notifier: ChangeNotifier,
}

impl ValueObserver {
    pub fn new(notifier: ChangeNotifier) -> Self {
        Self { notifier }
    }

    /// Observe the value produced by `fetch`.
    ///
    /// The first element is the current value, or `default` if the fetch
    /// fails. After that, each change event triggers a refetch, and the
    /// result is emitted only if it differs from the last emitted value. A
    /// failed refetch yields `default` instead of ending the stream.
    ///
    /// The change subscription is opened here, so no change committed after
    /// this call is missed, even before the stream is first polled.
    pub fn create_distinct_value_flow<T, F, Fut>(
        &self,
        key: impl Into<String>,
        default: T,
        fetch: F,
    ) -> ValueStream<T>
    where
        T: Clone + PartialEq + Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let key = key.into();
        let mut changes = self.notifier.subscribe();

        Box::pin(async_stream::stream! {
            let first = fetch().await;
            let mut last = or_default(&key, first, &default);
            yield last.clone();

            loop {
                match changes.recv().await {
                    Ok(_) => {}
                    // Missed events still mean something changed.
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(key = %key, skipped, "value observer lagged behind changes");
                    }
                    Err(RecvError::Closed) => break,
                }

                let fetched = fetch().await;
                let next = or_default(&key, fetched, &default);
                if next != last {
                    last = next.clone();
                    yield next;
                }
            }
        })
    }
}

fn or_default<T: Clone>(key: &str, fetched: Result<T>, default: &T) -> T {
    match fetched {
        Ok(value) => value,
        Err(err) => {
            warn!(key, error = %err, "observed fetch failed, emitting default");
            default.clone()
        }
    }
}
