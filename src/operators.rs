//! Combinators over preference streams.
//!
//! Built only on the public observation API of
//! [`ReactiveUserPreferencesRepository`], so they work with any
//! implementation of it.

use tokio_stream::StreamExt;

use crate::handler::PrimitiveType;
use crate::repository::ReactiveUserPreferencesRepository;
use crate::watch::{DataStoreChange, ValueStream};

enum Latest<A, B, C> {
    First(A),
    Second(B),
    Third(C),
}

/// Combine the latest values of two streams.
///
/// Emits once both streams have produced a value, then again whenever either
/// one emits.
pub fn combine_latest<A, B, R, F>(a: ValueStream<A>, b: ValueStream<B>, transform: F) -> ValueStream<R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(A, B) -> R + Send + 'static,
{
    let mut merged = a
        .map(Latest::<A, B, ()>::First)
        .merge(b.map(Latest::Second));

    Box::pin(async_stream::stream! {
        let (mut latest_a, mut latest_b) = (None, None);
        while let Some(item) = merged.next().await {
            match item {
                Latest::First(v) => latest_a = Some(v),
                Latest::Second(v) => latest_b = Some(v),
                Latest::Third(()) => {}
            }
            let combined = match (&latest_a, &latest_b) {
                (Some(a), Some(b)) => Some(transform(a.clone(), b.clone())),
                _ => None,
            };
            if let Some(combined) = combined {
                yield combined;
            }
        }
    })
}

/// Combine the latest values of three streams.
pub fn combine_latest3<A, B, C, R, F>(
    a: ValueStream<A>,
    b: ValueStream<B>,
    c: ValueStream<C>,
    transform: F,
) -> ValueStream<R>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(A, B, C) -> R + Send + 'static,
{
    let mut merged = a
        .map(Latest::First)
        .merge(b.map(Latest::Second))
        .merge(c.map(Latest::Third));

    Box::pin(async_stream::stream! {
        let (mut latest_a, mut latest_b, mut latest_c) = (None, None, None);
        while let Some(item) = merged.next().await {
            match item {
                Latest::First(v) => latest_a = Some(v),
                Latest::Second(v) => latest_b = Some(v),
                Latest::Third(v) => latest_c = Some(v),
            }
            let combined = match (&latest_a, &latest_b, &latest_c) {
                (Some(a), Some(b), Some(c)) => Some(transform(a.clone(), b.clone(), c.clone())),
                _ => None,
            };
            if let Some(combined) = combined {
                yield combined;
            }
        }
    })
}

/// Stream combinators available on every reactive preferences repository.
pub trait PreferenceFlowOperators: ReactiveUserPreferencesRepository {
    /// Observe two preferences and merge them with `transform`.
    fn combine_preferences<A, B, R, F>(
        &self,
        key_a: &str,
        default_a: A,
        key_b: &str,
        default_b: B,
        transform: F,
    ) -> ValueStream<R>
    where
        A: PrimitiveType,
        B: PrimitiveType,
        R: Send + 'static,
        F: Fn(A, B) -> R + Send + 'static,
    {
        combine_latest(
            self.observe_preference(key_a, default_a),
            self.observe_preference(key_b, default_b),
            transform,
        )
    }

    /// Observe three preferences and merge them with `transform`.
    #[allow(clippy::too_many_arguments)]
    fn combine_three_preferences<A, B, C, R, F>(
        &self,
        key_a: &str,
        default_a: A,
        key_b: &str,
        default_b: B,
        key_c: &str,
        default_c: C,
        transform: F,
    ) -> ValueStream<R>
    where
        A: PrimitiveType,
        B: PrimitiveType,
        C: PrimitiveType,
        R: Send + 'static,
        F: Fn(A, B, C) -> R + Send + 'static,
    {
        combine_latest3(
            self.observe_preference(key_a, default_a),
            self.observe_preference(key_b, default_b),
            self.observe_preference(key_c, default_c),
            transform,
        )
    }

    /// Changes touching any of `keys`. `StoreCleared` touches every key and
    /// always passes.
    fn observe_any_key_change(&self, keys: &[&str]) -> ValueStream<DataStoreChange> {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        Box::pin(
            self.observe_preference_changes()
                .filter(move |change| keys.iter().any(|k| change.affects(k))),
        )
    }

    /// [`observe_preference`](ReactiveUserPreferencesRepository::observe_preference)
    /// followed by `transform`.
    fn observe_mapped_preference<T, R, F>(&self, key: &str, default: T, transform: F) -> ValueStream<R>
    where
        T: PrimitiveType,
        R: Send + 'static,
        F: FnMut(T) -> R + Send + 'static,
    {
        Box::pin(self.observe_preference(key, default).map(transform))
    }
}

impl<P: ReactiveUserPreferencesRepository> PreferenceFlowOperators for P {}
