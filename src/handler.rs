//! Type handlers for the primitive kinds.
//!
//! Each supported Rust type implements [`PrimitiveType`], which maps it onto
//! one [`ValueKind`]. Reads and writes go through [`put`] and [`get`], which
//! perform exactly one call against the backend and wrap any backend failure
//! instead of propagating it as a panic.

use std::any::Any;

use crate::error::{DataStoreError, Result};
use crate::store::KeyValueStore;
use crate::value::{Value, ValueKind};

/// A Rust type stored natively as one primitive kind.
pub trait PrimitiveType: Clone + PartialEq + Send + Sync + 'static {
    /// The kind this type is persisted as.
    const KIND: ValueKind;

    /// Wrap into a stored value.
    fn into_value(self) -> Value;

    /// Unwrap a stored value, returning `None` if it holds another kind.
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! primitive_type {
    ($ty:ty, $kind:ident) => {
        impl PrimitiveType for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn into_value(self) -> Value {
                Value::$kind(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$kind(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

primitive_type!(i32, Int);
primitive_type!(i64, Long);
primitive_type!(f32, Float);
primitive_type!(f64, Double);
primitive_type!(String, String);
primitive_type!(bool, Bool);

/// Returns the kind that can handle a type-erased value, if any.
pub fn can_handle(value: &dyn Any) -> Option<ValueKind> {
    value_of_any(value).map(|v| v.kind())
}

/// Convert a type-erased value into a stored value by its runtime type.
pub fn value_of_any(value: &dyn Any) -> Option<Value> {
    if let Some(v) = value.downcast_ref::<i32>() {
        Some(Value::Int(*v))
    } else if let Some(v) = value.downcast_ref::<i64>() {
        Some(Value::Long(*v))
    } else if let Some(v) = value.downcast_ref::<f32>() {
        Some(Value::Float(*v))
    } else if let Some(v) = value.downcast_ref::<f64>() {
        Some(Value::Double(*v))
    } else if let Some(v) = value.downcast_ref::<String>() {
        Some(Value::String(v.clone()))
    } else if let Some(v) = value.downcast_ref::<&'static str>() {
        Some(Value::String((*v).to_string()))
    } else {
        value.downcast_ref::<bool>().map(|v| Value::Bool(*v))
    }
}

/// Like [`value_of_any`], failing with `UnsupportedType` when no kind matches.
pub fn require_value_of_any(value: &dyn Any, type_name: &str) -> Result<Value> {
    value_of_any(value).ok_or_else(|| DataStoreError::unsupported(type_name))
}

/// Write one value.
pub async fn put(store: &dyn KeyValueStore, key: &str, value: Value) -> Result<()> {
    store
        .put(key, value)
        .await
        .map_err(|e| DataStoreError::store("put", e))
}

/// Read one value, returning `None` if the key is absent.
pub async fn get_raw(store: &dyn KeyValueStore, key: &str) -> Result<Option<Value>> {
    store
        .get(key)
        .await
        .map_err(|e| DataStoreError::store("get", e))
}

/// Read one typed value.
///
/// A missing key, or a key holding a different kind, yields `default`.
pub async fn get<T: PrimitiveType>(store: &dyn KeyValueStore, key: &str, default: T) -> Result<T> {
    Ok(get_raw(store, key)
        .await?
        .and_then(T::from_value)
        .unwrap_or(default))
}
