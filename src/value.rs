//! Stored value representation.
//!
//! A key holds exactly one [`Value`] at a time. The kind is not recorded
//! separately from the value; readers state the kind they expect through the
//! type of the default they pass in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The primitive kinds a store can persist natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Double,
    String,
    Bool,
}

impl ValueKind {
    /// All kinds, in declaration order.
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Int,
        ValueKind::Long,
        ValueKind::Float,
        ValueKind::Double,
        ValueKind::String,
        ValueKind::Bool,
    ];

    /// Stable lowercase name, used as the persisted tag by on-disk backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Bool => "bool",
        }
    }

    /// Parse a persisted tag produced by [`ValueKind::as_str`].
    pub fn parse(tag: &str) -> Option<Self> {
        ValueKind::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dynamically typed stored value.
///
/// Structured values are persisted through the
/// [`SerializationStrategy`](crate::serialization::SerializationStrategy) as
/// [`Value::String`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bool(bool),
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Bool(_) => ValueKind::Bool,
        }
    }

    /// Textual payload, without the kind tag.
    pub fn to_text(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::String(v) => v.clone(),
            Value::Bool(v) => v.to_string(),
        }
    }

    /// Rebuild a value from a kind and the payload written by [`Value::to_text`].
    pub fn from_text(kind: ValueKind, text: &str) -> Option<Self> {
        match kind {
            ValueKind::Int => text.parse().ok().map(Value::Int),
            ValueKind::Long => text.parse().ok().map(Value::Long),
            ValueKind::Float => text.parse().ok().map(Value::Float),
            ValueKind::Double => text.parse().ok().map(Value::Double),
            ValueKind::String => Some(Value::String(text.to_string())),
            ValueKind::Bool => text.parse().ok().map(Value::Bool),
        }
    }

    /// Size in bytes of the payload, as checked by the validator.
    pub fn payload_len(&self) -> usize {
        match self {
            Value::String(s) => s.len(),
            Value::Int(_) | Value::Float(_) => 4,
            Value::Long(_) | Value::Double(_) => 8,
            Value::Bool(_) => 1,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.to_text())
    }
}
