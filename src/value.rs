//! Property values, including references to out-of-line streaming payloads.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::streaming::StreamingValueRef;

/// Typed property value as stored in a mutation log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// Owned string.
    Str(String),
    /// Owned byte vector.
    Bytes(Vec<u8>),
    /// Date value represented as days since the Unix epoch.
    Date(i64),
    /// DateTime value represented as milliseconds since the Unix epoch.
    DateTime(i64),
    /// Out-of-line value resolved through the storage adapter on read.
    Streaming(StreamingValueRef),
}

impl PropertyValue {
    /// Returns the string payload for [`PropertyValue::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload for [`PropertyValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the reference for [`PropertyValue::Streaming`].
    pub fn as_streaming(&self) -> Option<&StreamingValueRef> {
        match self {
            PropertyValue::Streaming(r) => Some(r),
            _ => None,
        }
    }

    /// Size of the inline payload in bytes, used to decide out-of-line storage.
    pub fn inline_len(&self) -> usize {
        match self {
            PropertyValue::Str(s) => s.len(),
            PropertyValue::Bytes(b) => b.len(),
            _ => 0,
        }
    }

    /// Orders two values of the same type; mixed types are unordered.
    pub fn partial_cmp_value(&self, other: &PropertyValue) -> Option<Ordering> {
        match (self, other) {
            (PropertyValue::Null, PropertyValue::Null) => Some(Ordering::Equal),
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a.partial_cmp(b),
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a.partial_cmp(b),
            (PropertyValue::Float(a), PropertyValue::Float(b)) => a.partial_cmp(b),
            (PropertyValue::Str(a), PropertyValue::Str(b)) => a.partial_cmp(b),
            (PropertyValue::Bytes(a), PropertyValue::Bytes(b)) => a.partial_cmp(b),
            (PropertyValue::Date(a), PropertyValue::Date(b)) => a.partial_cmp(b),
            (PropertyValue::DateTime(a), PropertyValue::DateTime(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Str(v) => write!(f, "{v}"),
            PropertyValue::Bytes(v) => write!(f, "bytes(len={})", v.len()),
            PropertyValue::Date(v) => write!(f, "date({v})"),
            PropertyValue::DateTime(v) => write!(f, "datetime({v})"),
            PropertyValue::Streaming(r) => {
                write!(f, "streaming({}, len={})", r.value_type, r.length)
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        PropertyValue::Bytes(value)
    }
}
