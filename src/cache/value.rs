//! Cache Value Module
//!
//! The closed set of values any storage backend must hold without coercion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

// == Cache Value ==
/// A storable value: null, text, number, boolean, or a structured record.
///
/// Serializes untagged, so the JSON form of each variant is the plain JSON
/// value and a round trip through a JSON backend preserves the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheValue {
    Null,
    Boolean(bool),
    Number(Number),
    Text(String),
    Record(Map<String, Value>),
}

impl CacheValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CacheValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CacheValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Map<String, Value>> {
        match self {
            CacheValue::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::Text(value.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::Text(value)
    }
}

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        CacheValue::Boolean(value)
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        CacheValue::Number(value.into())
    }
}

impl From<u64> for CacheValue {
    fn from(value: u64) -> Self {
        CacheValue::Number(value.into())
    }
}

impl From<Map<String, Value>> for CacheValue {
    fn from(value: Map<String, Value>) -> Self {
        CacheValue::Record(value)
    }
}

impl From<Option<String>> for CacheValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(CacheValue::Null, CacheValue::Text)
    }
}
