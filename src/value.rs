//! Normalized filter values.
//!
//! Request parameters arrive as JSON-shaped data (strings, arrays, nested
//! maps). [`FilterValue`] is the normalized form the filter strategies
//! operate on: delimiter-joined strings are already split, `"true"`/`"false"`
//! are coerced to booleans, and null leaves have been rewritten to empty
//! strings by the request reader.

use std::collections::BTreeMap;

/// A normalized filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// No usable value. Produced by ignore-list resolution, never by the
    /// request reader (null leaves normalize to an empty string instead).
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<FilterValue>),
    Map(BTreeMap<String, FilterValue>),
}

impl FilterValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }

    /// True for non-container values.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, FilterValue::Array(_) | FilterValue::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Lossy scalar stringification, used by LIKE filters, dynamic operator
    /// parsing, and the trashed filter. Arrays join their elements with a
    /// comma; maps and null stringify to the empty string.
    pub fn to_value_string(&self) -> String {
        match self {
            FilterValue::Null => String::new(),
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::Number(n) => n.to_string(),
            FilterValue::String(s) => s.clone(),
            FilterValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(FilterValue::to_value_string).collect();
                parts.join(",")
            }
            FilterValue::Map(_) => String::new(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Number(serde_json::Number::from(value))
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Number(serde_json::Number::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        match serde_json::Number::from_f64(value) {
            Some(n) => FilterValue::Number(n),
            None => FilterValue::Null,
        }
    }
}

/// Structural conversion from raw JSON, without request normalization.
/// Used for programmatic values such as filter defaults.
impl From<serde_json::Value> for FilterValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FilterValue::Null,
            serde_json::Value::Bool(b) => FilterValue::Bool(b),
            serde_json::Value::Number(n) => FilterValue::Number(n),
            serde_json::Value::String(s) => FilterValue::String(s),
            serde_json::Value::Array(items) => {
                FilterValue::Array(items.into_iter().map(FilterValue::from).collect())
            }
            serde_json::Value::Object(map) => FilterValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FilterValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::Array(values.into_iter().map(Into::into).collect())
    }
}
