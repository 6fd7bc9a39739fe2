//! Request parameter reading and normalization.
//!
//! [`QueryRequest`] snapshots the raw `include`, `filter`, `sort`, `fields`
//! and `append` parameter values from a [`RequestData`] source and exposes
//! them in normalized form: delimiter-joined strings split into lists,
//! field selections grouped by table, filter values recursively coerced.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::config::ResolvedConfig;
use crate::value::FilterValue;

/// Group key for field selections that carry no table prefix.
pub const UNGROUPED_FIELDS_KEY: &str = "_";

/// Source of merged query-string/body parameters, keyed by parameter name.
pub trait RequestData {
    fn input(&self, key: &str) -> Option<Value>;
}

impl RequestData for Value {
    fn input(&self, key: &str) -> Option<Value> {
        self.get(key).filter(|v| !v.is_null()).cloned()
    }
}

impl RequestData for HashMap<String, Value> {
    fn input(&self, key: &str) -> Option<Value> {
        self.get(key).filter(|v| !v.is_null()).cloned()
    }
}

/// Snapshot of a request's query parameters, parsed on demand.
///
/// Parsing is a pure function of the snapshot and the configuration, so
/// calling any accessor twice yields structurally equal output.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    config: Arc<ResolvedConfig>,
    include: Option<Value>,
    filter: Option<Value>,
    sort: Option<Value>,
    fields: Option<Value>,
    append: Option<Value>,
}

impl QueryRequest {
    pub fn from_request(request: &dyn RequestData, config: Arc<ResolvedConfig>) -> Self {
        let names = &config.parameters;
        Self {
            include: request.input(&names.include),
            filter: request.input(&names.filter),
            sort: request.input(&names.sort),
            fields: request.input(&names.fields),
            append: request.input(&names.append),
            config,
        }
    }

    /// An empty request (no parameters supplied).
    pub fn empty(config: Arc<ResolvedConfig>) -> Self {
        Self::from_request(&Value::Null, config)
    }

    pub fn config(&self) -> &Arc<ResolvedConfig> {
        &self.config
    }

    /// Requested include names, in request order.
    pub fn includes(&self) -> Vec<String> {
        delimited_list(self.include.as_ref(), &self.config.delimiters.include)
    }

    /// Requested sort tokens, in request order, leading `-` preserved.
    pub fn sorts(&self) -> Vec<String> {
        delimited_list(self.sort.as_ref(), &self.config.delimiters.sort)
    }

    /// Requested append names, in request order.
    pub fn appends(&self) -> Vec<String> {
        delimited_list(self.append.as_ref(), &self.config.delimiters.append)
    }

    /// Requested field selections, grouped by table.
    ///
    /// Supports both flat input (`fields=name,email,related.id`, grouped by
    /// the prefix before each field's last dot, [`UNGROUPED_FIELDS_KEY`] when
    /// undotted) and pre-grouped input (`fields[table]=name,email`).
    pub fn fields(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let delimiter = &self.config.delimiters.fields;

        let entries: Vec<(Option<String>, Value)> = match &self.fields {
            Some(Value::String(raw)) => raw
                .split(delimiter.as_str())
                .map(|part| (None, Value::String(part.to_string())))
                .collect(),
            Some(Value::Array(items)) => items.iter().map(|v| (None, v.clone())).collect(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| (Some(k.clone()), v.clone()))
                .collect(),
            _ => return grouped,
        };

        for (key, value) in entries {
            // A missing or purely numeric key means the caller passed a flat
            // list; derive the group from the field string itself.
            let group = match key {
                Some(k) if !k.is_empty() && k.parse::<u64>().is_err() => k,
                _ => match &value {
                    Value::String(s) if s.contains('.') => before_last(s, '.').to_string(),
                    _ => UNGROUPED_FIELDS_KEY.to_string(),
                },
            };

            let fields: Vec<String> = match &value {
                Value::String(s) => s
                    .split(delimiter.as_str())
                    .filter(|f| !f.is_empty())
                    .map(|f| after_last(f, '.').to_string())
                    .collect(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|f| !f.is_empty())
                    .map(String::from)
                    .collect(),
                _ => Vec::new(),
            };

            grouped.entry(group).or_default().extend(fields);
        }

        grouped.retain(|_, fields| !fields.is_empty());
        grouped
    }

    /// Requested filters keyed by external name, values normalized.
    ///
    /// A bare-string `filter` parameter cannot carry names and yields an
    /// empty map; anything non-map-shaped is treated the same way.
    pub fn filters(&self) -> BTreeMap<String, FilterValue> {
        let Some(Value::Object(map)) = &self.filter else {
            return BTreeMap::new();
        };

        let delimiter = &self.config.delimiters.filter;
        map.iter()
            .map(|(name, value)| (name.clone(), normalize_filter_value(value, delimiter)))
            .collect()
    }
}

/// Recursive filter value normalization.
///
/// The null-leaf rule: JSON `null` (and undefined, which never reaches us)
/// normalizes to an explicit empty string, never to a null sentinel. Empty
/// maps normalize to empty arrays; containers recurse preserving shape;
/// delimiter-joined strings split; `"true"`/`"false"` coerce to booleans.
pub(crate) fn normalize_filter_value(value: &Value, delimiter: &str) -> FilterValue {
    match value {
        Value::Null => FilterValue::String(String::new()),
        Value::String(s) if s.is_empty() => FilterValue::String(String::new()),
        Value::Array(items) if items.is_empty() => FilterValue::Array(Vec::new()),
        Value::Object(map) if map.is_empty() => FilterValue::Array(Vec::new()),
        Value::Array(items) => FilterValue::Array(
            items
                .iter()
                .map(|item| normalize_filter_value(item, delimiter))
                .collect(),
        ),
        Value::Object(map) => FilterValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_filter_value(v, delimiter)))
                .collect(),
        ),
        Value::String(s) if s.contains(delimiter) => FilterValue::Array(
            s.split(delimiter)
                .map(|part| FilterValue::String(part.to_string()))
                .collect(),
        ),
        Value::String(s) if s == "true" => FilterValue::Bool(true),
        Value::String(s) if s == "false" => FilterValue::Bool(false),
        Value::String(s) => FilterValue::String(s.clone()),
        Value::Bool(b) => FilterValue::Bool(*b),
        Value::Number(n) => FilterValue::Number(n.clone()),
    }
}

/// Split a raw parameter into a list: bare strings split on the delimiter,
/// arrays and objects contribute their scalar members. Empty and falsy
/// entries are dropped.
fn delimited_list(raw: Option<&Value>, delimiter: &str) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(Value::String(s)) => s
            .split(delimiter)
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::Array(items)) => items.iter().filter_map(scalar_entry).collect(),
        Some(Value::Object(map)) => map.values().filter_map(scalar_entry).collect(),
        Some(_) => Vec::new(),
    }
}

fn scalar_entry(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn before_last<'a>(s: &'a str, pattern: char) -> &'a str {
    match s.rfind(pattern) {
        Some(index) => &s[..index],
        None => s,
    }
}

fn after_last<'a>(s: &'a str, pattern: char) -> &'a str {
    match s.rfind(pattern) {
        Some(index) => &s[index + 1..],
        None => s,
    }
}
