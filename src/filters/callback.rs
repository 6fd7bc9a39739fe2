//! Callback filter: full escape-hatch control for endpoint code.

use crate::filters::{Filter, FilterCallback};
use crate::query::QueryBuilder;
use crate::value::FilterValue;

/// Pure passthrough to a user closure. Ignore, default and nullable
/// resolution have already happened by the time the closure runs.
pub struct FiltersCallback {
    callback: FilterCallback,
}

impl FiltersCallback {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut dyn QueryBuilder, &FilterValue, &str) + Send + Sync + 'static,
    {
        Self {
            callback: std::sync::Arc::new(callback),
        }
    }
}

impl Filter for FiltersCallback {
    fn handle(&self, query: &mut dyn QueryBuilder, value: &FilterValue, property: &str) {
        (self.callback)(query, value, property);
    }
}
