//! Allowed filters and their operation strategies.
//!
//! An [`AllowedFilter`] pairs an external (request-facing) name with an
//! internal column or relation path and a [`Filter`] strategy that knows how
//! to turn a normalized value into builder predicates:
//! - exact / partial / begins-with / ends-with matching
//! - fixed or dynamic comparison operators
//! - soft-delete (trashed) mode selection
//! - user callbacks and fully custom strategies

mod callback;
mod exact;
mod operator;
mod partial;
mod trashed;

use std::sync::Arc;

pub use callback::FiltersCallback;
pub use exact::FiltersExact;
pub use operator::FiltersOperator;
pub use partial::FiltersPartial;
pub use trashed::FiltersTrashed;

use crate::query::QueryBuilder;
use crate::value::FilterValue;

/// Comparison operators, including the dynamic sentinel that parses the
/// operator from a leading substring of the filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Dynamic,
    Equal,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    NotEqual,
}

impl FilterOperator {
    /// All operators in declaration order. Dynamic-operator matching scans
    /// this list and keeps the last token that prefixes the value, so the
    /// order is part of the tie-break contract.
    pub const ALL: [FilterOperator; 7] = [
        FilterOperator::Dynamic,
        FilterOperator::Equal,
        FilterOperator::LessThan,
        FilterOperator::GreaterThan,
        FilterOperator::LessThanOrEqual,
        FilterOperator::GreaterThanOrEqual,
        FilterOperator::NotEqual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Dynamic => "",
            FilterOperator::Equal => "=",
            FilterOperator::LessThan => "<",
            FilterOperator::GreaterThan => ">",
            FilterOperator::LessThanOrEqual => "<=",
            FilterOperator::GreaterThanOrEqual => ">=",
            FilterOperator::NotEqual => "<>",
        }
    }
}

/// A filter operation strategy.
pub trait Filter: Send + Sync {
    /// Apply the filter to `query` for the resolved `value` and internal
    /// `property` name.
    fn handle(&self, query: &mut dyn QueryBuilder, value: &FilterValue, property: &str);
}

/// User callback signature for [`AllowedFilter::callback`].
pub type FilterCallback = Arc<dyn Fn(&mut dyn QueryBuilder, &FilterValue, &str) + Send + Sync>;

/// A declared, allow-listed filter.
pub struct AllowedFilter {
    name: String,
    internal_name: String,
    operation: Arc<dyn Filter>,
    ignored: Vec<FilterValue>,
    default: FilterValue,
    has_default: bool,
    nullable: bool,
}

impl AllowedFilter {
    /// Pair a name with an arbitrary operation strategy.
    pub fn new(name: &str, operation: Arc<dyn Filter>) -> Self {
        Self {
            name: name.to_string(),
            internal_name: name.to_string(),
            operation,
            ignored: Vec::new(),
            default: FilterValue::Null,
            has_default: false,
            nullable: false,
        }
    }

    /// Exact match (WHERE =, WHERE IN for arrays), with relation-constraint
    /// rewriting for dotted paths. For a filter without the relation
    /// constraint, pair [`FiltersExact::new`] with [`AllowedFilter::custom`].
    pub fn exact(name: &str) -> Self {
        Self::new(name, Arc::new(FiltersExact::new(true)))
    }

    /// Case-insensitive substring match (`LIKE %value%`).
    pub fn partial(name: &str) -> Self {
        Self::new(name, Arc::new(FiltersPartial::new(true)))
    }

    /// Case-sensitive prefix match (`LIKE value%`).
    pub fn begins_with_strict(name: &str) -> Self {
        Self::new(name, Arc::new(FiltersPartial::begins_with(true)))
    }

    /// Case-sensitive suffix match (`LIKE %value`).
    pub fn ends_with_strict(name: &str) -> Self {
        Self::new(name, Arc::new(FiltersPartial::ends_with(true)))
    }

    /// Fixed comparison operator, or [`FilterOperator::Dynamic`] to parse
    /// the operator from the value itself.
    pub fn operator(name: &str, operator: FilterOperator) -> Self {
        Self::new(name, Arc::new(FiltersOperator::new(true, operator)))
    }

    /// Soft-delete mode filter named `trashed`.
    pub fn trashed() -> Self {
        Self::new("trashed", Arc::new(FiltersTrashed))
    }

    /// Escape hatch: a user closure receives the builder, value and
    /// property. Ignore/default/nullable resolution still applies first.
    pub fn callback<F>(name: &str, callback: F) -> Self
    where
        F: Fn(&mut dyn QueryBuilder, &FilterValue, &str) + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(FiltersCallback::new(callback)))
    }

    /// Pair a name with a user-supplied [`Filter`] implementation.
    pub fn custom(name: &str, operation: Arc<dyn Filter>) -> Self {
        Self::new(name, operation)
    }

    /// Override the internal column/relation path (defaults to the external
    /// name).
    pub fn internal(mut self, internal_name: &str) -> Self {
        self.internal_name = internal_name.to_string();
        self
    }

    /// Add values that should be treated as absent when requested.
    pub fn ignore<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        self.ignored.extend(values.into_iter().map(Into::into));
        self
    }

    /// Apply this filter with `value` when the request does not mention it.
    /// A `Null` default also marks the filter nullable, since the default
    /// could not fire otherwise.
    pub fn set_default(mut self, value: impl Into<FilterValue>) -> Self {
        self.default = value.into();
        self.has_default = true;
        if self.default.is_null() {
            self.nullable = true;
        }
        self
    }

    pub fn unset_default(mut self) -> Self {
        self.default = FilterValue::Null;
        self.has_default = false;
        self
    }

    /// Allow the filter to fire with a null-equivalent value.
    pub fn set_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    pub fn is_for_filter(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    pub fn default_value(&self) -> &FilterValue {
        &self.default
    }

    pub fn ignored(&self) -> &[FilterValue] {
        &self.ignored
    }

    /// Resolve the effective value and delegate to the operation strategy.
    /// A value that resolves to null is a no-op unless the filter is
    /// nullable.
    pub fn filter(&self, query: &mut dyn QueryBuilder, value: &FilterValue) {
        let resolved = self.resolve_value_for_filtering(value);
        if resolved.is_null() && !self.nullable {
            return;
        }

        self.operation.handle(query, &resolved, &self.internal_name);
    }

    /// Strip ignored values. Array members are filtered element-wise; an
    /// array that collapses to empty is null-equivalent.
    fn resolve_value_for_filtering(&self, value: &FilterValue) -> FilterValue {
        match value {
            FilterValue::Array(items) => {
                let kept: Vec<FilterValue> = items
                    .iter()
                    .filter(|item| !self.is_ignored(item))
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    FilterValue::Null
                } else {
                    FilterValue::Array(kept)
                }
            }
            _ if self.is_ignored(value) => FilterValue::Null,
            _ => value.clone(),
        }
    }

    /// Query-string values always arrive as strings, so scalar ignore
    /// entries match on their string form (`ignore([6])` matches `"6"`).
    fn is_ignored(&self, value: &FilterValue) -> bool {
        self.ignored.iter().any(|ignored| {
            ignored == value
                || (ignored.is_scalar()
                    && value.is_scalar()
                    && ignored.to_value_string() == value.to_value_string())
        })
    }
}
