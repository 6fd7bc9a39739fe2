//! Allowed sorts and their operation strategies.

use std::sync::Arc;

use crate::query::{QueryBuilder, SortDirection};

/// A sort operation strategy.
pub trait Sort: Send + Sync {
    /// Apply the sort to `query` for the internal `property` name.
    fn handle(&self, query: &mut dyn QueryBuilder, descending: bool, property: &str);
}

/// Plain column ordering.
pub struct SortsField;

impl Sort for SortsField {
    fn handle(&self, query: &mut dyn QueryBuilder, descending: bool, property: &str) {
        let direction = if descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        query.order_by(property, direction);
    }
}

/// User callback signature for [`AllowedSort::callback`].
pub type SortCallback = Arc<dyn Fn(&mut dyn QueryBuilder, bool, &str) + Send + Sync>;

/// Escape hatch: sorting delegated to a user closure.
pub struct SortsCallback {
    callback: SortCallback,
}

impl SortsCallback {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut dyn QueryBuilder, bool, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl Sort for SortsCallback {
    fn handle(&self, query: &mut dyn QueryBuilder, descending: bool, property: &str) {
        (self.callback)(query, descending, property);
    }
}

/// A declared, allow-listed sort.
///
/// The declared name may carry a leading `-`; it is stripped for matching
/// and becomes the default direction instead, so `AllowedSort::field("-name")`
/// matches `sort=name` and `sort=-name` alike and sorts descending when used
/// as a default.
pub struct AllowedSort {
    name: String,
    internal_name: String,
    default_direction: SortDirection,
    operation: Arc<dyn Sort>,
}

impl AllowedSort {
    pub fn new(name: &str, operation: Arc<dyn Sort>) -> Self {
        let stripped = name.strip_prefix('-').unwrap_or(name);
        let default_direction = if name.starts_with('-') {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        Self {
            name: stripped.to_string(),
            internal_name: stripped.to_string(),
            default_direction,
            operation,
        }
    }

    /// Order by a column.
    pub fn field(name: &str) -> Self {
        Self::new(name, Arc::new(SortsField))
    }

    /// Escape hatch: a user closure receives the builder, the requested
    /// descending flag and the internal property name.
    pub fn callback<F>(name: &str, callback: F) -> Self
    where
        F: Fn(&mut dyn QueryBuilder, bool, &str) + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(SortsCallback::new(callback)))
    }

    /// Pair a name with a user-supplied [`Sort`] implementation.
    pub fn custom(name: &str, operation: Arc<dyn Sort>) -> Self {
        Self::new(name, operation)
    }

    /// Override the internal column name (defaults to the stripped external
    /// name).
    pub fn internal(mut self, internal_name: &str) -> Self {
        self.internal_name = internal_name.to_string();
        self
    }

    pub fn set_default_direction(mut self, direction: SortDirection) -> Self {
        self.default_direction = direction;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    /// Match a requested sort token, leading `-` stripped by the caller.
    pub fn is_for_sort(&self, name: &str) -> bool {
        self.name == name
    }

    /// Apply the sort. `descending` is the request's explicit direction;
    /// `None` (default-sort application) falls back to the declared default
    /// direction.
    pub fn sort(&self, query: &mut dyn QueryBuilder, descending: Option<bool>) {
        let descending =
            descending.unwrap_or(self.default_direction == SortDirection::Descending);
        self.operation.handle(query, descending, &self.internal_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqlQuery;
    use crate::schema::test_schema;

    fn query() -> SqlQuery {
        SqlQuery::new(test_schema(), "test_models")
    }

    #[test]
    fn field_sort_orders_ascending_by_default() {
        let mut q = query();
        AllowedSort::field("name").sort(&mut q, None);
        assert!(q.to_sql().contains(r#"ORDER BY "name" ASC"#));
    }

    #[test]
    fn declared_minus_prefix_sets_the_default_direction() {
        let sort = AllowedSort::field("-name");
        assert_eq!(sort.name(), "name");
        assert!(sort.is_for_sort("name"));

        let mut q = query();
        sort.sort(&mut q, None);
        assert!(q.to_sql().contains(r#"ORDER BY "name" DESC"#));
    }

    #[test]
    fn explicit_direction_overrides_the_default() {
        let mut q = query();
        AllowedSort::field("-name").sort(&mut q, Some(false));
        assert!(q.to_sql().contains(r#"ORDER BY "name" ASC"#));
    }

    #[test]
    fn internal_name_aliases_the_column() {
        let mut q = query();
        AllowedSort::field("-alias").internal("name").sort(&mut q, Some(true));
        let sql = q.to_sql();
        assert!(sql.contains(r#"ORDER BY "name" DESC"#), "{sql}");
        assert!(!sql.contains("alias"), "{sql}");
    }

    #[test]
    fn set_default_direction_wins_over_the_name_prefix() {
        let mut q = query();
        AllowedSort::field("name")
            .set_default_direction(SortDirection::Descending)
            .sort(&mut q, None);
        assert!(q.to_sql().contains(r#"ORDER BY "name" DESC"#));
    }

    #[test]
    fn callback_sort_receives_the_descending_flag() {
        let sort = AllowedSort::callback("name", |query, descending, property| {
            // Invert the requested direction.
            let direction = if descending {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            query.order_by(property, direction);
        });

        let mut q = query();
        sort.sort(&mut q, Some(true));
        assert!(q.to_sql().contains(r#"ORDER BY "name" ASC"#));
    }
}
