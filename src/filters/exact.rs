//! Exact-match filtering with relation-constraint rewriting.

use crate::filters::{Filter, FilterOperator};
use crate::query::QueryBuilder;
use crate::value::FilterValue;

/// Exact match: `WHERE col = value`, `WHERE col IN (...)` for arrays,
/// `WHERE col IS NULL` for nullable filters fired with null. Dotted
/// properties whose first segment names a relation are rewritten into a
/// relation-scoped sub-query instead.
pub struct FiltersExact {
    add_relation_constraint: bool,
}

impl FiltersExact {
    pub fn new(add_relation_constraint: bool) -> Self {
        Self {
            add_relation_constraint,
        }
    }
}

impl Filter for FiltersExact {
    fn handle(&self, query: &mut dyn QueryBuilder, value: &FilterValue, property: &str) {
        let mut visited = Vec::new();
        self.handle_scoped(query, value, property, &mut visited);
    }
}

impl FiltersExact {
    pub(crate) fn handle_scoped(
        &self,
        query: &mut dyn QueryBuilder,
        value: &FilterValue,
        property: &str,
        visited: &mut Vec<String>,
    ) {
        if self.add_relation_constraint && is_relation_property(query, property, visited) {
            with_relation_constraint(query, property, visited, &mut |sub, column, visited| {
                self.handle_scoped(sub, value, column, visited)
            });
            return;
        }

        let column = qualify_column(query, property);
        match value {
            FilterValue::Array(items) => query.where_in(&column, items),
            FilterValue::Null => query.where_null(&column),
            _ => query.where_op(&column, FilterOperator::Equal, value),
        }
    }
}

/// Prefix bare column names with the builder's table to avoid ambiguity in
/// joined or related queries. Dotted names pass through unchanged.
pub(crate) fn qualify_column(query: &dyn QueryBuilder, column: &str) -> String {
    if column.contains('.') {
        column.to_string()
    } else {
        format!("{}.{}", query.table(), column)
    }
}

/// A property is a relation path when it is dotted, has not already been
/// constrained (the visited list guards against re-entry), and its first
/// segment names a relation on the builder's model.
pub(crate) fn is_relation_property(
    query: &dyn QueryBuilder,
    property: &str,
    visited: &[String],
) -> bool {
    if !property.contains('.') {
        return false;
    }

    if visited.iter().any(|path| path == property) {
        return false;
    }

    let first_segment = property.split('.').next().unwrap_or(property);
    query.has_relation(first_segment)
}

/// Rewrite `relation.column` into a sub-query scoped to the relation. The
/// property path is recorded in the visited list before recursing, so
/// repeated application of the same path cannot recurse indefinitely.
pub(crate) fn with_relation_constraint(
    query: &mut dyn QueryBuilder,
    property: &str,
    visited: &mut Vec<String>,
    recurse: &mut dyn FnMut(&mut dyn QueryBuilder, &str, &mut Vec<String>),
) {
    let Some((relation, column)) = property.rsplit_once('.') else {
        return;
    };

    visited.push(property.to_string());
    let column = column.to_string();
    query.where_relation(relation, &mut |sub| recurse(sub, &column, visited));
}
