//! LIKE-based filtering: partial (substring), begins-with, and ends-with.

use crate::filters::exact::{is_relation_property, qualify_column, with_relation_constraint};
use crate::filters::Filter;
use crate::query::{Dialect, QueryBuilder};
use crate::value::FilterValue;

/// Where the match value sits inside the LIKE pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeShape {
    /// `%value%`, case-insensitive (column and value lower-cased).
    Contains,
    /// `value%`, case-sensitive.
    BeginsWith,
    /// `%value`, case-sensitive.
    EndsWith,
}

/// Substring matching via `LIKE`, sharing the exact filter's
/// relation-constraint rewriting for dotted paths.
///
/// Array values turn into an OR group of LIKE clauses; members that
/// stringify to empty are skipped, and an all-empty array adds nothing.
pub struct FiltersPartial {
    add_relation_constraint: bool,
    shape: LikeShape,
}

impl FiltersPartial {
    /// Case-insensitive `%value%` matching.
    pub fn new(add_relation_constraint: bool) -> Self {
        Self {
            add_relation_constraint,
            shape: LikeShape::Contains,
        }
    }

    /// Case-sensitive `value%` matching.
    pub fn begins_with(add_relation_constraint: bool) -> Self {
        Self {
            add_relation_constraint,
            shape: LikeShape::BeginsWith,
        }
    }

    /// Case-sensitive `%value` matching.
    pub fn ends_with(add_relation_constraint: bool) -> Self {
        Self {
            add_relation_constraint,
            shape: LikeShape::EndsWith,
        }
    }

    fn handle_scoped(
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

        let dialect = query.dialect();
        let column = qualify_column(query, property);
        if let FilterValue::Array(items) = value {
            let values: Vec<String> = items
                .iter()
                .map(FilterValue::to_value_string)
                .filter(|s| !s.is_empty())
                .collect();
            if values.is_empty() {
                return;
            }

            query.where_group(&mut |group| {
                for item in &values {
                    let (sql, bindings) = self.like_parameters(item, &column, dialect);
                    group.or_where_raw(&sql, &bindings);
                }
            });
            return;
        }

        let (sql, bindings) = self.like_parameters(&value.to_value_string(), &column, dialect);
        query.where_raw(&sql, &bindings);
    }

    // The pattern binds through the `$1` placeholder form.
    fn like_parameters(&self, value: &str, property: &str, dialect: Dialect) -> (String, Vec<String>) {
        let escape = maybe_specify_escape_char(dialect);
        match self.shape {
            LikeShape::Contains => (
                format!("LOWER({property}) LIKE $1{escape}"),
                vec![format!("%{}%", escape_like(&value.to_lowercase()))],
            ),
            LikeShape::BeginsWith => (
                format!("{property} LIKE $1{escape}"),
                vec![format!("{}%", escape_like(value))],
            ),
            LikeShape::EndsWith => (
                format!("{property} LIKE $1{escape}"),
                vec![format!("%{}", escape_like(value))],
            ),
        }
    }
}

impl Filter for FiltersPartial {
    fn handle(&self, query: &mut dyn QueryBuilder, value: &FilterValue, property: &str) {
        let mut visited = Vec::new();
        self.handle_scoped(query, value, property, &mut visited);
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a match value.
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Sqlite treats a backslash escape as the default; other dialects need the
/// explicit ESCAPE clause.
fn maybe_specify_escape_char(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => "",
        Dialect::Postgres | Dialect::MySql => r" ESCAPE '\'",
    }
}
