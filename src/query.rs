//! Query builder capabilities.
//!
//! The translation engine never talks to a database. It mutates an abstract
//! [`QueryBuilder`], which any relational builder or ORM adapter can
//! implement; the crate ships a sea-query backed implementation in
//! [`crate::backend`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::filters::FilterOperator;
use crate::value::FilterValue;

/// SQL dialect of the underlying builder. Drives LIKE escape-clause choice
/// and, for the bundled backend, the rendering backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
    Sqlite,
}

/// Sort order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "asc" => Ok(SortDirection::Ascending),
            "desc" => Ok(SortDirection::Descending),
            other => Err(QueryError::InvalidDirection(other.to_string())),
        }
    }
}

/// Optional soft-delete capability, detected at runtime rather than
/// inheritance. Builders without it silently ignore the trashed filter.
pub trait SoftDeletes {
    /// Include soft-deleted rows.
    fn with_trashed(&mut self);
    /// Restrict to soft-deleted rows only.
    fn only_trashed(&mut self);
}

/// The capability set this crate requires from a relational query builder.
///
/// Predicate methods append to an implicit AND chain, except inside
/// [`QueryBuilder::where_group`], where predicates OR-combine into one
/// parenthesized group. `preload` and `with_count` delegate relation loading
/// to the external ORM; this crate only issues the directives.
pub trait QueryBuilder {
    /// Table the builder selects from, used to qualify bare column names.
    fn table(&self) -> &str;

    /// Whether the builder's model declares the named relation.
    fn has_relation(&self, relation: &str) -> bool;

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    /// Add a comparison predicate. A `Null` value with an equality operator
    /// must render an IS NULL check.
    fn where_op(&mut self, column: &str, operator: FilterOperator, value: &FilterValue);

    fn where_in(&mut self, column: &str, values: &[FilterValue]);

    fn where_null(&mut self, column: &str);

    /// Add a raw SQL predicate. Placeholders use the 1-based `$N` form,
    /// bound against `bindings` positionally.
    fn where_raw(&mut self, sql: &str, bindings: &[String]);

    /// As [`QueryBuilder::where_raw`], OR-combined with the surrounding
    /// group. Intended for use inside [`QueryBuilder::where_group`].
    fn or_where_raw(&mut self, sql: &str, bindings: &[String]);

    /// Collect the predicates added by `f` into one OR-combined group.
    fn where_group(&mut self, f: &mut dyn FnMut(&mut dyn QueryBuilder));

    /// Scope the predicates added by `f` to the named relation (dotted paths
    /// nest), e.g. as a correlated EXISTS sub-query.
    fn where_relation(&mut self, relation: &str, f: &mut dyn FnMut(&mut dyn QueryBuilder));

    fn order_by(&mut self, column: &str, direction: SortDirection);

    /// Eager-load the named relation; `f` customizes the relation sub-query.
    fn preload(&mut self, relation: &str, f: &mut dyn FnMut(&mut dyn QueryBuilder));

    /// Annotate the result with the named relation's row count.
    fn with_count(&mut self, relation: &str);

    /// Capability check for soft-delete support.
    fn soft_deletes(&mut self) -> Option<&mut dyn SoftDeletes> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_parses_lowercase_tokens_only() {
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Ascending);
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Descending);
        assert_eq!(
            "descending".parse::<SortDirection>(),
            Err(QueryError::InvalidDirection("descending".to_string()))
        );
    }
}
