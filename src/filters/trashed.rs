//! Soft-delete mode filter.

use crate::filters::Filter;
use crate::query::QueryBuilder;
use crate::value::FilterValue;

/// Switches the soft-delete mode of builders that support it: `"with"`
/// includes trashed rows, `"only"` restricts to them, anything else keeps
/// the builder's baseline (trashed rows excluded). Builders without the
/// capability are left untouched.
pub struct FiltersTrashed;

impl Filter for FiltersTrashed {
    fn handle(&self, query: &mut dyn QueryBuilder, value: &FilterValue, _property: &str) {
        let Some(soft_deletes) = query.soft_deletes() else {
            tracing::debug!("builder has no soft-delete capability; ignoring trashed filter");
            return;
        };

        match value.to_value_string().as_str() {
            "with" => soft_deletes.with_trashed(),
            "only" => soft_deletes.only_trashed(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqlQuery;
    use crate::schema::{test_schema, Schema, Table};
    use std::sync::Arc;

    fn query() -> SqlQuery {
        // test_models declares deleted_at as its soft-delete column.
        SqlQuery::new(test_schema(), "test_models")
    }

    #[test]
    fn baseline_excludes_trashed_rows() {
        let q = query();
        assert!(q.to_sql().contains(r#""test_models"."deleted_at" IS NULL"#));
    }

    #[test]
    fn with_includes_trashed_rows() {
        let mut q = query();
        FiltersTrashed.handle(&mut q, &FilterValue::from("with"), "trashed");
        assert!(!q.to_sql().contains("deleted_at"));
    }

    #[test]
    fn only_restricts_to_trashed_rows() {
        let mut q = query();
        FiltersTrashed.handle(&mut q, &FilterValue::from("only"), "trashed");
        assert!(q.to_sql().contains(r#""test_models"."deleted_at" IS NOT NULL"#));
    }

    #[test]
    fn unknown_value_keeps_the_baseline() {
        let mut q = query();
        FiltersTrashed.handle(&mut q, &FilterValue::from("everything"), "trashed");
        assert!(q.to_sql().contains(r#""test_models"."deleted_at" IS NULL"#));
    }

    #[test]
    fn no_ops_without_the_capability() {
        let schema = Arc::new(Schema::new().table(Table::new("plain_models")));
        let mut q = SqlQuery::new(schema, "plain_models");
        FiltersTrashed.handle(&mut q, &FilterValue::from("only"), "trashed");
        assert!(!q.to_sql().contains("deleted_at"));
    }
}
