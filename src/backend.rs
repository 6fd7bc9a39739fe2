//! Bundled sea-query implementation of [`QueryBuilder`].
//!
//! [`SqlQuery`] accumulates predicates, orderings, eager-load directives and
//! the soft-delete mode for one table, then renders a SELECT through
//! sea-query for the configured dialect. Relation metadata comes from a
//! shared [`Schema`]; dotted relation scoping renders as a correlated
//! EXISTS sub-query.
//!
//! Eager loads and relation counts are recorded rather than rendered: an
//! outer data layer reads them back via [`SqlQuery::eager_loads`] and
//! [`SqlQuery::counted_relations`] and issues the follow-up queries itself.

use std::sync::Arc;

use sea_query::{
    Alias, Asterisk, Cond, ConditionExpression, Expr, MysqlQueryBuilder, Order,
    PostgresQueryBuilder, Query, SqliteQueryBuilder, Value,
};

use crate::filters::FilterOperator;
use crate::query::{Dialect, QueryBuilder, SoftDeletes, SortDirection};
use crate::schema::Schema;
use crate::value::FilterValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrashedMode {
    Default,
    With,
    Only,
}

/// A recorded eager-load directive: the relation name plus a builder the
/// include customizer may have constrained further (or nested into).
#[derive(Debug, Clone)]
pub struct EagerLoad {
    relation: String,
    query: SqlQuery,
}

impl EagerLoad {
    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn query(&self) -> &SqlQuery {
        &self.query
    }
}

/// Query state for one table.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    schema: Arc<Schema>,
    table: String,
    dialect: Dialect,
    cond: Cond,
    has_conditions: bool,
    orders: Vec<(String, SortDirection)>,
    eager: Vec<EagerLoad>,
    counts: Vec<String>,
    trashed: TrashedMode,
}

impl SqlQuery {
    pub fn new(schema: Arc<Schema>, table: &str) -> Self {
        Self {
            schema,
            table: table.to_string(),
            dialect: Dialect::default(),
            cond: Cond::all(),
            has_conditions: false,
            orders: Vec::new(),
            eager: Vec::new(),
            counts: Vec::new(),
            trashed: TrashedMode::Default,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// A sibling builder sharing schema and dialect, used for OR groups and
    /// relation sub-queries.
    fn scoped(&self, table: String, cond: Cond) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            table,
            dialect: self.dialect,
            cond,
            has_conditions: false,
            orders: Vec::new(),
            eager: Vec::new(),
            counts: Vec::new(),
            trashed: TrashedMode::Default,
        }
    }

    fn push<C>(&mut self, condition: C)
    where
        C: Into<ConditionExpression>,
    {
        let cond = std::mem::replace(&mut self.cond, Cond::all());
        self.cond = cond.add(condition);
        self.has_conditions = true;
    }

    fn soft_delete_column(&self) -> Option<&str> {
        self.schema
            .get(&self.table)
            .and_then(|table| table.soft_delete_column())
    }

    /// Relations recorded for count annotation, in request order.
    pub fn counted_relations(&self) -> &[String] {
        &self.counts
    }

    /// Recorded eager loads, in request order.
    pub fn eager_loads(&self) -> &[EagerLoad] {
        &self.eager
    }

    /// Dotted paths of the deepest recorded eager loads, e.g.
    /// `["posts.comments"]` when `posts` was preloaded with a nested
    /// `comments` preload.
    pub fn eager_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for load in &self.eager {
            let nested = load.query.eager_paths();
            if nested.is_empty() {
                paths.push(load.relation.clone());
            } else {
                for path in nested {
                    paths.push(format!("{}.{}", load.relation, path));
                }
            }
        }
        paths
    }

    /// Render the accumulated state as a SELECT for the configured dialect,
    /// values inlined. The soft-delete baseline is applied here so that the
    /// trashed mode can still change after predicates were added.
    pub fn to_sql(&self) -> String {
        let mut select = Query::select();
        select.column(Asterisk).from(Alias::new(self.table.as_str()));

        let mut cond = self.cond.clone();
        let mut constrained = self.has_conditions;
        if let Some(column) = self.soft_delete_column() {
            let col = Expr::col((Alias::new(self.table.as_str()), Alias::new(column)));
            match self.trashed {
                TrashedMode::Default => {
                    cond = cond.add(col.is_null());
                    constrained = true;
                }
                TrashedMode::Only => {
                    cond = cond.add(col.is_not_null());
                    constrained = true;
                }
                TrashedMode::With => {}
            }
        }
        // An empty condition set must render no WHERE clause at all.
        if constrained {
            select.cond_where(cond);
        }

        for (column, direction) in &self.orders {
            let order = match direction {
                SortDirection::Ascending => Order::Asc,
                SortDirection::Descending => Order::Desc,
            };
            match column.rsplit_once('.') {
                Some((table, column)) => {
                    select.order_by((Alias::new(table), Alias::new(column)), order)
                }
                None => select.order_by(Alias::new(column.as_str()), order),
            };
        }

        match self.dialect {
            Dialect::Postgres => select.to_string(PostgresQueryBuilder),
            Dialect::MySql => select.to_string(MysqlQueryBuilder),
            Dialect::Sqlite => select.to_string(SqliteQueryBuilder),
        }
    }
}

/// Column expression for a bare or `table.column` name.
fn col_expr(column: &str) -> Expr {
    match column.rsplit_once('.') {
        Some((table, column)) => Expr::col((Alias::new(table), Alias::new(column))),
        None => Expr::col(Alias::new(column)),
    }
}

fn to_sea_value(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null => Value::String(None),
        FilterValue::Bool(b) => (*b).into(),
        FilterValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(f) = n.as_f64() {
                f.into()
            } else {
                n.to_string().into()
            }
        }
        FilterValue::String(s) => s.clone().into(),
        FilterValue::Array(_) | FilterValue::Map(_) => value.to_value_string().into(),
    }
}

impl QueryBuilder for SqlQuery {
    fn table(&self) -> &str {
        &self.table
    }

    fn has_relation(&self, relation: &str) -> bool {
        self.schema
            .get(&self.table)
            .is_some_and(|table| table.has_relation(relation))
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn where_op(&mut self, column: &str, operator: FilterOperator, value: &FilterValue) {
        let col = col_expr(column);
        let expr = match operator {
            FilterOperator::Equal | FilterOperator::Dynamic => {
                if value.is_null() {
                    col.is_null()
                } else {
                    col.eq(to_sea_value(value))
                }
            }
            FilterOperator::NotEqual => col.ne(to_sea_value(value)),
            FilterOperator::LessThan => col.lt(to_sea_value(value)),
            FilterOperator::GreaterThan => col.gt(to_sea_value(value)),
            FilterOperator::LessThanOrEqual => col.lte(to_sea_value(value)),
            FilterOperator::GreaterThanOrEqual => col.gte(to_sea_value(value)),
        };
        self.push(expr);
    }

    fn where_in(&mut self, column: &str, values: &[FilterValue]) {
        let values: Vec<Value> = values.iter().map(to_sea_value).collect();
        self.push(col_expr(column).is_in(values));
    }

    fn where_null(&mut self, column: &str) {
        self.push(col_expr(column).is_null());
    }

    fn where_raw(&mut self, sql: &str, bindings: &[String]) {
        self.push(Expr::cust_with_values(sql, bindings.iter().cloned()));
    }

    fn or_where_raw(&mut self, sql: &str, bindings: &[String]) {
        // Combination is decided by the surrounding condition: inside a
        // where_group the group ORs, at the top level predicates AND.
        self.where_raw(sql, bindings);
    }

    fn where_group(&mut self, f: &mut dyn FnMut(&mut dyn QueryBuilder)) {
        let mut group = self.scoped(self.table.clone(), Cond::any());
        f(&mut group);
        if group.has_conditions {
            self.push(group.cond);
        }
    }

    fn where_relation(&mut self, relation: &str, f: &mut dyn FnMut(&mut dyn QueryBuilder)) {
        let Some(rel) = self
            .schema
            .get(&self.table)
            .and_then(|table| table.relation_named(relation))
            .cloned()
        else {
            tracing::debug!(relation, table = %self.table, "unknown relation; skipping constraint");
            return;
        };

        let mut sub = self.scoped(rel.target_table.clone(), Cond::all());
        f(&mut sub);

        let mut select = Query::select();
        select
            .expr(Expr::val(1))
            .from(Alias::new(rel.target_table.as_str()));
        let correlation = Expr::col((
            Alias::new(rel.target_table.as_str()),
            Alias::new(rel.foreign_field.as_str()),
        ))
        .equals((
            Alias::new(self.table.as_str()),
            Alias::new(rel.local_field.as_str()),
        ));
        let mut outer = Cond::all().add(correlation);
        if sub.has_conditions {
            outer = outer.add(sub.cond);
        }
        select.cond_where(outer);

        self.push(Expr::exists(select));
    }

    fn order_by(&mut self, column: &str, direction: SortDirection) {
        self.orders.push((column.to_string(), direction));
    }

    fn preload(&mut self, relation: &str, f: &mut dyn FnMut(&mut dyn QueryBuilder)) {
        let Some(rel) = self
            .schema
            .get(&self.table)
            .and_then(|table| table.relation_named(relation))
            .cloned()
        else {
            tracing::debug!(relation, table = %self.table, "unknown relation; skipping preload");
            return;
        };

        let index = match self.eager.iter().position(|load| load.relation == relation) {
            Some(index) => index,
            None => {
                let query = self.scoped(rel.target_table.clone(), Cond::all());
                self.eager.push(EagerLoad {
                    relation: relation.to_string(),
                    query,
                });
                self.eager.len() - 1
            }
        };
        f(&mut self.eager[index].query);
    }

    fn with_count(&mut self, relation: &str) {
        if !self.has_relation(relation) {
            tracing::debug!(relation, table = %self.table, "unknown relation; skipping count");
            return;
        }
        if !self.counts.iter().any(|name| name == relation) {
            self.counts.push(relation.to_string());
        }
    }

    fn soft_deletes(&mut self) -> Option<&mut dyn SoftDeletes> {
        if self.soft_delete_column().is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl SoftDeletes for SqlQuery {
    fn with_trashed(&mut self) {
        self.trashed = TrashedMode::With;
    }

    fn only_trashed(&mut self) {
        self.trashed = TrashedMode::Only;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_schema;

    fn query() -> SqlQuery {
        SqlQuery::new(test_schema(), "related_models")
    }

    #[test]
    fn empty_query_selects_everything() {
        let sql = query().to_sql();
        assert_eq!(sql, r#"SELECT * FROM "related_models""#);
    }

    #[test]
    fn predicates_and_combine_at_the_top_level() {
        let mut q = query();
        q.where_op(
            "related_models.name",
            FilterOperator::Equal,
            &FilterValue::from("a"),
        );
        q.where_op(
            "related_models.salary",
            FilterOperator::GreaterThan,
            &FilterValue::from(1000),
        );
        let sql = q.to_sql();
        assert!(sql.contains(r#""related_models"."name" = 'a' AND "related_models"."salary" > 1000"#), "{sql}");
    }

    #[test]
    fn group_predicates_or_combine() {
        let mut q = query();
        q.where_group(&mut |group| {
            group.where_op("name", FilterOperator::Equal, &FilterValue::from("a"));
            group.where_op("name", FilterOperator::Equal, &FilterValue::from("b"));
        });
        let sql = q.to_sql();
        assert!(sql.contains(r#""name" = 'a' OR "name" = 'b'"#), "{sql}");
    }

    #[test]
    fn empty_group_adds_nothing() {
        let mut q = query();
        q.where_group(&mut |_| {});
        assert!(!q.to_sql().contains("WHERE"));
    }

    #[test]
    fn relation_scoping_builds_a_correlated_exists() {
        let mut q = query();
        q.where_relation("nested_related_models", &mut |sub| {
            sub.where_op("name", FilterOperator::Equal, &FilterValue::from("x"));
        });
        let sql = q.to_sql();
        assert!(sql.contains("EXISTS"), "{sql}");
        assert!(
            sql.contains(
                r#""nested_related_models"."related_model_id" = "related_models"."id""#
            ),
            "{sql}"
        );
        assert!(sql.contains(r#""name" = 'x'"#), "{sql}");
    }

    #[test]
    fn relation_scoping_without_inner_predicates_keeps_only_the_correlation() {
        let mut q = query();
        q.where_relation("nested_related_models", &mut |_| {});
        let sql = q.to_sql();
        assert!(sql.contains("EXISTS"), "{sql}");
        assert!(
            sql.contains(
                r#""nested_related_models"."related_model_id" = "related_models"."id""#
            ),
            "{sql}"
        );
        assert!(!sql.contains("TRUE"), "{sql}");
    }

    #[test]
    fn unknown_relation_scoping_is_skipped() {
        let mut q = query();
        q.where_relation("unknown", &mut |sub| {
            sub.where_op("name", FilterOperator::Equal, &FilterValue::from("x"));
        });
        assert!(!q.to_sql().contains("WHERE"));
    }

    #[test]
    fn mysql_dialect_uses_backtick_quoting() {
        let mut q = SqlQuery::new(test_schema(), "related_models").with_dialect(Dialect::MySql);
        q.where_op("name", FilterOperator::Equal, &FilterValue::from("a"));
        assert!(q.to_sql().contains("`name` = 'a'"));
    }

    #[test]
    fn preloads_deduplicate_by_relation() {
        let mut q = query();
        q.preload("nested_related_models", &mut |_| {});
        q.preload("nested_related_models", &mut |_| {});
        assert_eq!(q.eager_loads().len(), 1);
        assert_eq!(q.eager_loads()[0].relation(), "nested_related_models");
    }

    #[test]
    fn counts_deduplicate_and_skip_unknown_relations() {
        let mut q = query();
        q.with_count("nested_related_models");
        q.with_count("nested_related_models");
        q.with_count("unknown");
        assert_eq!(q.counted_relations(), ["nested_related_models"]);
    }

    #[test]
    fn bound_values_render_inline() {
        let mut q = query();
        q.where_raw("LOWER(name) LIKE $1 ESCAPE '\\'", &["%a%".to_string()]);
        let sql = q.to_sql();
        assert!(sql.contains("LOWER(name) LIKE '%a%'"), "{sql}");
        assert!(!sql.contains("$1"), "placeholder must be substituted: {sql}");
    }

    #[test]
    fn orders_render_in_insertion_order() {
        let mut q = query();
        q.order_by("name", SortDirection::Ascending);
        q.order_by("related_models.id", SortDirection::Descending);
        let sql = q.to_sql();
        assert!(
            sql.contains(r#"ORDER BY "name" ASC, "related_models"."id" DESC"#),
            "{sql}"
        );
    }
}
