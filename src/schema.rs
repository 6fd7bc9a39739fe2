//! Declarative model metadata.
//!
//! The bundled sea-query backend needs to know which relations a table
//! declares and how they correlate, plus whether the table soft-deletes.
//! A [`Schema`] carries that metadata; it is typically built once at boot
//! (or deserialized from configuration) and shared behind an [`Arc`].
//!
//! [`Arc`]: std::sync::Arc

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named relation from one table to another, correlated on
/// `target.foreign_field = base.local_field`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub target_table: String,
    pub local_field: String,
    pub foreign_field: String,
}

impl Relation {
    pub fn new(name: &str, target_table: &str) -> Self {
        Self {
            name: name.to_string(),
            target_table: target_table.to_string(),
            local_field: "id".to_string(),
            foreign_field: "id".to_string(),
        }
    }

    /// Correlation key pair: the base table's column and the target table's
    /// column that must match.
    pub fn keys(mut self, local_field: &str, foreign_field: &str) -> Self {
        self.local_field = local_field.to_string();
        self.foreign_field = foreign_field.to_string();
        self
    }
}

/// A table with its relations and optional soft-delete column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    name: String,
    soft_delete_column: Option<String>,
    relations: BTreeMap<String, Relation>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            soft_delete_column: None,
            relations: BTreeMap::new(),
        }
    }

    /// Mark the table as soft-deleting via the given timestamp column.
    pub fn soft_delete(mut self, column: &str) -> Self {
        self.soft_delete_column = Some(column.to_string());
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.insert(relation.name.clone(), relation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn soft_delete_column(&self) -> Option<&str> {
        self.soft_delete_column.as_deref()
    }

    pub fn relation_named(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }
}

/// A set of tables keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    tables: BTreeMap<String, Table>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

/// Three-level schema used across the unit tests: a base table with soft
/// deletes, a related table, and a second level of nesting.
#[cfg(test)]
pub(crate) fn test_schema() -> std::sync::Arc<Schema> {
    std::sync::Arc::new(
        Schema::new()
            .table(
                Table::new("test_models")
                    .soft_delete("deleted_at")
                    .relation(
                        Relation::new("related_models", "related_models")
                            .keys("id", "test_model_id"),
                    ),
            )
            .table(Table::new("related_models").relation(
                Relation::new("nested_related_models", "nested_related_models")
                    .keys("id", "related_model_id"),
            ))
            .table(Table::new("nested_related_models")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relations_are_looked_up_by_name() {
        let schema = test_schema();
        let table = schema.get("test_models").unwrap();
        assert!(table.has_relation("related_models"));
        assert!(!table.has_relation("unknown"));

        let relation = table.relation_named("related_models").unwrap();
        assert_eq!(relation.target_table, "related_models");
        assert_eq!(relation.local_field, "id");
        assert_eq!(relation.foreign_field, "test_model_id");
    }

    #[test]
    fn schema_round_trips_through_serde() {
        let schema = Schema::new().table(
            Table::new("users")
                .soft_delete("deleted_at")
                .relation(Relation::new("posts", "posts").keys("id", "user_id")),
        );
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("users").unwrap().soft_delete_column(), Some("deleted_at"));
        assert!(back.get("users").unwrap().has_relation("posts"));
    }
}
