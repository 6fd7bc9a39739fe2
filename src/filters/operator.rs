//! Comparison-operator filtering, fixed or parsed from the value.

use crate::filters::exact::{is_relation_property, qualify_column, with_relation_constraint};
use crate::filters::{Filter, FilterOperator};
use crate::query::QueryBuilder;
use crate::value::FilterValue;

/// Compare with a fixed operator, or with [`FilterOperator::Dynamic`] parse
/// the operator from the leading characters of the value (`">2000"` means
/// `salary > 2000`). Array values are re-handled element-wise and
/// OR-combined inside one WHERE group. The relation-constraint branch takes
/// precedence over operator parsing.
pub struct FiltersOperator {
    add_relation_constraint: bool,
    operator: FilterOperator,
}

impl FiltersOperator {
    pub fn new(add_relation_constraint: bool, operator: FilterOperator) -> Self {
        Self {
            add_relation_constraint,
            operator,
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

        if let FilterValue::Array(items) = value {
            query.where_group(&mut |group| {
                for item in items {
                    self.handle_scoped(group, item, property, visited);
                }
            });
            return;
        }

        let mut operator = self.operator;
        let stripped;
        let mut effective = value;
        if operator == FilterOperator::Dynamic {
            let raw = value.to_value_string();
            operator = dynamic_filter_operator(&raw);
            stripped = FilterValue::String(strip_operator_prefix(&raw, operator));
            effective = &stripped;
        }

        query.where_op(&qualify_column(query, property), operator, effective);
    }
}

impl Filter for FiltersOperator {
    fn handle(&self, query: &mut dyn QueryBuilder, value: &FilterValue, property: &str) {
        let mut visited = Vec::new();
        self.handle_scoped(query, value, property, &mut visited);
    }
}

/// Scan all operator tokens in declaration order and keep the last one that
/// prefixes the value; the empty Dynamic sentinel never matches. Falls back
/// to equality. The last-wins tie-break makes `"<="` beat `"<"`.
fn dynamic_filter_operator(value: &str) -> FilterOperator {
    let mut operator = FilterOperator::Equal;
    for candidate in FilterOperator::ALL {
        if candidate != FilterOperator::Dynamic && value.starts_with(candidate.as_str()) {
            operator = candidate;
        }
    }
    operator
}

fn strip_operator_prefix(value: &str, operator: FilterOperator) -> String {
    match value.strip_prefix(operator.as_str()) {
        Some(rest) => rest.to_string(),
        None => value.to_string(),
    }
}
