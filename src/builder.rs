//! The allow-list query decorator.
//!
//! [`ApiQuery`] wraps any [`QueryBuilder`] together with a parsed
//! [`QueryRequest`] and applies requested filters, sorts and includes after
//! validating them against explicit allow-lists. Nothing touches the wrapped
//! builder unless a declaration permits it.

use std::collections::HashSet;

use crate::error::QueryError;
use crate::filters::AllowedFilter;
use crate::includes::AllowedInclude;
use crate::query::QueryBuilder;
use crate::request::QueryRequest;
use crate::sorts::AllowedSort;

/// A filter allow-list entry: either a bare name (shorthand for a partial
/// filter on that column) or a full [`AllowedFilter`] declaration.
pub enum FilterInput {
    Name(String),
    Spec(AllowedFilter),
}

impl FilterInput {
    fn resolve(self) -> AllowedFilter {
        match self {
            FilterInput::Name(name) => AllowedFilter::partial(&name),
            FilterInput::Spec(filter) => filter,
        }
    }
}

impl From<&str> for FilterInput {
    fn from(name: &str) -> Self {
        FilterInput::Name(name.to_string())
    }
}

impl From<String> for FilterInput {
    fn from(name: String) -> Self {
        FilterInput::Name(name)
    }
}

impl From<AllowedFilter> for FilterInput {
    fn from(filter: AllowedFilter) -> Self {
        FilterInput::Spec(filter)
    }
}

/// A sort allow-list entry: a bare name (shorthand for a field sort, leading
/// `-` setting the default direction) or a full [`AllowedSort`].
pub enum SortInput {
    Name(String),
    Spec(AllowedSort),
}

impl SortInput {
    fn resolve(self) -> AllowedSort {
        match self {
            SortInput::Name(name) => AllowedSort::field(&name),
            SortInput::Spec(sort) => sort,
        }
    }
}

impl From<&str> for SortInput {
    fn from(name: &str) -> Self {
        SortInput::Name(name.to_string())
    }
}

impl From<String> for SortInput {
    fn from(name: String) -> Self {
        SortInput::Name(name)
    }
}

impl From<AllowedSort> for SortInput {
    fn from(sort: AllowedSort) -> Self {
        SortInput::Spec(sort)
    }
}

/// An include allow-list entry. A bare name ending with the configured count
/// suffix declares a count include; any other bare name expands into the
/// relation path's prefix chain (see [`AllowedInclude::relationship`]).
/// `Specs` accepts a pre-expanded list.
pub enum IncludeInput {
    Name(String),
    Spec(AllowedInclude),
    Specs(Vec<AllowedInclude>),
}

impl From<&str> for IncludeInput {
    fn from(name: &str) -> Self {
        IncludeInput::Name(name.to_string())
    }
}

impl From<String> for IncludeInput {
    fn from(name: String) -> Self {
        IncludeInput::Name(name)
    }
}

impl From<AllowedInclude> for IncludeInput {
    fn from(include: AllowedInclude) -> Self {
        IncludeInput::Spec(include)
    }
}

impl From<Vec<AllowedInclude>> for IncludeInput {
    fn from(includes: Vec<AllowedInclude>) -> Self {
        IncludeInput::Specs(includes)
    }
}

/// Allow-list decorator around a query builder.
#[derive(Debug)]
pub struct ApiQuery<Q: QueryBuilder> {
    query: Q,
    request: QueryRequest,
}

impl<Q: QueryBuilder> ApiQuery<Q> {
    pub fn new(query: Q, request: QueryRequest) -> Self {
        Self { query, request }
    }

    /// Swap the request snapshot, e.g. to reuse a prepared builder.
    pub fn set_request(mut self, request: QueryRequest) -> Self {
        self.request = request;
        self
    }

    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Q {
        &mut self.query
    }

    pub fn into_query(self) -> Q {
        self.query
    }

    /// Declare the allowed filters and apply the requested ones.
    ///
    /// Requested names outside the allow-list fail with
    /// [`QueryError::InvalidFilterQuery`] unless disabled in configuration,
    /// in which case they are ignored. Declarations apply in allow-list
    /// order; a declaration absent from the request still fires when it
    /// carries a default value.
    pub fn allowed_filters<I>(mut self, filters: I) -> Result<Self, QueryError>
    where
        I: IntoIterator,
        I::Item: Into<FilterInput>,
    {
        let allowed: Vec<AllowedFilter> = filters
            .into_iter()
            .map(|input| input.into().resolve())
            .collect();
        let requested = self.request.filters();

        if !self.request.config().disable_invalid_filter_query_exception {
            let names: Vec<String> = allowed.iter().map(|f| f.name().to_string()).collect();
            let unknown: Vec<String> = requested
                .keys()
                .filter(|name| !names.contains(*name))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(QueryError::InvalidFilterQuery {
                    unknown,
                    allowed: names,
                });
            }
        }

        for filter in &allowed {
            if let Some(value) = requested.get(filter.name()) {
                filter.filter(&mut self.query, value);
            } else if filter.has_default() {
                filter.filter(&mut self.query, filter.default_value());
            }
        }
        Ok(self)
    }

    /// Declare the allowed sorts and apply the requested ones, in request
    /// order. A leading `-` on a requested token means descending and is
    /// stripped before matching.
    pub fn allowed_sorts<I>(mut self, sorts: I) -> Result<Self, QueryError>
    where
        I: IntoIterator,
        I::Item: Into<SortInput>,
    {
        let allowed: Vec<AllowedSort> = sorts
            .into_iter()
            .map(|input| input.into().resolve())
            .collect();

        let requested: Vec<(String, bool)> = self
            .request
            .sorts()
            .into_iter()
            .map(|token| match token.strip_prefix('-') {
                Some(rest) => (rest.to_string(), true),
                None => (token, false),
            })
            .collect();

        if !self.request.config().disable_invalid_sort_query_exception {
            let names: Vec<String> = allowed.iter().map(|s| s.name().to_string()).collect();
            let unknown: Vec<String> = requested
                .iter()
                .map(|(name, _)| name)
                .filter(|name| !names.contains(*name))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(QueryError::InvalidSortQuery {
                    unknown,
                    allowed: names,
                });
            }
        }

        for (name, descending) in &requested {
            if let Some(sort) = allowed.iter().find(|s| s.is_for_sort(name)) {
                sort.sort(&mut self.query, Some(*descending));
            }
        }
        Ok(self)
    }

    /// Apply fallback sorts when the request carries none. Declared
    /// directions (leading `-` or [`AllowedSort::set_default_direction`])
    /// decide the order. Infallible: defaults are programmer input, not
    /// request input.
    ///
    /// [`AllowedSort::set_default_direction`]: crate::sorts::AllowedSort::set_default_direction
    pub fn default_sort<I>(mut self, sorts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<SortInput>,
    {
        if !self.request.sorts().is_empty() {
            return self;
        }

        for input in sorts {
            input.into().resolve().sort(&mut self.query, None);
        }
        self
    }

    /// Declare the allowed includes and apply the requested ones, in request
    /// order. Bare relation names expand into their prefix chain plus a
    /// count sibling; duplicate names keep the first declaration.
    pub fn allowed_includes<I>(mut self, includes: I) -> Result<Self, QueryError>
    where
        I: IntoIterator,
        I::Item: Into<IncludeInput>,
    {
        let count_suffix = self.request.config().count_suffix.clone();

        let mut allowed: Vec<AllowedInclude> = Vec::new();
        for input in includes {
            match input.into() {
                IncludeInput::Name(name) => {
                    if !count_suffix.is_empty() && name.ends_with(count_suffix.as_str()) {
                        allowed.push(AllowedInclude::count(&name, &count_suffix));
                    } else {
                        allowed.extend(AllowedInclude::relationship(&name, None, &count_suffix));
                    }
                }
                IncludeInput::Spec(include) => allowed.push(include),
                IncludeInput::Specs(list) => allowed.extend(list),
            }
        }
        let mut seen = HashSet::new();
        allowed.retain(|include| seen.insert(include.name().to_string()));

        let requested = self.request.includes();
        if !self.request.config().disable_invalid_includes_query_exception {
            let names: Vec<String> = allowed.iter().map(|i| i.name().to_string()).collect();
            let unknown: Vec<String> = requested
                .iter()
                .filter(|name| !names.contains(*name))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(QueryError::InvalidIncludeQuery {
                    unknown,
                    allowed: names,
                });
            }
        }

        for name in &requested {
            if let Some(include) = allowed.iter().find(|i| i.is_for_include(name)) {
                include.include(&mut self.query);
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqlQuery;
    use crate::config::ResolvedConfig;
    use crate::filters::{AllowedFilter, FilterOperator};
    use crate::request::QueryRequest;
    use crate::schema::test_schema;
    use serde_json::json;
    use std::sync::Arc;

    fn request(params: serde_json::Value) -> QueryRequest {
        QueryRequest::from_request(&params, Arc::new(ResolvedConfig::default()))
    }

    fn api_query(params: serde_json::Value) -> ApiQuery<SqlQuery> {
        ApiQuery::new(SqlQuery::new(test_schema(), "test_models"), request(params))
    }

    #[test]
    fn bare_filter_names_are_partial_filters() {
        let api = api_query(json!({"filter": {"name": "john"}}))
            .allowed_filters(["name"])
            .unwrap();
        let sql = api.query().to_sql();
        assert!(sql.contains("LOWER(test_models.name) LIKE '%john%'"), "{sql}");
    }

    #[test]
    fn unknown_filter_fails_with_both_name_lists() {
        let err = api_query(json!({"filter": {"secret": "x"}}))
            .allowed_filters(["name", "id"])
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidFilterQuery {
                unknown: vec!["secret".to_string()],
                allowed: vec!["name".to_string(), "id".to_string()],
            }
        );
    }

    #[test]
    fn unknown_filter_is_ignored_when_validation_is_disabled() {
        let config = ResolvedConfig {
            disable_invalid_filter_query_exception: true,
            ..ResolvedConfig::default()
        };
        let req = QueryRequest::from_request(
            &json!({"filter": {"secret": "x", "name": "john"}}),
            Arc::new(config),
        );
        let api = ApiQuery::new(SqlQuery::new(test_schema(), "test_models"), req)
            .allowed_filters(["name"])
            .unwrap();
        let sql = api.query().to_sql();
        assert!(sql.contains("'%john%'"), "{sql}");
        assert!(!sql.contains("secret"), "{sql}");
    }

    #[test]
    fn defaults_fire_only_for_unrequested_filters() {
        let api = api_query(json!({"filter": {"name": "john"}}))
            .allowed_filters([
                AllowedFilter::exact("name").set_default("default-name"),
                AllowedFilter::exact("status").set_default("active"),
            ])
            .unwrap();
        let sql = api.query().to_sql();
        assert!(sql.contains(r#""test_models"."name" = 'john'"#), "{sql}");
        assert!(sql.contains(r#""test_models"."status" = 'active'"#), "{sql}");
        assert!(!sql.contains("default-name"), "{sql}");
    }

    #[test]
    fn dynamic_operator_filter_round_trips_through_the_request() {
        let api = api_query(json!({"filter": {"salary": ">2000"}}))
            .allowed_filters([AllowedFilter::operator("salary", FilterOperator::Dynamic)])
            .unwrap();
        let sql = api.query().to_sql();
        assert!(sql.contains(r#""test_models"."salary" > '2000'"#), "{sql}");
    }

    #[test]
    fn sorts_apply_in_request_order_with_direction_override() {
        let api = api_query(json!({"sort": "-name,id"}))
            .allowed_sorts(["name", "id"])
            .unwrap();
        let sql = api.query().to_sql();
        assert!(sql.contains(r#"ORDER BY "name" DESC, "id" ASC"#), "{sql}");
    }

    #[test]
    fn unknown_sort_fails_with_both_name_lists() {
        let err = api_query(json!({"sort": "unknown"}))
            .allowed_sorts(["name"])
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidSortQuery {
                unknown: vec!["unknown".to_string()],
                allowed: vec!["name".to_string()],
            }
        );
    }

    #[test]
    fn default_sort_applies_only_without_requested_sorts() {
        let api = api_query(json!({})).default_sort(["-name"]);
        assert!(api.query().to_sql().contains(r#"ORDER BY "name" DESC"#));

        let api = api_query(json!({"sort": "id"}))
            .allowed_sorts(["id"])
            .unwrap()
            .default_sort(["-name"]);
        let sql = api.query().to_sql();
        assert!(sql.contains(r#"ORDER BY "id" ASC"#), "{sql}");
        assert!(!sql.contains("name"), "{sql}");
    }

    #[test]
    fn includes_expand_and_apply_in_request_order() {
        let api = api_query(json!({"include": "related_models"}))
            .allowed_includes(["related_models"])
            .unwrap();
        assert_eq!(api.query().eager_paths(), vec!["related_models"]);
    }

    #[test]
    fn nested_include_names_allow_their_prefixes() {
        let api = api_query(json!({"include": "related_models"}))
            .allowed_includes(["related_models.nested_related_models"])
            .unwrap();
        assert_eq!(api.query().eager_paths(), vec!["related_models"]);
    }

    #[test]
    fn count_suffixed_include_records_a_count() {
        let api = api_query(json!({"include": "related_modelsCount"}))
            .allowed_includes(["related_models"])
            .unwrap();
        assert_eq!(api.query().counted_relations(), ["related_models"]);
    }

    #[test]
    fn unknown_include_fails_with_expanded_name_list() {
        let err = api_query(json!({"include": "secret"}))
            .allowed_includes(["related_models"])
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidIncludeQuery {
                unknown: vec!["secret".to_string()],
                allowed: vec![
                    "related_models".to_string(),
                    "related_modelsCount".to_string(),
                ],
            }
        );
    }

    #[test]
    fn duplicate_include_declarations_keep_the_first() {
        let api = api_query(json!({"include": "related_models"}))
            .allowed_includes([
                IncludeInput::from("related_models"),
                IncludeInput::from(AllowedInclude::callback("related_models", |query, name| {
                    query.with_count(name);
                })),
            ])
            .unwrap();
        // The first (relationship) declaration wins over the callback.
        assert_eq!(api.query().eager_paths(), vec!["related_models"]);
        assert!(api.query().counted_relations().is_empty());
    }

    #[test]
    fn chaining_applies_every_capability() {
        let api = api_query(json!({
            "filter": {"name": "john"},
            "sort": "-name",
            "include": "related_models",
        }))
        .allowed_filters([FilterInput::from(AllowedFilter::exact("name"))])
        .unwrap()
        .allowed_sorts(["name"])
        .unwrap()
        .allowed_includes(["related_models"])
        .unwrap();

        let sql = api.query().to_sql();
        assert!(sql.contains(r#""test_models"."name" = 'john'"#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "name" DESC"#), "{sql}");
        assert_eq!(api.query().eager_paths(), vec!["related_models"]);
    }
}
