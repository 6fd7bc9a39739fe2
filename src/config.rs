//! Resolved configuration.
//!
//! Built once at boot and shared by reference afterwards. Delimiters are part
//! of the configuration and threaded through the request reader explicitly;
//! there is no process-wide mutable delimiter state, so concurrent requests
//! with different configurations are safe by construction.

use serde::{Deserialize, Serialize};

/// Request parameter names for each query capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterNames {
    pub include: String,
    pub filter: String,
    pub sort: String,
    pub fields: String,
    pub append: String,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            include: "include".to_string(),
            filter: "filter".to_string(),
            sort: "sort".to_string(),
            fields: "fields".to_string(),
            append: "append".to_string(),
        }
    }
}

/// Per-category array value delimiters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Delimiters {
    pub include: String,
    pub filter: String,
    pub sort: String,
    pub fields: String,
    pub append: String,
}

impl Delimiters {
    /// The same delimiter for every category.
    pub fn all(delimiter: &str) -> Self {
        Self {
            include: delimiter.to_string(),
            filter: delimiter.to_string(),
            sort: delimiter.to_string(),
            fields: delimiter.to_string(),
            append: delimiter.to_string(),
        }
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::all(",")
    }
}

/// Strategy for resolving relation names to table names when reading
/// `fields[relation]` groups. Conversion itself is the caller's concern;
/// the value is carried here so endpoint code can consult it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationTableNameStrategy {
    SnakeCase,
    CamelCase,
    #[default]
    None,
}

/// Resolved configuration controlling parameter names, delimiters, count
/// and exists suffixes, and validation behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolvedConfig {
    pub parameters: ParameterNames,
    pub delimiters: Delimiters,

    /// Relation counts are requested with the relation name plus this
    /// suffix, e.g. `include=postsCount`.
    pub count_suffix: String,

    /// Reserved for relation-exists annotations; not consumed by the count
    /// logic yet.
    pub exists_suffix: String,

    /// When set, an unknown requested filter is silently ignored instead of
    /// failing with [`QueryError::InvalidFilterQuery`].
    ///
    /// [`QueryError::InvalidFilterQuery`]: crate::QueryError::InvalidFilterQuery
    pub disable_invalid_filter_query_exception: bool,
    pub disable_invalid_sort_query_exception: bool,
    pub disable_invalid_includes_query_exception: bool,

    /// Naming-convention toggles for `fields[relation]` resolution. The
    /// conversion behavior belongs to the consuming application.
    pub convert_relation_names_to_snake_case_plural: bool,
    pub convert_relation_table_name_strategy: RelationTableNameStrategy,
    pub convert_field_names_to_snake_case: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            parameters: ParameterNames::default(),
            delimiters: Delimiters::default(),
            count_suffix: "Count".to_string(),
            exists_suffix: "Exists".to_string(),
            disable_invalid_filter_query_exception: false,
            disable_invalid_sort_query_exception: false,
            disable_invalid_includes_query_exception: false,
            convert_relation_names_to_snake_case_plural: false,
            convert_relation_table_name_strategy: RelationTableNameStrategy::None,
            convert_field_names_to_snake_case: false,
        }
    }
}
