//! Vaglio
//!
//! Allow-listed translation of HTTP query parameters (`filter`, `sort`,
//! `include`, `fields`, `append`) into query-builder operations. Nothing from
//! a request reaches the wrapped builder unless an explicit declaration
//! permits it; unknown names fail with a [`QueryError`] naming both the
//! offending and the allowed entries.
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use vaglio::{
//!     AllowedFilter, ApiQuery, QueryRequest, ResolvedConfig, Relation, Schema, SqlQuery, Table,
//! };
//!
//! let schema = Arc::new(Schema::new().table(
//!     Table::new("users").relation(Relation::new("posts", "posts").keys("id", "user_id")),
//! ));
//! let request = QueryRequest::from_request(
//!     &json!({"filter": {"name": "jo"}, "sort": "-name", "include": "posts"}),
//!     Arc::new(ResolvedConfig::default()),
//! );
//!
//! let api = ApiQuery::new(SqlQuery::new(schema, "users"), request)
//!     .allowed_filters([AllowedFilter::partial("name")])?
//!     .allowed_sorts(["name"])?
//!     .allowed_includes(["posts"])?;
//! let sql = api.query().to_sql();
//! assert!(sql.contains("LIKE '%jo%'"));
//! # Ok::<(), vaglio::QueryError>(())
//! ```

pub mod backend;
pub mod builder;
pub mod config;
pub mod error;
pub mod filters;
pub mod includes;
pub mod query;
pub mod request;
pub mod schema;
pub mod sorts;
pub mod value;

pub use backend::{EagerLoad, SqlQuery};
pub use builder::{ApiQuery, FilterInput, IncludeInput, SortInput};
pub use config::{Delimiters, ParameterNames, RelationTableNameStrategy, ResolvedConfig};
pub use error::QueryError;
pub use filters::{AllowedFilter, Filter, FilterOperator};
pub use includes::{AllowedInclude, Include};
pub use query::{Dialect, QueryBuilder, SoftDeletes, SortDirection};
pub use request::{QueryRequest, RequestData, UNGROUPED_FIELDS_KEY};
pub use schema::{Relation, Schema, Table};
pub use sorts::{AllowedSort, Sort};
pub use value::FilterValue;
