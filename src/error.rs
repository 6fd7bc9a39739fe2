//! Query translation error types.

use thiserror::Error;

/// Errors raised while resolving request parameters against an allow-list.
///
/// The allow-list variants carry the complete unknown-name and allowed-name
/// lists so a boundary can render a full diagnostic rather than the first
/// mismatch only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error(
        "Requested filter(s) `{}` are not allowed. Allowed filter(s) are `{}`.",
        .unknown.join(", "),
        .allowed.join(", ")
    )]
    InvalidFilterQuery {
        unknown: Vec<String>,
        allowed: Vec<String>,
    },

    #[error(
        "Requested sort(s) `{}` are not allowed. Allowed sort(s) are `{}`.",
        .unknown.join(", "),
        .allowed.join(", ")
    )]
    InvalidSortQuery {
        unknown: Vec<String>,
        allowed: Vec<String>,
    },

    #[error(
        "Requested include(s) `{}` are not allowed. Allowed include(s) are `{}`.",
        .unknown.join(", "),
        .allowed.join(", ")
    )]
    InvalidIncludeQuery {
        unknown: Vec<String>,
        allowed: Vec<String>,
    },

    /// Raised by filter callbacks when a value fails a type expectation.
    /// A convention for callback authors; the core never raises it itself.
    #[error("Filter value `{0}` is invalid.")]
    InvalidFilterValue(String),

    /// Raised when parsing a sort direction string that is neither `asc`
    /// nor `desc`. Programmer error rather than request-time input error.
    #[error("Invalid sort direction `{0}`, expected `asc` or `desc`.")]
    InvalidDirection(String),
}

impl QueryError {
    /// HTTP status class a boundary should map this error to.
    pub fn status(&self) -> u16 {
        match self {
            QueryError::InvalidFilterQuery { .. }
            | QueryError::InvalidSortQuery { .. }
            | QueryError::InvalidIncludeQuery { .. }
            | QueryError::InvalidFilterValue(_) => 400,
            QueryError::InvalidDirection(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_error_lists_all_names() {
        let err = QueryError::InvalidFilterQuery {
            unknown: vec!["name".into(), "email".into()],
            allowed: vec!["id".into()],
        };
        assert_eq!(
            err.to_string(),
            "Requested filter(s) `name, email` are not allowed. Allowed filter(s) are `id`."
        );
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn direction_error_is_not_a_client_error() {
        assert_eq!(QueryError::InvalidDirection("sideways".into()).status(), 500);
    }
}
