use crate::error::AdaptdbError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    TableNotFound {
        table: String,
    },
    ColumnNotFound {
        table: String,
        column: String,
    },
    /// The key-bound predicate cannot be served by the index's structure.
    /// Reported before any tuple access when strict predicates are on.
    UnsupportedKeyPredicate {
        index: String,
        reason: String,
    },
    InvalidQuery {
        reason: String,
    },
    InternalError(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::TableNotFound { table } => {
                write!(f, "table '{table}' not found")
            }
            QueryError::ColumnNotFound { table, column } => {
                write!(f, "column '{column}' not found in table '{table}'")
            }
            QueryError::UnsupportedKeyPredicate { index, reason } => {
                write!(f, "index '{index}' cannot serve key predicate: {reason}")
            }
            QueryError::InvalidQuery { reason } => write!(f, "invalid query: {reason}"),
            QueryError::InternalError(msg) => write!(f, "internal query error: {msg}"),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<AdaptdbError> for QueryError {
    fn from(value: AdaptdbError) -> Self {
        match value {
            AdaptdbError::UnknownColumn { table, column } => {
                QueryError::ColumnNotFound { table, column }
            }
            AdaptdbError::NotFound { resource_id, .. } => QueryError::TableNotFound {
                table: resource_id,
            },
            AdaptdbError::Validation(reason) => QueryError::InvalidQuery { reason },
            AdaptdbError::InvalidConfig { message } => QueryError::InvalidQuery { reason: message },
            other => QueryError::InternalError(other.to_string()),
        }
    }
}
