//! Error types for the schema adapter.
//!
//! Errors fall into two categories. Usage errors are preconditions the caller
//! violated (an empty table name, an unknown column type, an index name that is
//! too long); they mean the migration itself needs fixing. Environment errors
//! come from outside the adapter (the driver rejected a statement, the
//! connection could not be opened, `pg_dump` failed) and may be worth retrying
//! or alerting on.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Which side of the boundary an [`AdapterError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller passed something invalid. Treat as a bug in the migration.
    Usage,
    /// The database, the network or an external tool failed.
    Environment,
}

/// Errors raised by [`PostgresAdapter`](crate::PostgresAdapter) operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A required parameter was missing or empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The logical column type is not in the native type map
    #[error("Unknown column type '{given}' for Postgres. Valid types are: {}", valid.join(", "))]
    UnknownType {
        given: String,
        valid: Vec<&'static str>,
    },

    /// An index name exceeds the identifier length limit
    #[error(
        "Index name '{name}' is {length} bytes, the Postgres limit is {limit}. \
         Use the `name` option to give this index a shorter name \
         (and pass the same name to remove_index)"
    )]
    InvalidIndexName {
        name: String,
        length: usize,
        limit: usize,
    },

    /// A low-level transaction primitive was used in the wrong state
    #[error("Transaction state error: {0}")]
    TransactionState(String),

    /// The driver rejected a statement, or a read-only helper got a write statement
    #[error("Error executing query:\n{sql}\n\nReason: {message}")]
    Query { sql: String, message: String },

    /// The connection descriptor is unusable or the connection could not be opened
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external command (e.g. `pg_dump`) failed
    #[error("Command '{program}' failed: {message}")]
    Command { program: String, message: String },
}

impl AdapterError {
    /// Create a query error for the given statement
    pub fn query(sql: impl Into<String>, message: impl Into<String>) -> Self {
        AdapterError::Query {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-argument error for a missing parameter
    pub fn missing(parameter: &str) -> Self {
        AdapterError::InvalidArgument(format!("Missing {parameter} parameter"))
    }

    /// Classify the error as a caller bug or an external failure.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            AdapterError::InvalidArgument(_)
            | AdapterError::UnknownType { .. }
            | AdapterError::InvalidIndexName { .. }
            | AdapterError::TransactionState(_) => ErrorCategory::Usage,
            AdapterError::Query { .. } | AdapterError::Config(_) | AdapterError::Command { .. } => {
                ErrorCategory::Environment
            }
        }
    }

    /// `true` when the error means the calling migration is wrong
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        self.category() == ErrorCategory::Usage
    }
}

/// Fail with [`AdapterError::InvalidArgument`] when `value` is empty.
pub(crate) fn require(value: &str, parameter: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AdapterError::missing(parameter));
    }
    Ok(())
}
