//! Executor Module
//!
//! Provides the `SqlExecutor` trait, the only point of contact between the
//! adapter and the database driver.
//!
//! The adapter treats the driver as a black box: it hands over one SQL string,
//! gets back the rows the statement produced (possibly none) or a driver error.
//! Values are carried as text, the way the simple query protocol returns them,
//! so a read statement of any shape can be turned into ordered row mappings.

use may_postgres::{Client, SimpleQueryMessage, SimpleQueryRow};
use std::time::Instant;
use thiserror::Error;

#[cfg(feature = "tracing")]
use crate::tracing_helpers;

/// Driver-level error type
#[derive(Debug, Error)]
pub enum DriverError {
    /// `PostgreSQL` error from `may_postgres`
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] may_postgres::Error),
    /// Query execution error reported without a driver error value
    #[error("Query error: {0}")]
    Query(String),
    /// Other execution errors
    #[error("Execution error: {0}")]
    Other(String),
}

impl DriverError {
    /// The most specific message the driver gave us.
    ///
    /// For server-side errors this is the server's own message rather than the
    /// wrapped `db error: ...` display string.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            DriverError::Postgres(e) => match e.as_db_error() {
                Some(db) => db.message().to_string(),
                None => e.to_string(),
            },
            DriverError::Query(s) | DriverError::Other(s) => s.clone(),
        }
    }
}

/// One result row: column names in query order mapped to text values.
///
/// `NULL` is represented as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

impl Row {
    /// Create an empty row
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs, keeping their order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut row = Row::new();
        for (column, value) in pairs {
            row.push(column, value.map(Into::into));
        }
        row
    }

    fn from_simple(row: &SimpleQueryRow) -> Self {
        let mut out = Row::new();
        for (idx, column) in row.columns().iter().enumerate() {
            out.push(column.name(), row.get(idx).map(str::to_string));
        }
        out
    }

    /// Append a column to the row
    pub fn push(&mut self, column: impl Into<String>, value: Option<String>) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Value of `column`, or `None` when the column is absent or `NULL`.
    ///
    /// When a result has duplicate column names the first one wins.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values[idx].as_deref())
    }

    /// Value at a zero-based position
    #[must_use]
    pub fn value_at(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    /// Interpret a Postgres text boolean (`t`/`f`, `true`/`false`)
    #[must_use]
    pub fn get_bool(&self, column: &str) -> Option<bool> {
        match self.get(column)? {
            "t" | "true" | "TRUE" | "1" => Some(true),
            "f" | "false" | "FALSE" | "0" => Some(false),
            _ => None,
        }
    }

    /// Whether the row has a column with this name
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Column names in query order
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Iterate `(column, value)` in query order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(|v| v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Trait for running SQL against the database
///
/// Implementations exist for a live `may_postgres` client
/// ([`MayPostgresExecutor`]) and, for tests, a recording mock.
pub trait SqlExecutor {
    /// Run one SQL string (or a `;`-separated batch) and return every row it produced.
    ///
    /// Statements that produce no rows return an empty vector.
    ///
    /// # Errors
    ///
    /// Returns `DriverError` if the database rejects the statement or the
    /// connection fails.
    fn run(&self, sql: &str) -> Result<Vec<Row>, DriverError>;

    /// Escape a string for inclusion inside a single-quoted SQL literal.
    ///
    /// The default doubles embedded single quotes, which is correct with
    /// `standard_conforming_strings = on` (the Postgres default).
    fn escape_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }
}

impl<T: SqlExecutor + ?Sized> SqlExecutor for &T {
    fn run(&self, sql: &str) -> Result<Vec<Row>, DriverError> {
        (**self).run(sql)
    }

    fn escape_string(&self, value: &str) -> String {
        (**self).escape_string(value)
    }
}

impl<T: SqlExecutor + ?Sized> SqlExecutor for Box<T> {
    fn run(&self, sql: &str) -> Result<Vec<Row>, DriverError> {
        (**self).run(sql)
    }

    fn escape_string(&self, value: &str) -> String {
        (**self).escape_string(value)
    }
}

/// Implementation of `SqlExecutor` for `may_postgres::Client`
///
/// Uses the simple query protocol so that every value comes back as text and
/// DDL statements such as `CREATE DATABASE` run outside an implicit
/// transaction block.
pub struct MayPostgresExecutor {
    client: Client,
}

impl MayPostgresExecutor {
    /// Create a new executor from a `may_postgres::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl SqlExecutor for MayPostgresExecutor {
    fn run(&self, sql: &str) -> Result<Vec<Row>, DriverError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let start = Instant::now();
        let messages = self.client.simple_query(sql)?;

        let rows: Vec<Row> = messages
            .iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::Row(row) => Some(Row::from_simple(row)),
                _ => None,
            })
            .collect();

        log::debug!(
            "statement finished in {:?} ({} row(s))",
            start.elapsed(),
            rows.len()
        );
        Ok(rows)
    }
}
