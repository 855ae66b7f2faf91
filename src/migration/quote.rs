//! Identifier and literal quoting.
//!
//! Every identifier and value that ends up in generated SQL passes through
//! one of the functions here.

use crate::executor::SqlExecutor;
use std::fmt;

/// Wrap a table, column, index or database name in double quotes.
///
/// Embedded double quotes are doubled.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified table name, one identifier per dotted part.
///
/// `crm.users` becomes `"crm"."users"`.
pub fn quote_table_name(name: &str) -> String {
    name.split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split `schema.table` into its schema (if any) and bare table name
pub fn split_table_name(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, name),
    }
}

/// Default value for a column, tagged with its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl DefaultValue {
    /// Text form before any quoting.
    ///
    /// Booleans render as `1`/`0`; Postgres accepts both for `boolean` columns.
    fn raw(&self) -> Option<String> {
        match self {
            DefaultValue::Null => None,
            DefaultValue::Int(v) => Some(v.to_string()),
            DefaultValue::Float(v) => Some(v.to_string()),
            DefaultValue::Bool(v) => Some(if *v { "1" } else { "0" }.to_string()),
            DefaultValue::Text(v) => Some(v.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DefaultValue::Null)
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw() {
            Some(raw) => f.write_str(&raw),
            None => f.write_str("NULL"),
        }
    }
}

impl From<i64> for DefaultValue {
    fn from(v: i64) -> Self {
        DefaultValue::Int(v)
    }
}

impl From<i32> for DefaultValue {
    fn from(v: i32) -> Self {
        DefaultValue::Int(i64::from(v))
    }
}

impl From<f64> for DefaultValue {
    fn from(v: f64) -> Self {
        DefaultValue::Float(v)
    }
}

impl From<bool> for DefaultValue {
    fn from(v: bool) -> Self {
        DefaultValue::Bool(v)
    }
}

impl From<&str> for DefaultValue {
    fn from(v: &str) -> Self {
        DefaultValue::Text(v.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(v: String) -> Self {
        DefaultValue::Text(v)
    }
}

/// Quote a value as a string literal regardless of its kind.
///
/// `5` becomes `'5'` and `true` becomes `'1'`; Postgres casts the literal to
/// the column type. `Null` renders as the bare keyword `NULL`.
pub fn quote_literal<E: SqlExecutor + ?Sized>(executor: &E, value: &DefaultValue) -> String {
    match value.raw() {
        Some(raw) => quote_string(executor, &raw),
        None => "NULL".to_string(),
    }
}

/// Quote arbitrary text as a string literal
pub fn quote_string<E: SqlExecutor + ?Sized>(executor: &E, value: &str) -> String {
    format!("'{}'", executor.escape_string(value))
}

/// `DEFAULT` clause value for a column definition.
///
/// Integers stay bare, everything else is quoted. `Null` produces no clause.
pub fn column_default_sql<E: SqlExecutor + ?Sized>(
    executor: &E,
    value: &DefaultValue,
) -> Option<String> {
    match value {
        DefaultValue::Null => None,
        DefaultValue::Int(v) => Some(v.to_string()),
        other => Some(quote_literal(executor, other)),
    }
}
