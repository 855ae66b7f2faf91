//! Column specifications and their SQL fragments.

use super::quote::{column_default_sql, quote_identifier, DefaultValue};
use super::type_map::{LogicalType, TypeOptions};
use crate::error::{require, Result};
use crate::executor::SqlExecutor;

/// Options for a column in `add_column`, `change_column` or a table definition
///
/// `None` fields are "not specified", which is different from an explicit
/// value: `null: None` leaves nullability alone, `null: Some(true)` drops a
/// `NOT NULL` constraint in `change_column`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnOptions {
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub null: Option<bool>,
    pub default: Option<DefaultValue>,
    /// Use the `serial` family instead of the plain integer type
    pub auto_increment: bool,
    /// Include the column in the table's `PRIMARY KEY` (table definitions only)
    pub primary_key: bool,
}

impl ColumnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    #[must_use]
    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    #[must_use]
    pub fn null(mut self, nullable: bool) -> Self {
        self.null = Some(nullable);
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn type_options(&self) -> TypeOptions {
        TypeOptions {
            limit: self.limit,
            precision: self.precision,
            scale: self.scale,
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub logical_type: LogicalType,
    pub options: ColumnOptions,
}

impl ColumnSpec {
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name, `UnknownType` for an unmapped type.
    pub fn new(name: &str, logical_type: &str, options: ColumnOptions) -> Result<Self> {
        require(name, "column name")?;
        require(logical_type, "type")?;
        Ok(Self {
            name: name.to_string(),
            logical_type: logical_type.parse()?,
            options,
        })
    }

    /// `"name" type [DEFAULT x] [NOT NULL]`
    ///
    /// # Errors
    ///
    /// Propagates type-mapping errors.
    pub fn to_sql<E: SqlExecutor + ?Sized>(&self, executor: &E) -> Result<String> {
        Ok(format!(
            "{} {}{}",
            quote_identifier(&self.name),
            native_type_sql(self.logical_type, &self.options)?,
            column_options_sql(executor, &self.options)
        ))
    }
}

/// Native type, switching integer types to their `serial` form for auto-increment columns
pub(crate) fn native_type_sql(logical_type: LogicalType, options: &ColumnOptions) -> Result<String> {
    if options.auto_increment {
        let serial = match logical_type {
            LogicalType::Integer | LogicalType::MediumInteger => Some("serial"),
            LogicalType::BigInteger => Some("bigserial"),
            LogicalType::SmallInteger | LogicalType::TinyInteger => Some("smallserial"),
            _ => None,
        };
        if let Some(serial) = serial {
            return Ok(serial.to_string());
        }
    }
    logical_type.to_sql(&options.type_options())
}

/// Trailing ` DEFAULT ... NOT NULL` for a new column
pub(crate) fn column_options_sql<E: SqlExecutor + ?Sized>(
    executor: &E,
    options: &ColumnOptions,
) -> String {
    let mut sql = String::new();
    if let Some(default) = options
        .default
        .as_ref()
        .and_then(|value| column_default_sql(executor, value))
    {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default);
    }
    if options.null == Some(false) {
        sql.push_str(" NOT NULL");
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;
    use crate::test_helpers::MockExecutor;

    #[test]
    fn test_column_sql_with_options() {
        let mock = MockExecutor::new();
        let col = ColumnSpec::new(
            "status",
            "string",
            ColumnOptions::new().limit(20).default_value("draft").null(false),
        )
        .unwrap();
        assert_eq!(
            col.to_sql(&mock).unwrap(),
            r#""status" varchar(20) DEFAULT 'draft' NOT NULL"#
        );
    }

    #[test]
    fn test_integer_default_is_bare() {
        let mock = MockExecutor::new();
        let col = ColumnSpec::new("retries", "integer", ColumnOptions::new().default_value(3)).unwrap();
        assert_eq!(col.to_sql(&mock).unwrap(), r#""retries" integer DEFAULT 3"#);
    }

    #[test]
    fn test_boolean_default_and_nullable_column() {
        let mock = MockExecutor::new();
        let col = ColumnSpec::new(
            "active",
            "boolean",
            ColumnOptions::new().default_value(true).null(true),
        )
        .unwrap();
        assert_eq!(col.to_sql(&mock).unwrap(), r#""active" boolean DEFAULT '1'"#);
    }

    #[test]
    fn test_auto_increment_uses_serial_family() {
        let mock = MockExecutor::new();
        let col = ColumnSpec::new("id", "biginteger", ColumnOptions::new().auto_increment()).unwrap();
        assert_eq!(col.to_sql(&mock).unwrap(), r#""id" bigserial"#);

        let col = ColumnSpec::new("code", "string", ColumnOptions::new().auto_increment()).unwrap();
        assert_eq!(col.to_sql(&mock).unwrap(), r#""code" varchar(255)"#);
    }

    #[test]
    fn test_spec_validation() {
        assert!(matches!(
            ColumnSpec::new("", "string", ColumnOptions::new()),
            Err(AdapterError::InvalidArgument(_))
        ));
        assert!(matches!(
            ColumnSpec::new("name", "", ColumnOptions::new()),
            Err(AdapterError::InvalidArgument(_))
        ));
        assert!(matches!(
            ColumnSpec::new("name", "varchar", ColumnOptions::new()),
            Err(AdapterError::UnknownType { .. })
        ));
    }
}
