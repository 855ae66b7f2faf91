//! Type mapping from logical column types to Postgres native type syntax.
//!
//! Migrations describe columns with framework-level types ("string",
//! "biginteger", "decimal"); this module turns them into the SQL Postgres
//! expects, applying limit, precision and scale.
//!
//! # Type Mapping
//!
//! - "primary_key" → `serial`
//! - "string" → `varchar(255)` (limit overridable)
//! - "text" / "tinytext" / "mediumtext" → `text`
//! - "integer" / "mediuminteger" → `integer`
//! - "tinyinteger" / "smallinteger" → `smallint`
//! - "biginteger" → `bigint`
//! - "float" → `float`
//! - "decimal" → `decimal(10, 0)` (precision and scale overridable)
//! - "datetime" → `timestamptz`, "timestamp" → `timestamp`
//! - "time" → `time`, "date" → `date`
//! - "binary" / "tinybinary" / "mediumbinary" / "longbinary" → `bytea`
//! - "boolean" → `boolean`, "tsvector" → `tsvector`
//! - "uuid" → `uuid`, "money" → `money`

use crate::error::{AdapterError, Result};
use std::fmt;
use std::str::FromStr;

/// Framework-level column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    PrimaryKey,
    String,
    Text,
    TinyText,
    MediumText,
    Integer,
    TinyInteger,
    SmallInteger,
    MediumInteger,
    BigInteger,
    Float,
    Decimal,
    DateTime,
    Timestamp,
    Time,
    Date,
    Binary,
    TinyBinary,
    MediumBinary,
    LongBinary,
    Boolean,
    TsVector,
    Uuid,
    Money,
}

/// Native Postgres type a logical type maps to, with its sizing defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeType {
    pub sql_name: &'static str,
    pub default_limit: Option<u32>,
    pub default_precision: Option<u32>,
    pub default_scale: Option<u32>,
}

impl NativeType {
    const fn plain(sql_name: &'static str) -> Self {
        Self {
            sql_name,
            default_limit: None,
            default_precision: None,
            default_scale: None,
        }
    }

    const fn with_limit(sql_name: &'static str, limit: u32) -> Self {
        Self {
            sql_name,
            default_limit: Some(limit),
            default_precision: None,
            default_scale: None,
        }
    }

    const fn with_precision(sql_name: &'static str, precision: u32, scale: u32) -> Self {
        Self {
            sql_name,
            default_limit: None,
            default_precision: Some(precision),
            default_scale: Some(scale),
        }
    }

    /// Integer types never take a parenthesized size
    pub fn is_integer_family(&self) -> bool {
        matches!(
            self.sql_name,
            "integer" | "smallint" | "bigint" | "serial" | "smallserial" | "bigserial"
        )
    }
}

static NATIVE_TYPES: [(LogicalType, NativeType); 24] = [
    (LogicalType::PrimaryKey, NativeType::plain("serial")),
    (LogicalType::String, NativeType::with_limit("varchar", 255)),
    (LogicalType::Text, NativeType::plain("text")),
    (LogicalType::TinyText, NativeType::plain("text")),
    (LogicalType::MediumText, NativeType::plain("text")),
    (LogicalType::Integer, NativeType::plain("integer")),
    (LogicalType::TinyInteger, NativeType::plain("smallint")),
    (LogicalType::SmallInteger, NativeType::plain("smallint")),
    (LogicalType::MediumInteger, NativeType::plain("integer")),
    (LogicalType::BigInteger, NativeType::plain("bigint")),
    (LogicalType::Float, NativeType::plain("float")),
    (LogicalType::Decimal, NativeType::with_precision("decimal", 10, 0)),
    (LogicalType::DateTime, NativeType::plain("timestamptz")),
    (LogicalType::Timestamp, NativeType::plain("timestamp")),
    (LogicalType::Time, NativeType::plain("time")),
    (LogicalType::Date, NativeType::plain("date")),
    (LogicalType::Binary, NativeType::plain("bytea")),
    (LogicalType::TinyBinary, NativeType::plain("bytea")),
    (LogicalType::MediumBinary, NativeType::plain("bytea")),
    (LogicalType::LongBinary, NativeType::plain("bytea")),
    (LogicalType::Boolean, NativeType::plain("boolean")),
    (LogicalType::TsVector, NativeType::plain("tsvector")),
    (LogicalType::Uuid, NativeType::plain("uuid")),
    (LogicalType::Money, NativeType::plain("money")),
];

/// The full logical → native map
pub fn native_database_types() -> &'static [(LogicalType, NativeType)] {
    &NATIVE_TYPES
}

impl LogicalType {
    /// Name used in migrations
    pub fn name(self) -> &'static str {
        match self {
            LogicalType::PrimaryKey => "primary_key",
            LogicalType::String => "string",
            LogicalType::Text => "text",
            LogicalType::TinyText => "tinytext",
            LogicalType::MediumText => "mediumtext",
            LogicalType::Integer => "integer",
            LogicalType::TinyInteger => "tinyinteger",
            LogicalType::SmallInteger => "smallinteger",
            LogicalType::MediumInteger => "mediuminteger",
            LogicalType::BigInteger => "biginteger",
            LogicalType::Float => "float",
            LogicalType::Decimal => "decimal",
            LogicalType::DateTime => "datetime",
            LogicalType::Timestamp => "timestamp",
            LogicalType::Time => "time",
            LogicalType::Date => "date",
            LogicalType::Binary => "binary",
            LogicalType::TinyBinary => "tinybinary",
            LogicalType::MediumBinary => "mediumbinary",
            LogicalType::LongBinary => "longbinary",
            LogicalType::Boolean => "boolean",
            LogicalType::TsVector => "tsvector",
            LogicalType::Uuid => "uuid",
            LogicalType::Money => "money",
        }
    }

    pub fn native(self) -> &'static NativeType {
        // NATIVE_TYPES is laid out in declaration order
        &NATIVE_TYPES[self as usize].1
    }

    /// Render the native SQL type for this logical type
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::InvalidArgument` for a decimal with a scale but no precision.
    pub fn to_sql(self, options: &TypeOptions) -> Result<String> {
        let native = self.native();
        let mut sql = native.sql_name.to_string();

        if self == LogicalType::Decimal {
            // limit is ignored for decimals
            let sizing = match (options.precision, options.scale) {
                (Some(precision), Some(scale)) => Some((precision, Some(scale))),
                (Some(precision), None) => Some((precision, None)),
                (None, Some(_)) => {
                    return Err(AdapterError::InvalidArgument(
                        "Error adding decimal column: precision cannot be empty if scale is specified"
                            .to_string(),
                    ));
                }
                (None, None) => native
                    .default_precision
                    .map(|precision| (precision, native.default_scale)),
            };
            match sizing {
                Some((precision, Some(scale))) => sql.push_str(&format!("({precision}, {scale})")),
                Some((precision, None)) => sql.push_str(&format!("({precision})")),
                None => {}
            }
            return Ok(sql);
        }

        if !native.is_integer_family() {
            if let Some(limit) = options.limit.or(native.default_limit) {
                sql.push_str(&format!("({limit})"));
            }
        }
        Ok(sql)
    }

    /// Names of every type a migration may use (excludes `primary_key`)
    pub fn valid_names() -> Vec<&'static str> {
        NATIVE_TYPES
            .iter()
            .map(|(logical, _)| *logical)
            .filter(|logical| *logical != LogicalType::PrimaryKey)
            .map(LogicalType::name)
            .collect()
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogicalType {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        NATIVE_TYPES
            .iter()
            .map(|(logical, _)| *logical)
            .find(|logical| logical.name() == s)
            .ok_or_else(|| AdapterError::UnknownType {
                given: s.to_string(),
                valid: LogicalType::valid_names(),
            })
    }
}

/// Sizing options for a column type.
///
/// `None` means "not specified" and lets the type's default apply; `Some(0)`
/// is an explicit zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeOptions {
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl TypeOptions {
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
}

/// Map a logical type name to Postgres SQL
///
/// # Errors
///
/// `UnknownType` if the name is not in the native map, `InvalidArgument` for
/// a decimal scale without precision.
pub fn type_to_sql(logical_type: &str, options: &TypeOptions) -> Result<String> {
    logical_type.parse::<LogicalType>()?.to_sql(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mapped_type_renders() {
        for (logical, _) in native_database_types() {
            let sql = type_to_sql(logical.name(), &TypeOptions::new()).unwrap();
            assert!(!sql.is_empty(), "{logical} rendered empty");
        }
    }

    #[test]
    fn test_unknown_type() {
        let err = type_to_sql("blob", &TypeOptions::new()).unwrap_err();
        match err {
            AdapterError::UnknownType { given, valid } => {
                assert_eq!(given, "blob");
                assert!(valid.contains(&"string"));
                assert!(!valid.contains(&"primary_key"));
            }
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn test_decimal_precision_and_scale() {
        let opts = TypeOptions::new().precision(10).scale(2);
        assert_eq!(type_to_sql("decimal", &opts).unwrap(), "decimal(10, 2)");

        let opts = TypeOptions::new().precision(8);
        assert_eq!(type_to_sql("decimal", &opts).unwrap(), "decimal(8)");

        let opts = TypeOptions::new().precision(8).scale(0);
        assert_eq!(type_to_sql("decimal", &opts).unwrap(), "decimal(8, 0)");

        assert_eq!(
            type_to_sql("decimal", &TypeOptions::new()).unwrap(),
            "decimal(10, 0)"
        );
    }

    #[test]
    fn test_decimal_scale_without_precision_fails() {
        let err = type_to_sql("decimal", &TypeOptions::new().scale(2)).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidArgument(_)));
    }

    #[test]
    fn test_decimal_ignores_limit() {
        let opts = TypeOptions::new().limit(5).precision(6).scale(2);
        assert_eq!(type_to_sql("decimal", &opts).unwrap(), "decimal(6, 2)");
    }

    #[test]
    fn test_string_limit_default_and_override() {
        assert_eq!(
            type_to_sql("string", &TypeOptions::new()).unwrap(),
            "varchar(255)"
        );
        assert_eq!(
            type_to_sql("string", &TypeOptions::new().limit(32)).unwrap(),
            "varchar(32)"
        );
    }

    #[test]
    fn test_integer_family_never_takes_limit() {
        let opts = TypeOptions::new().limit(11);
        assert_eq!(type_to_sql("integer", &opts).unwrap(), "integer");
        assert_eq!(type_to_sql("biginteger", &opts).unwrap(), "bigint");
        assert_eq!(type_to_sql("smallinteger", &opts).unwrap(), "smallint");
        assert_eq!(type_to_sql("primary_key", &opts).unwrap(), "serial");
    }

    #[test]
    fn test_limit_applies_to_other_types() {
        assert_eq!(
            type_to_sql("timestamp", &TypeOptions::new().limit(3)).unwrap(),
            "timestamp(3)"
        );
        assert_eq!(type_to_sql("text", &TypeOptions::new()).unwrap(), "text");
        assert_eq!(type_to_sql("datetime", &TypeOptions::new()).unwrap(), "timestamptz");
    }

    #[test]
    fn test_native_table_matches_declaration_order() {
        for (idx, (logical, _)) in native_database_types().iter().enumerate() {
            assert_eq!(*logical as usize, idx);
        }
    }

    #[test]
    fn test_name_round_trips_through_from_str() {
        for (logical, _) in native_database_types() {
            assert_eq!(logical.name().parse::<LogicalType>().unwrap(), *logical);
        }
    }
}
