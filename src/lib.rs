//! # Schemaguard
//!
//! PostgreSQL schema adapter for migration runners: maps logical column
//! types to Postgres types, builds quoted DDL, tracks the connection's
//! transaction state and records applied migration versions.
//!
//! ```rust,no_run
//! use schemaguard::{AdapterConfig, ColumnOptions, PostgresAdapter, TableOptions};
//!
//! # fn main() -> schemaguard::Result<()> {
//! let mut adapter = PostgresAdapter::connect(AdapterConfig::load()?)?;
//! adapter.create_schema_version_table()?;
//!
//! adapter.start_transaction()?;
//! let mut users = adapter.create_table("users", TableOptions::default())?;
//! users.column("email", "string", ColumnOptions::new().null(false))?;
//! users.finish()?;
//! adapter.set_current_version("20240101000000")?;
//! adapter.commit_transaction()?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod migration;
#[cfg(feature = "tracing")]
pub mod tracing_helpers;
pub mod transaction;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use adapter::{DatabaseOptions, PostgresAdapter, QueryOutcome};
pub use config::{AdapterConfig, Dsn};
pub use error::{AdapterError, ErrorCategory, Result};
pub use executor::{DriverError, MayPostgresExecutor, Row, SqlExecutor};
pub use migration::{
    ColumnInfo, ColumnOptions, ColumnSpec, DefaultValue, ForeignKeyOptions, IndexInfo,
    IndexOptions, IndexSpec, LogicalType, PrimaryKeyInfo, PrimaryKeyOption, ReferentialAction,
    TableDefinition, TableOptions, Version,
};
pub use transaction::TransactionState;
