//! Schema operations for migrations.
//!
//! Leaf modules turn logical descriptions into SQL text
//! ([`type_map`], [`quote`], [`statement`], [`naming`], [`column`]).
//! The remaining modules add DDL, introspection and version tracking
//! methods to [`PostgresAdapter`](crate::PostgresAdapter).

pub mod column;
pub mod introspect;
pub mod naming;
pub mod quote;
pub mod schema_manager;
pub mod state_table;
pub mod statement;
pub mod table;
pub mod type_map;

pub use column::{ColumnOptions, ColumnSpec};
pub use introspect::{ColumnInfo, IndexInfo, PrimaryKeyInfo};
pub use naming::{index_name, MAX_IDENTIFIER_LENGTH};
pub use quote::{quote_identifier, quote_table_name, DefaultValue};
pub use schema_manager::{ForeignKeyOptions, IndexOptions, IndexSpec, ReferentialAction};
pub use state_table::Version;
pub use statement::{QueryType, SqlBuilder};
pub use table::{PrimaryKeyOption, TableDefinition, TableOptions};
pub use type_map::{native_database_types, type_to_sql, LogicalType, NativeType, TypeOptions};
