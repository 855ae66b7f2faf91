//! Version tracking table.
//!
//! One row per applied migration, `{version varchar(255)}` with a unique
//! index and no `id` column. The table name comes from
//! [`AdapterConfig::schema_version_table`](crate::AdapterConfig).

use super::column::ColumnOptions;
use super::schema_manager::IndexOptions;
use super::statement::SqlBuilder;
use super::table::TableOptions;
use crate::adapter::PostgresAdapter;
use crate::error::{require, Result};
use crate::executor::SqlExecutor;
use chrono::Utc;
use std::fmt;

const VERSION_COLUMN: &str = "version";

/// Migration identifier, conventionally a UTC `YYYYMMDDHHMMSS` timestamp
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(String);

impl Version {
    /// # Errors
    ///
    /// `InvalidArgument` for an empty version.
    pub fn new(version: impl Into<String>) -> Result<Self> {
        let version = version.into();
        require(&version, "version")?;
        Ok(Self(version))
    }

    /// Timestamp version for the current UTC time
    pub fn now() -> Self {
        Self(Utc::now().format("%Y%m%d%H%M%S").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<E: SqlExecutor> PostgresAdapter<E> {
    pub fn schema_version_table_name(&self) -> &str {
        &self.config().schema_version_table
    }

    /// Create the version table and its unique index unless the table exists.
    ///
    /// Returns `true` when the table was created.
    ///
    /// # Errors
    ///
    /// `Query` on driver failure.
    pub fn create_schema_version_table(&mut self) -> Result<bool> {
        let table = self.schema_version_table_name().to_string();
        if self.table_exists(&table, true)? {
            return Ok(false);
        }

        log::info!("creating schema version table {table}");
        let mut definition = self.create_table(&table, TableOptions::new().without_id())?;
        definition.column(VERSION_COLUMN, "string", ColumnOptions::new())?;
        definition.finish()?;
        self.add_index(&table, &[VERSION_COLUMN], IndexOptions::new().unique())?;
        Ok(true)
    }

    /// Record `version` as applied
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty version, `Query` on driver failure
    /// (including a duplicate version).
    pub fn set_current_version(&mut self, version: impl AsRef<str>) -> Result<bool> {
        let version = version.as_ref();
        require(version, "version")?;
        let sql = SqlBuilder::new("INSERT INTO")
            .table(self.schema_version_table_name())
            .ident_list(&[VERSION_COLUMN])
            .keyword("VALUES")
            .keyword(&format!("({})", self.quote_string(version)))
            .build();
        Ok(self.execute(&sql)?.is_success())
    }

    /// Forget `version`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty version, `Query` on driver failure.
    pub fn remove_version(&mut self, version: impl AsRef<str>) -> Result<bool> {
        let version = version.as_ref();
        require(version, "version")?;
        let sql = SqlBuilder::new("DELETE FROM")
            .table(self.schema_version_table_name())
            .keyword("WHERE")
            .ident(VERSION_COLUMN)
            .keyword("=")
            .keyword(&self.quote_string(version))
            .build();
        Ok(self.execute(&sql)?.is_success())
    }

    /// Applied versions in ascending order
    ///
    /// # Errors
    ///
    /// `Query` on driver failure, e.g. when the table does not exist yet.
    pub fn applied_versions(&self) -> Result<Vec<String>> {
        let sql = SqlBuilder::new("SELECT")
            .ident(VERSION_COLUMN)
            .keyword("FROM")
            .table(self.schema_version_table_name())
            .keyword("ORDER BY")
            .ident(VERSION_COLUMN)
            .build();
        Ok(self
            .select_all(&sql)?
            .iter()
            .filter_map(|row| row.get(VERSION_COLUMN).map(str::to_string))
            .collect())
    }
}
