//! `CREATE TABLE` builder returned by
//! [`PostgresAdapter::create_table`](crate::PostgresAdapter::create_table).
//!
//! ```rust,no_run
//! # use schemaguard::{PostgresAdapter, ColumnOptions, TableOptions};
//! # fn run(adapter: &mut PostgresAdapter) -> schemaguard::Result<()> {
//! let mut users = adapter.create_table("users", TableOptions::default())?;
//! users
//!     .column("email", "string", ColumnOptions::new().null(false))?
//!     .column("age", "integer", ColumnOptions::new())?;
//! users.finish()?;
//! # Ok(())
//! # }
//! ```

use super::column::{ColumnOptions, ColumnSpec};
use super::quote::quote_table_name;
use super::statement::paren_list;
use super::type_map::LogicalType;
use crate::adapter::PostgresAdapter;
use crate::error::{require, AdapterError, Result};
use crate::executor::SqlExecutor;

/// How the table's surrogate primary key is generated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PrimaryKeyOption {
    /// `"id" serial` primary key
    #[default]
    Auto,
    /// A `serial` primary key with another column name
    Named(String),
    /// No generated key; mark columns with `primary_key` instead
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub id: PrimaryKeyOption,
    /// `CREATE TEMPORARY TABLE`
    pub temporary: bool,
    /// Drop an existing table of the same name first
    pub force: bool,
    /// Raw suffix appended after the column list, e.g. `WITH (fillfactor=70)`
    pub options: Option<String>,
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn id(mut self, id: PrimaryKeyOption) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn without_id(self) -> Self {
        self.id(PrimaryKeyOption::None)
    }

    #[must_use]
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    #[must_use]
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    #[must_use]
    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }
}

/// Columns collected for one `CREATE TABLE` statement.
///
/// Nothing is sent to the database until [`finish`](Self::finish).
pub struct TableDefinition<'a, E: SqlExecutor> {
    adapter: &'a mut PostgresAdapter<E>,
    name: String,
    options: TableOptions,
    columns: Vec<ColumnSpec>,
}

impl<'a, E: SqlExecutor> TableDefinition<'a, E> {
    pub(crate) fn new(
        adapter: &'a mut PostgresAdapter<E>,
        name: &str,
        options: TableOptions,
    ) -> Result<Self> {
        require(name, "table name")?;

        let mut columns = Vec::new();
        let id_column = match &options.id {
            PrimaryKeyOption::Auto => Some("id"),
            PrimaryKeyOption::Named(column) => Some(column.as_str()),
            PrimaryKeyOption::None => None,
        };
        if let Some(id_column) = id_column {
            require(id_column, "primary key column name")?;
            columns.push(ColumnSpec {
                name: id_column.to_string(),
                logical_type: LogicalType::Integer,
                options: ColumnOptions::new().auto_increment().primary_key(),
            });
        }

        Ok(Self {
            adapter,
            name: name.to_string(),
            options,
            columns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a column. A second column with an existing name is ignored.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for empty names, `UnknownType` for unmapped types.
    pub fn column(
        &mut self,
        name: &str,
        logical_type: &str,
        options: ColumnOptions,
    ) -> Result<&mut Self> {
        let spec = ColumnSpec::new(name, logical_type, options)?;
        if self.columns.iter().any(|c| c.name == spec.name) {
            log::debug!("table {}: column {} already defined, skipping", self.name, spec.name);
            return Ok(self);
        }
        self.columns.push(spec);
        Ok(self)
    }

    /// Render the `CREATE TABLE` statement without running it
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when no columns are defined; type-mapping errors.
    pub fn to_sql(&self) -> Result<String> {
        if self.columns.is_empty() {
            return Err(AdapterError::InvalidArgument(format!(
                "Table {} has no columns",
                self.name
            )));
        }

        let executor = self.adapter.executor();
        let mut parts = self
            .columns
            .iter()
            .map(|column| column.to_sql(executor))
            .collect::<Result<Vec<_>>>()?;

        let primary_keys: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.options.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        if !primary_keys.is_empty() {
            parts.push(format!("PRIMARY KEY {}", paren_list(&primary_keys)));
        }

        let temporary = if self.options.temporary { "TEMPORARY " } else { "" };
        let suffix = self
            .options
            .options
            .as_deref()
            .map(|opts| format!(" {opts}"))
            .unwrap_or_default();

        Ok(format!(
            "CREATE {temporary}TABLE {} (\n{}\n){suffix};",
            quote_table_name(&self.name),
            parts.join(",\n")
        ))
    }

    /// Create the table, dropping it first when `force` is set
    ///
    /// # Errors
    ///
    /// See [`to_sql`](Self::to_sql); `Query` on driver failure.
    pub fn finish(self) -> Result<bool> {
        let sql = self.to_sql()?;
        if self.options.force {
            self.adapter.drop_table(&self.name)?;
        }
        self.adapter.execute_table_ddl(&sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::tests::adapter;
    use crate::test_helpers::MockExecutor;

    #[test]
    fn test_default_table_has_serial_id() {
        let mut adapter = adapter(MockExecutor::new());
        let mut table = adapter.create_table("users", TableOptions::new()).unwrap();
        table
            .column("email", "string", ColumnOptions::new().null(false))
            .unwrap()
            .column("age", "integer", ColumnOptions::new().default_value(0))
            .unwrap();

        assert_eq!(
            table.to_sql().unwrap(),
            "CREATE TABLE \"users\" (\n\
             \"id\" serial,\n\
             \"email\" varchar(255) NOT NULL,\n\
             \"age\" integer DEFAULT 0,\n\
             PRIMARY KEY (\"id\")\n\
             );"
        );
    }

    #[test]
    fn test_named_id_and_extra_primary_key() {
        let mut adapter = adapter(MockExecutor::new());
        let mut table = adapter
            .create_table(
                "memberships",
                TableOptions::new().id(PrimaryKeyOption::Named("membership_id".into())),
            )
            .unwrap();
        table
            .column("tenant_id", "integer", ColumnOptions::new().primary_key())
            .unwrap();

        let sql = table.to_sql().unwrap();
        assert!(sql.starts_with("CREATE TABLE \"memberships\" (\n\"membership_id\" serial,"));
        assert!(sql.contains("PRIMARY KEY (\"membership_id\", \"tenant_id\")"));
    }

    #[test]
    fn test_duplicate_columns_are_ignored() {
        let mut adapter = adapter(MockExecutor::new());
        let mut table = adapter.create_table("tags", TableOptions::new()).unwrap();
        table
            .column("label", "string", ColumnOptions::new())
            .unwrap()
            .column("label", "text", ColumnOptions::new())
            .unwrap()
            .column("id", "uuid", ColumnOptions::new())
            .unwrap();

        let sql = table.to_sql().unwrap();
        assert_eq!(sql.matches("\"label\"").count(), 1);
        assert!(sql.contains("\"label\" varchar(255)"));
        assert!(!sql.contains("uuid"));
    }

    #[test]
    fn test_temporary_table_with_suffix_and_no_id() {
        let mut adapter = adapter(MockExecutor::new());
        let mut table = adapter
            .create_table(
                "scratch",
                TableOptions::new()
                    .without_id()
                    .temporary()
                    .options("ON COMMIT DROP"),
            )
            .unwrap();
        table.column("payload", "text", ColumnOptions::new()).unwrap();

        assert_eq!(
            table.to_sql().unwrap(),
            "CREATE TEMPORARY TABLE \"scratch\" (\n\"payload\" text\n) ON COMMIT DROP;"
        );
    }

    #[test]
    fn test_table_without_columns_is_rejected() {
        let mut adapter = adapter(MockExecutor::new());
        let table = adapter
            .create_table("empty", TableOptions::new().without_id())
            .unwrap();
        assert!(matches!(
            table.finish(),
            Err(AdapterError::InvalidArgument(_))
        ));
        assert!(adapter.executor().statements().is_empty());
    }

    #[test]
    fn test_force_drops_before_create() {
        let mut adapter = adapter(MockExecutor::new());
        let mut table = adapter
            .create_table("events", TableOptions::new().force())
            .unwrap();
        table.column("name", "string", ColumnOptions::new()).unwrap();
        assert!(table.finish().unwrap());

        let statements = adapter.executor().statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "DROP TABLE IF EXISTS \"events\"");
        assert!(statements[1].starts_with("CREATE TABLE \"events\""));
    }

    #[test]
    fn test_unknown_column_type_fails_early() {
        let mut adapter = adapter(MockExecutor::new());
        let mut table = adapter.create_table("t", TableOptions::new()).unwrap();
        assert!(matches!(
            table.column("c", "varchar", ColumnOptions::new()),
            Err(AdapterError::UnknownType { .. })
        ));
    }
}
