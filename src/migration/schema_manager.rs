//! DDL operations on [`PostgresAdapter`].
//!
//! Each operation validates its names, builds one statement with
//! [`SqlBuilder`] and hands it to the execution gateway. Operations made of
//! several statements stop at the first failure; statements that already ran
//! stay applied unless the caller wrapped the call in a transaction.

use super::column::{native_type_sql, ColumnOptions, ColumnSpec};
use super::naming::{check_identifier_length, index_name};
use super::quote::split_table_name;
use super::statement::{paren_list, SqlBuilder};
use super::table::{TableDefinition, TableOptions};
use crate::adapter::PostgresAdapter;
use crate::error::{require, AdapterError, Result};
use crate::executor::SqlExecutor;
use std::fmt;

/// A validated index: the name fits the identifier limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexSpec {
    /// Build the index for `columns` of `table`, deriving the name unless
    /// `options.name` is given.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty table or column list,
    /// `InvalidIndexName` when the name exceeds the identifier limit.
    pub fn new<S: AsRef<str>>(table: &str, columns: &[S], options: &IndexOptions) -> Result<Self> {
        require(table, "table name")?;
        if columns.is_empty() {
            return Err(AdapterError::missing("column name"));
        }
        for column in columns {
            require(column.as_ref(), "column name")?;
        }

        let name = match &options.name {
            Some(name) => {
                require(name, "index name")?;
                name.clone()
            }
            None => index_name(table, columns),
        };
        check_identifier_length(&name)?;

        Ok(Self {
            name,
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            unique: options.unique,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub unique: bool,
    /// Explicit index name instead of `idx_{table}_{columns}`
    pub name: Option<String>,
}

impl IndexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// `ON UPDATE` / `ON DELETE` behaviour of a foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::NoAction => "NO ACTION",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKeyOptions {
    pub on_update: Option<ReferentialAction>,
    pub on_delete: Option<ReferentialAction>,
}

impl Default for ForeignKeyOptions {
    fn default() -> Self {
        Self {
            on_update: Some(ReferentialAction::Cascade),
            on_delete: None,
        }
    }
}

impl ForeignKeyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_update(mut self, action: Option<ReferentialAction>) -> Self {
        self.on_update = action;
        self
    }

    #[must_use]
    pub fn on_delete(mut self, action: Option<ReferentialAction>) -> Self {
        self.on_delete = action;
        self
    }
}

impl<E: SqlExecutor> PostgresAdapter<E> {
    /// Start a `CREATE TABLE` definition; see [`TableDefinition`]
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty table name.
    pub fn create_table(&mut self, name: &str, options: TableOptions) -> Result<TableDefinition<'_, E>> {
        TableDefinition::new(self, name, options)
    }

    /// `DROP TABLE IF EXISTS`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name, `Query` on driver failure.
    pub fn drop_table(&mut self, name: &str) -> Result<bool> {
        require(name, "table name")?;
        let sql = SqlBuilder::new("DROP TABLE IF EXISTS").table(name).build();
        self.execute_table_ddl(&sql)
    }

    /// Rename a table, and its `{table}_{pk}_seq` sequence when there is one
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for empty names, `Query` on driver failure.
    pub fn rename_table(&mut self, name: &str, new_name: &str) -> Result<bool> {
        require(name, "original table name")?;
        require(new_name, "new table name")?;

        let (schema, old_table) = split_table_name(name);
        let (_, new_table) = split_table_name(new_name);
        let sql = SqlBuilder::new("ALTER TABLE")
            .table(name)
            .keyword("RENAME TO")
            .ident(new_table)
            .build();
        self.execute_table_ddl(&sql)?;

        let renamed = match schema {
            Some(schema) => format!("{schema}.{new_table}"),
            None => new_table.to_string(),
        };
        match self.pk_and_sequence_for(&renamed)? {
            Some((pk, sequence)) if sequence == format!("{old_table}_{pk}_seq") => {
                let qualified = match schema {
                    Some(schema) => format!("{schema}.{sequence}"),
                    None => sequence,
                };
                let sql = SqlBuilder::new("ALTER SEQUENCE")
                    .table(&qualified)
                    .keyword("RENAME TO")
                    .ident(&format!("{new_table}_{pk}_seq"))
                    .build();
                self.execute_schema_ddl(&sql)?;
            }
            Some((_, sequence)) => {
                log::debug!("rename_table: sequence {sequence} does not follow the table name, leaving it");
            }
            None => log::debug!("rename_table: no primary key sequence on {renamed}"),
        }
        Ok(true)
    }

    /// `ALTER TABLE .. ADD COLUMN`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for empty names, `UnknownType`, or `Query` on driver failure.
    pub fn add_column(
        &mut self,
        table: &str,
        column: &str,
        logical_type: &str,
        options: ColumnOptions,
    ) -> Result<bool> {
        require(table, "table name")?;
        let spec = ColumnSpec::new(column, logical_type, options)?;
        let sql = SqlBuilder::new("ALTER TABLE")
            .table(table)
            .keyword("ADD COLUMN")
            .keyword(&spec.to_sql(self.executor())?)
            .build();
        self.execute_schema_ddl(&sql)
    }

    /// # Errors
    ///
    /// `InvalidArgument` for empty names, `Query` on driver failure.
    pub fn remove_column(&mut self, table: &str, column: &str) -> Result<bool> {
        require(table, "table name")?;
        require(column, "column name")?;
        let sql = SqlBuilder::new("ALTER TABLE")
            .table(table)
            .keyword("DROP COLUMN")
            .ident(column)
            .build();
        self.execute_schema_ddl(&sql)
    }

    /// # Errors
    ///
    /// `InvalidArgument` for empty names, `Query` on driver failure.
    pub fn rename_column(&mut self, table: &str, column: &str, new_column: &str) -> Result<bool> {
        require(table, "table name")?;
        require(column, "original column name")?;
        require(new_column, "new column name")?;
        let sql = SqlBuilder::new("ALTER TABLE")
            .table(table)
            .keyword("RENAME COLUMN")
            .ident(column)
            .keyword("TO")
            .ident(new_column)
            .build();
        self.execute_schema_ddl(&sql)
    }

    /// Change a column's type, then its default, then its nullability.
    ///
    /// The default step runs only when `options.default` is set, the
    /// nullability step only when `options.null` is set. Making a column
    /// `NOT NULL` together with a non-null default first fills existing
    /// `NULL` rows with that default.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for empty names, `UnknownType`, or `Query` on the
    /// first failing statement.
    pub fn change_column(
        &mut self,
        table: &str,
        column: &str,
        logical_type: &str,
        options: ColumnOptions,
    ) -> Result<bool> {
        require(table, "table name")?;
        let spec = ColumnSpec::new(column, logical_type, options)?;

        let sql = SqlBuilder::new("ALTER TABLE")
            .table(table)
            .keyword("ALTER COLUMN")
            .ident(column)
            .keyword("TYPE")
            .keyword(&native_type_sql(spec.logical_type, &spec.options)?)
            .build();
        self.execute_schema_ddl(&sql)?;

        if let Some(default) = &spec.options.default {
            let sql = SqlBuilder::new("ALTER TABLE")
                .table(table)
                .keyword("ALTER COLUMN")
                .ident(column)
                .keyword("SET DEFAULT")
                .keyword(&self.quote_literal(default))
                .build();
            self.execute_schema_ddl(&sql)?;
        }

        if let Some(nullable) = spec.options.null {
            let backfill = spec.options.default.as_ref().filter(|d| !d.is_null());
            if let (false, Some(default)) = (nullable, backfill) {
                let sql = SqlBuilder::new("UPDATE")
                    .table(table)
                    .keyword("SET")
                    .ident(column)
                    .append("=")
                    .append(&self.quote_literal(default))
                    .keyword("WHERE")
                    .ident(column)
                    .keyword("IS NULL")
                    .build();
                self.execute(&sql)?;
            }
            let sql = SqlBuilder::new("ALTER TABLE")
                .table(table)
                .keyword("ALTER")
                .ident(column)
                .keyword(if nullable { "DROP NOT NULL" } else { "SET NOT NULL" })
                .build();
            self.execute_schema_ddl(&sql)?;
        }
        Ok(true)
    }

    /// `CREATE [UNIQUE] INDEX`.
    ///
    /// The name is checked against the identifier limit before anything is
    /// sent to the database.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `InvalidIndexName`, or `Query` on driver failure.
    pub fn add_index<S: AsRef<str>>(&mut self, table: &str, columns: &[S], options: IndexOptions) -> Result<bool> {
        let index = IndexSpec::new(table, columns, &options)?;
        let verb = if index.unique { "CREATE UNIQUE INDEX" } else { "CREATE INDEX" };
        let sql = SqlBuilder::new(verb)
            .ident(&index.name)
            .keyword("ON")
            .table(table)
            .append(&paren_list(&index.columns))
            .build();
        self.execute_schema_ddl(&sql)
    }

    /// `DROP INDEX` for the index [`add_index`](Self::add_index) would have created
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `InvalidIndexName`, or `Query` on driver failure.
    pub fn remove_index<S: AsRef<str>>(&mut self, table: &str, columns: &[S], options: IndexOptions) -> Result<bool> {
        let index = IndexSpec::new(table, columns, &options)?;
        // The index lives in the schema of its table
        let qualified = match split_table_name(table) {
            (Some(schema), _) => format!("{schema}.{}", index.name),
            (None, _) => index.name,
        };
        let sql = SqlBuilder::new("DROP INDEX").table(&qualified).build();
        self.execute_schema_ddl(&sql)
    }

    /// Add two `datetime NOT NULL` columns
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for empty names, `Query` on driver failure.
    pub fn add_timestamps(&mut self, table: &str, created_column: &str, updated_column: &str) -> Result<bool> {
        require(table, "table name")?;
        require(created_column, "created at column name")?;
        require(updated_column, "updated at column name")?;
        let created = self.add_column(table, created_column, "datetime", ColumnOptions::new().null(false))?;
        let updated = self.add_column(table, updated_column, "datetime", ColumnOptions::new().null(false))?;
        Ok(created && updated)
    }

    /// # Errors
    ///
    /// `InvalidArgument` for empty names, `Query` on driver failure.
    pub fn remove_timestamps(&mut self, table: &str, created_column: &str, updated_column: &str) -> Result<bool> {
        require(table, "table name")?;
        require(created_column, "created at column name")?;
        require(updated_column, "updated at column name")?;
        let created = self.remove_column(table, created_column)?;
        let updated = self.remove_column(table, updated_column)?;
        Ok(created && updated)
    }

    /// `ALTER TABLE .. ADD FOREIGN KEY`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for empty names, `Query` on driver failure.
    pub fn foreign_key(
        &mut self,
        from_table: &str,
        from_column: &str,
        to_table: &str,
        to_column: &str,
        options: ForeignKeyOptions,
    ) -> Result<bool> {
        require(from_table, "from table")?;
        require(from_column, "from column")?;
        require(to_table, "to table")?;
        require(to_column, "to column")?;

        let on_update = options.on_update.map(|a| a.to_string());
        let on_delete = options.on_delete.map(|a| a.to_string());
        let sql = SqlBuilder::new("ALTER TABLE")
            .table(from_table)
            .keyword("ADD FOREIGN KEY")
            .ident_list(&[from_column])
            .keyword("REFERENCES")
            .table(to_table)
            .ident_list(&[to_column])
            .keyword_opt("ON UPDATE", on_update.as_deref())
            .keyword_opt("ON DELETE", on_delete.as_deref())
            .build();
        self.execute_schema_ddl(&sql)
    }

    /// Foreign key from `{table}_id` style columns to `{table}.id`.
    ///
    /// The target table is everything before the last `_` of `from_column`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `from_column` has no `_`; otherwise see
    /// [`foreign_key`](Self::foreign_key).
    pub fn quick_foreign_key(&mut self, from_table: &str, from_column: &str, options: ForeignKeyOptions) -> Result<bool> {
        let to_table = match from_column.rfind('_') {
            Some(idx) if idx > 0 => &from_column[..idx],
            _ => {
                return Err(AdapterError::InvalidArgument(format!(
                    "Cannot derive a foreign key from column '{from_column}', expected <table>_id"
                )))
            }
        };
        self.foreign_key(from_table, from_column, to_table, "id", options)
    }
}
