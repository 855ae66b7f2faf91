//! The Postgres adapter.
//!
//! [`PostgresAdapter`] owns the single driver connection, the transaction
//! state and the cached table list. Every statement the crate generates goes
//! through [`PostgresAdapter::execute`] (or one of its variants), which logs
//! it, classifies it and turns driver failures into [`AdapterError::Query`].
//!
//! DDL operations live in [`crate::migration`] as further `impl` blocks on the
//! adapter.

use crate::config::AdapterConfig;
use crate::connection;
use crate::error::{require, AdapterError, Result};
use crate::executor::{MayPostgresExecutor, Row, SqlExecutor};
use crate::migration::quote::{self, quote_identifier, DefaultValue};
use crate::migration::statement::{returning_column, QueryType, SqlBuilder};
use crate::transaction::{TransactionGuard, TransactionState};
use std::collections::HashSet;
use std::process::Command;

/// Log target for every statement sent to the driver
pub const SQL_LOG_TARGET: &str = "schemaguard::sql";

/// Result shape of [`PostgresAdapter::execute`]
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Rows of a `SELECT` or `SHOW`, in query column order
    Rows(Vec<Row>),
    /// A write statement succeeded
    Success,
    /// Value of the `RETURNING "<column>"` column from the first affected row
    Returning(Option<String>),
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success)
    }

    /// Rows of a read statement; empty for writes
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryOutcome::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }

    pub fn returned_value(&self) -> Option<&str> {
        match self {
            QueryOutcome::Returning(value) => value.as_deref(),
            _ => None,
        }
    }
}

/// Options for `CREATE DATABASE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
    pub owner: Option<String>,
    pub template: Option<String>,
    pub encoding: Option<String>,
    pub tablespace: Option<String>,
    pub connection_limit: Option<i32>,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            owner: None,
            template: None,
            encoding: Some("utf8".to_string()),
            tablespace: None,
            connection_limit: None,
        }
    }
}

impl DatabaseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    #[must_use]
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    #[must_use]
    pub fn tablespace(mut self, tablespace: impl Into<String>) -> Self {
        self.tablespace = Some(tablespace.into());
        self
    }

    #[must_use]
    pub fn connection_limit(mut self, limit: i32) -> Self {
        self.connection_limit = Some(limit);
        self
    }
}

/// Schema adapter over one Postgres connection.
///
/// Generic over the executor so tests can substitute a recording fake; in
/// production this is [`MayPostgresExecutor`].
pub struct PostgresAdapter<E: SqlExecutor = MayPostgresExecutor> {
    executor: E,
    transactions: TransactionGuard,
    config: AdapterConfig,
    pub(crate) tables: Option<HashSet<String>>,
}

impl PostgresAdapter<MayPostgresExecutor> {
    /// Open the connection described by `config`
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Config` if the DSN is incomplete or the
    /// connection cannot be established.
    pub fn connect(config: AdapterConfig) -> Result<Self> {
        let client = connection::connect(&config.database)?;
        Ok(Self::with_executor(MayPostgresExecutor::new(client), config))
    }
}

impl<E: SqlExecutor> PostgresAdapter<E> {
    pub fn with_executor(executor: E, config: AdapterConfig) -> Self {
        Self {
            executor,
            transactions: TransactionGuard::new(),
            config,
            tables: None,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn supports_migrations(&self) -> bool {
        true
    }

    /// Name of the connected database
    pub fn database_name(&self) -> &str {
        &self.config.database.database
    }

    /// Quote any scalar as a string literal (`5` becomes `'5'`)
    pub fn quote_literal(&self, value: &DefaultValue) -> String {
        quote::quote_literal(&self.executor, value)
    }

    pub fn quote_string(&self, value: &str) -> String {
        quote::quote_string(&self.executor, value)
    }

    // ----- Execution gateway -----

    fn run(&self, sql: &str) -> Result<Vec<Row>> {
        log::info!(target: SQL_LOG_TARGET, "{sql}");
        self.executor
            .run(sql)
            .map_err(|e| AdapterError::query(sql, e.message()))
    }

    /// Run one statement.
    ///
    /// `SELECT`/`SHOW` return their rows. Other statements return
    /// [`QueryOutcome::Success`], unless they end in `RETURNING "<column>"`,
    /// in which case that column of the first row is returned.
    ///
    /// Any statement other than a read drops the cached table list.
    ///
    /// # Errors
    ///
    /// `AdapterError::Query` with the statement text when the driver fails.
    pub fn execute(&mut self, sql: &str) -> Result<QueryOutcome> {
        let rows = self.run(sql)?;
        if QueryType::of(sql).is_read() {
            return Ok(QueryOutcome::Rows(rows));
        }
        self.tables = None;
        match returning_column(sql) {
            Some(column) => Ok(QueryOutcome::Returning(
                rows.first()
                    .and_then(|row| row.get(column))
                    .map(str::to_string),
            )),
            None => Ok(QueryOutcome::Success),
        }
    }

    /// Alias of [`execute`](Self::execute)
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn query(&mut self, sql: &str) -> Result<QueryOutcome> {
        self.execute(sql)
    }

    /// First row of a read statement, `None` if it returned nothing
    ///
    /// # Errors
    ///
    /// `AdapterError::Query` if `sql` is not a `SELECT`/`SHOW` (nothing is
    /// sent to the driver) or the driver fails.
    pub fn select_one(&self, sql: &str) -> Result<Option<Row>> {
        Ok(self.select_all(sql)?.into_iter().next())
    }

    /// All rows of a read statement
    ///
    /// # Errors
    ///
    /// Same as [`select_one`](Self::select_one).
    pub fn select_all(&self, sql: &str) -> Result<Vec<Row>> {
        if !QueryType::of(sql).is_read() {
            return Err(AdapterError::query(
                sql,
                "Only SELECT or SHOW statements are allowed here",
            ));
        }
        self.run(sql)
    }

    /// Run a `;`-separated batch as one round trip, without classification
    ///
    /// # Errors
    ///
    /// `AdapterError::Query` when the driver fails on any statement.
    pub fn multi_query(&mut self, sql: &str) -> Result<bool> {
        self.run(sql)?;
        self.tables = None;
        Ok(true)
    }

    /// Run a hand-written DDL statement
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty statement, otherwise see [`execute`](Self::execute).
    pub fn execute_ddl(&mut self, sql: &str) -> Result<bool> {
        require(sql, "sql")?;
        self.run(sql)?;
        self.tables = None;
        Ok(true)
    }

    /// Run a generated DDL statement that changes the set of tables
    pub(crate) fn execute_table_ddl(&mut self, sql: &str) -> Result<bool> {
        self.run(sql)?;
        self.tables = None;
        Ok(true)
    }

    /// Run a generated DDL statement that leaves the set of tables alone
    pub(crate) fn execute_schema_ddl(&self, sql: &str) -> Result<bool> {
        self.run(sql)?;
        Ok(true)
    }

    // ----- Transactions -----

    pub fn transaction_state(&self) -> TransactionState {
        self.transactions.state()
    }

    pub fn in_transaction(&self) -> bool {
        self.transactions.in_transaction()
    }

    /// Open a transaction unless one is already open
    ///
    /// # Errors
    ///
    /// `AdapterError::Query` if the driver rejects `BEGIN`.
    pub fn start_transaction(&mut self) -> Result<()> {
        if self.transactions.in_transaction() {
            log::debug!("start_transaction: already in a transaction");
            return Ok(());
        }
        self.transactions.begin(&self.executor)
    }

    /// Commit the open transaction, if any
    ///
    /// # Errors
    ///
    /// `AdapterError::Query` if the driver rejects `COMMIT`.
    pub fn commit_transaction(&mut self) -> Result<()> {
        if !self.transactions.in_transaction() {
            log::debug!("commit_transaction: no open transaction");
            return Ok(());
        }
        self.transactions.commit(&self.executor)
    }

    /// Roll back the open transaction, if any
    ///
    /// # Errors
    ///
    /// `AdapterError::Query` if the driver rejects `ROLLBACK`.
    pub fn rollback_transaction(&mut self) -> Result<()> {
        if !self.transactions.in_transaction() {
            log::debug!("rollback_transaction: no open transaction");
            return Ok(());
        }
        self.transactions.rollback(&self.executor)
    }

    /// Run `op` outside any open transaction.
    ///
    /// An open transaction is committed first and a new one is opened
    /// afterwards, also when `op` fails.
    fn outside_transaction<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let reopen = self.transactions.in_transaction();
        if reopen {
            log::debug!("committing open transaction early for a database-level statement");
            self.transactions.commit(&self.executor)?;
        }
        let result = op(self);
        if reopen {
            if let Err(reopen_err) = self.transactions.begin(&self.executor) {
                match result {
                    Ok(_) => return Err(reopen_err),
                    Err(err) => {
                        log::error!("could not reopen transaction after a failed statement: {reopen_err}");
                        return Err(err);
                    }
                }
            }
        }
        result
    }

    // ----- Database-level operations -----

    /// `CREATE DATABASE`.
    ///
    /// The statement cannot run inside a transaction block, so work pending
    /// in an open transaction is committed before it runs.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name, `Query` on driver failure.
    pub fn create_database(&mut self, name: &str, options: &DatabaseOptions) -> Result<bool> {
        require(name, "database name")?;

        let mut builder = SqlBuilder::new("CREATE DATABASE").ident(name);
        if let Some(owner) = &options.owner {
            builder = builder.keyword("OWNER =").ident(owner);
        }
        if let Some(template) = &options.template {
            builder = builder.keyword("TEMPLATE =").ident(template);
        }
        if let Some(encoding) = &options.encoding {
            builder = builder
                .keyword("ENCODING =")
                .keyword(&self.quote_string(encoding));
        }
        if let Some(tablespace) = &options.tablespace {
            builder = builder.keyword("TABLESPACE =").ident(tablespace);
        }
        if let Some(limit) = options.connection_limit {
            builder = builder.keyword(&format!("CONNECTION LIMIT = {limit}"));
        }
        let sql = builder.build();

        self.outside_transaction(|adapter| adapter.execute_schema_ddl(&sql))
    }

    /// Whether a database called `name` exists on the server
    ///
    /// # Errors
    ///
    /// `Query` on driver failure.
    pub fn database_exists(&self, name: &str) -> Result<bool> {
        let sql = format!(
            "SELECT datname FROM pg_database WHERE datname = {}",
            self.quote_string(name)
        );
        Ok(self
            .select_one(&sql)?
            .is_some_and(|row| row.get("datname") == Some(name)))
    }

    /// `DROP DATABASE`; `false` when there is no such database
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name, `Query` on driver failure.
    pub fn drop_database(&mut self, name: &str) -> Result<bool> {
        require(name, "database name")?;
        if !self.database_exists(name)? {
            return Ok(false);
        }
        let sql = SqlBuilder::new("DROP DATABASE IF EXISTS").ident(name).build();
        self.outside_transaction(|adapter| adapter.execute_schema_ddl(&sql))
    }

    /// Write a schema-only dump of the connected database to `path` with `pg_dump`
    ///
    /// # Errors
    ///
    /// `AdapterError::Command` if `pg_dump` cannot be started or exits non-zero.
    pub fn dump_schema(&self, path: &str) -> Result<()> {
        require(path, "output file")?;
        let dsn = &self.config.database;
        let port = dsn.port_or_default().to_string();
        let args = [
            "-U",
            dsn.user.as_str(),
            "-Fp",
            "-s",
            "-f",
            path,
            dsn.database.as_str(),
            "--host",
            dsn.host.as_str(),
            "--port",
            port.as_str(),
        ];
        log::info!("pg_dump {}", args.join(" "));

        let output = Command::new("pg_dump")
            .args(args)
            .env("PGPASSWORD", &dsn.password)
            .output()
            .map_err(|e| AdapterError::Command {
                program: "pg_dump".to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AdapterError::Command {
                program: "pg_dump".to_string(),
                message: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }

    /// Double-quoted identifier, exposed for hand-written SQL
    pub fn identifier(&self, name: &str) -> String {
        quote_identifier(name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Dsn;
    use crate::error::ErrorCategory;
    use crate::executor::DriverError;
    use crate::test_helpers::{row1, MockExecutor};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    pub(crate) fn test_config() -> AdapterConfig {
        AdapterConfig::new(Dsn {
            host: "localhost".to_string(),
            port: None,
            database: "app_test".to_string(),
            user: "postgres".to_string(),
            password: "secret".to_string(),
        })
    }

    pub(crate) fn adapter(mock: MockExecutor) -> PostgresAdapter<MockExecutor> {
        PostgresAdapter::with_executor(mock, test_config())
    }

    #[test]
    fn test_read_statements_return_rows() {
        let mock = MockExecutor::new().respond_to("SELECT", vec![row1("n", "1"), row1("n", "2")]);
        let mut adapter = adapter(mock);

        let outcome = adapter.execute("  select n from t").unwrap();
        let rows = outcome.into_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("n"), Some("2"));
    }

    #[test]
    fn test_write_statements_return_success() {
        let mut adapter = adapter(MockExecutor::new());
        assert_eq!(
            adapter.execute("UPDATE t SET a = 1").unwrap(),
            QueryOutcome::Success
        );
        assert!(adapter.query("DELETE FROM t").unwrap().is_success());
    }

    #[test]
    fn test_returning_clause_yields_value() {
        let mock = MockExecutor::new().respond_to("RETURNING", vec![row1("id", "42")]);
        let mut adapter = adapter(mock);

        let outcome = adapter
            .execute(r#"INSERT INTO "users" ("name") VALUES ('a') RETURNING "id""#)
            .unwrap();
        assert_eq!(outcome.returned_value(), Some("42"));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_driver_failure_becomes_query_error() {
        let mock = MockExecutor::new().fail_on("broken", "syntax error at or near \"broken\"");
        let mut adapter = adapter(mock);

        let err = adapter.execute("SELECT broken").unwrap_err();
        match &err {
            AdapterError::Query { sql, message } => {
                assert_eq!(sql, "SELECT broken");
                assert!(message.contains("syntax error"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.category(), ErrorCategory::Environment);
    }

    #[test]
    fn test_select_one_rejects_writes_before_the_driver() {
        let adapter = adapter(MockExecutor::new());
        let err = adapter.select_one("DELETE FROM users").unwrap_err();
        assert!(matches!(err, AdapterError::Query { .. }));
        assert!(adapter.executor().statements().is_empty());

        assert_eq!(adapter.select_one("SELECT 1").unwrap(), None);
    }

    #[test]
    fn test_guarded_transactions_are_idempotent() {
        let mut adapter = adapter(MockExecutor::new());

        adapter.commit_transaction().unwrap();
        adapter.rollback_transaction().unwrap();
        assert_eq!(adapter.transaction_state(), TransactionState::Idle);

        adapter.start_transaction().unwrap();
        adapter.start_transaction().unwrap();
        assert_eq!(adapter.transaction_state(), TransactionState::InTransaction);

        adapter.commit_transaction().unwrap();
        assert_eq!(adapter.executor().statements(), vec!["BEGIN", "COMMIT"]);
    }

    #[test]
    fn test_create_database_commits_then_reopens() {
        let mut adapter = adapter(MockExecutor::new());
        adapter.start_transaction().unwrap();
        adapter.executor().clear();

        assert!(adapter
            .create_database("reports", &DatabaseOptions::new().owner("app"))
            .unwrap());
        assert_eq!(
            adapter.executor().statements(),
            vec![
                "COMMIT",
                r#"CREATE DATABASE "reports" OWNER = "app" ENCODING = 'utf8'"#,
                "BEGIN",
            ]
        );
        assert!(adapter.in_transaction());
    }

    #[test]
    fn test_create_database_reopens_transaction_on_failure() {
        let mock = MockExecutor::new().fail_on("CREATE DATABASE", "permission denied");
        let mut adapter = adapter(mock);
        adapter.start_transaction().unwrap();

        let err = adapter
            .create_database("reports", &DatabaseOptions::new())
            .unwrap_err();
        assert!(matches!(err, AdapterError::Query { .. }));
        assert!(adapter.in_transaction());
    }

    #[test]
    fn test_failed_reopen_keeps_the_statement_error() {
        let begins = Rc::new(Cell::new(0));
        let counter = Rc::clone(&begins);
        let mock = MockExecutor::new()
            .fail_on("CREATE DATABASE", "permission denied to create database")
            .with_handler(move |sql| {
                if sql != "BEGIN" {
                    return None;
                }
                counter.set(counter.get() + 1);
                (counter.get() > 1).then(|| Err(DriverError::Query("connection reset".into())))
            });
        let mut adapter = adapter(mock);
        adapter.start_transaction().unwrap();

        let err = adapter
            .create_database("reports", &DatabaseOptions::new())
            .unwrap_err();
        match err {
            AdapterError::Query { sql, message } => {
                assert!(sql.starts_with("CREATE DATABASE"));
                assert!(message.contains("permission denied"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(begins.get(), 2);
    }

    #[test]
    fn test_raw_ddl_through_execute_refreshes_table_cache() {
        let created = Rc::new(RefCell::new(Vec::<String>::new()));
        let store = Rc::clone(&created);
        let mock = MockExecutor::new().with_handler(move |sql| {
            if sql.starts_with("CREATE TABLE") {
                store.borrow_mut().push("audit_log".to_string());
                Some(Ok(Vec::new()))
            } else if sql.contains("pg_tables") {
                Some(Ok(store.borrow().iter().map(|t| row1("tablename", t)).collect()))
            } else {
                None
            }
        });
        let mut adapter = adapter(mock);

        assert!(!adapter.has_table("audit_log").unwrap());
        adapter
            .execute("CREATE TABLE audit_log (id integer)")
            .unwrap();
        assert!(adapter.has_table("audit_log").unwrap());

        // reads keep the cache
        adapter.execute("SELECT 1").unwrap();
        adapter.has_table("audit_log").unwrap();
        let loads = adapter
            .executor()
            .statements()
            .iter()
            .filter(|sql| sql.contains("pg_tables"))
            .count();
        assert_eq!(loads, 2);
        assert_eq!(created.borrow().len(), 1);
    }

    #[test]
    fn test_create_database_options_outside_transaction() {
        let mut adapter = adapter(MockExecutor::new());
        let options = DatabaseOptions::new()
            .template("template0")
            .encoding("latin1")
            .tablespace("fast")
            .connection_limit(10);
        adapter.create_database("reports", &options).unwrap();
        assert_eq!(
            adapter.executor().statements(),
            vec![
                r#"CREATE DATABASE "reports" TEMPLATE = "template0" ENCODING = 'latin1' TABLESPACE = "fast" CONNECTION LIMIT = 10"#
            ]
        );
    }

    #[test]
    fn test_drop_database() {
        let mock = MockExecutor::new().respond_to("'old_db'", vec![row1("datname", "old_db")]);
        let mut adapter = adapter(mock);

        assert!(!adapter.drop_database("missing").unwrap());
        assert!(adapter.drop_database("old_db").unwrap());

        let statements = adapter.executor().statements();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[2], r#"DROP DATABASE IF EXISTS "old_db""#);
    }

    #[test]
    fn test_execute_ddl_requires_sql() {
        let mut adapter = adapter(MockExecutor::new());
        assert!(adapter.execute_ddl("  ").unwrap_err().is_usage_error());
        assert!(adapter.execute_ddl("CREATE SCHEMA crm").unwrap());
    }

    #[test]
    fn test_misc_accessors() {
        let adapter = adapter(MockExecutor::new());
        assert!(adapter.supports_migrations());
        assert_eq!(adapter.database_name(), "app_test");
        assert_eq!(adapter.quote_literal(&DefaultValue::Int(3)), "'3'");
        assert_eq!(adapter.quote_string("it's"), "'it''s'");
        assert_eq!(adapter.identifier("users"), "\"users\"");
    }
}
