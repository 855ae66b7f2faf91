//! Catalog lookups used to decide whether a DDL operation is needed.
//!
//! Missing tables and columns are normal outcomes here: lookups return
//! `false`, an empty list or `None` instead of failing.

use super::naming::index_name;
use super::quote::quote_table_name;
use super::schema_manager::IndexOptions;
use crate::adapter::PostgresAdapter;
use crate::error::{require, AdapterError, Result};
use crate::executor::{Row, SqlExecutor};
use std::collections::HashSet;

const LOAD_TABLES_SQL: &str =
    "SELECT schemaname, tablename FROM pg_tables WHERE schemaname = ANY (current_schemas(false))";

/// A non-primary index on a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
}

/// A column of a table's primary key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyInfo {
    pub name: String,
    /// Type as printed by `format_type`, e.g. `integer`
    pub sql_type: String,
}

/// Catalog description of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    /// Default expression as Postgres prints it, e.g. `nextval('users_id_seq'::regclass)`
    pub default: Option<String>,
}

impl<E: SqlExecutor> PostgresAdapter<E> {
    /// `'"schema"."table"'` for `to_regclass`, quoting each dotted part
    fn regclass_literal(&self, table: &str) -> String {
        self.quote_string(&quote_table_name(table))
    }

    fn load_tables(&mut self, reload: bool) -> Result<&HashSet<String>> {
        if reload || self.tables.is_none() {
            let mut tables = HashSet::new();
            for row in self.select_all(LOAD_TABLES_SQL)? {
                let Some(table) = row.get("tablename") else {
                    continue;
                };
                if let Some(schema) = row.get("schemaname") {
                    tables.insert(format!("{schema}.{table}"));
                }
                tables.insert(table.to_string());
            }
            self.tables = Some(tables);
        }
        Ok(self.tables.get_or_insert_with(HashSet::new))
    }

    /// Whether `name` is a table in the current schemas.
    ///
    /// Both `users` and `public.users` forms are recognised.
    ///
    /// The table list is cached until `reload` is set or a table-level DDL
    /// statement runs through this adapter.
    ///
    /// # Errors
    ///
    /// `Query` on driver failure.
    pub fn table_exists(&mut self, name: &str, reload: bool) -> Result<bool> {
        Ok(self.load_tables(reload)?.contains(name))
    }

    /// [`table_exists`](Self::table_exists) using the cached list
    ///
    /// # Errors
    ///
    /// `Query` on driver failure.
    pub fn has_table(&mut self, name: &str) -> Result<bool> {
        self.table_exists(name, false)
    }

    /// Whether the index [`add_index`](Self::add_index) would create for
    /// `columns` (or `options.name`) exists
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for empty names, `Query` on driver failure.
    pub fn has_index<S: AsRef<str>>(&self, table: &str, columns: &[S], options: &IndexOptions) -> Result<bool> {
        require(table, "table name")?;
        let name = match &options.name {
            Some(name) => name.clone(),
            None if columns.is_empty() => return Err(AdapterError::missing("column name")),
            None => index_name(table, columns),
        };
        Ok(self.indexes(table)?.iter().any(|idx| idx.name == name))
    }

    /// Non-primary indexes of `table`, ordered by name; empty when the table is missing
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name, `Query` on driver failure.
    pub fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>> {
        require(table, "table name")?;
        let sql = format!(
            "SELECT DISTINCT i.relname, d.indisunique \
             FROM pg_class t \
             INNER JOIN pg_index d ON t.oid = d.indrelid \
             INNER JOIN pg_class i ON d.indexrelid = i.oid \
             WHERE i.relkind = 'i' \
             AND d.indisprimary = 'f' \
             AND t.oid = to_regclass({}) \
             ORDER BY i.relname",
            self.regclass_literal(table)
        );
        Ok(self
            .select_all(&sql)?
            .iter()
            .filter_map(|row| {
                Some(IndexInfo {
                    name: row.get("relname")?.to_string(),
                    unique: row.get_bool("indisunique").unwrap_or(false),
                })
            })
            .collect())
    }

    /// Columns of the primary key of `table`; empty when the table is missing
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name, `Query` on driver failure.
    pub fn primary_keys(&self, table: &str) -> Result<Vec<PrimaryKeyInfo>> {
        require(table, "table name")?;
        let sql = format!(
            "SELECT pg_attribute.attname, \
             format_type(pg_attribute.atttypid, pg_attribute.atttypmod) AS format_type \
             FROM pg_index, pg_class, pg_attribute \
             WHERE pg_class.oid = to_regclass({}) \
             AND indrelid = pg_class.oid \
             AND pg_attribute.attrelid = pg_class.oid \
             AND pg_attribute.attnum = any(pg_index.indkey) \
             AND indisprimary",
            self.regclass_literal(table)
        );
        Ok(self
            .select_all(&sql)?
            .iter()
            .filter_map(|row| {
                Some(PrimaryKeyInfo {
                    name: row.get("attname")?.to_string(),
                    sql_type: row.get("format_type").unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    /// Type, nullability and default of one column; `None` when either the
    /// table or the column does not exist
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for empty names, `Query` on driver failure.
    pub fn column_info(&self, table: &str, column: &str) -> Result<Option<ColumnInfo>> {
        require(table, "table name")?;
        require(column, "column name")?;
        let sql = format!(
            "SELECT a.attname, format_type(a.atttypid, a.atttypmod) AS format_type, \
             pg_get_expr(d.adbin, d.adrelid) AS adsrc, a.attnotnull \
             FROM pg_attribute a LEFT JOIN pg_attrdef d \
             ON a.attrelid = d.adrelid AND a.attnum = d.adnum \
             WHERE a.attrelid = to_regclass({}) \
             AND a.attname = {} \
             AND a.attnum > 0 AND NOT a.attisdropped \
             ORDER BY a.attnum",
            self.regclass_literal(table),
            self.quote_string(column)
        );
        Ok(self.select_one(&sql)?.map(|row| column_info_from_row(column, &row)))
    }

    /// Primary key column and its owned sequence, e.g. `("id", "users_id_seq")`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name, `Query` on driver failure.
    pub fn pk_and_sequence_for(&self, table: &str) -> Result<Option<(String, String)>> {
        require(table, "table name")?;
        let sql = format!(
            "SELECT attr.attname, seq.relname \
             FROM pg_class seq, pg_attribute attr, pg_depend dep, pg_constraint cons \
             WHERE seq.oid = dep.objid \
             AND seq.relkind = 'S' \
             AND attr.attrelid = dep.refobjid \
             AND attr.attnum = dep.refobjsubid \
             AND attr.attrelid = cons.conrelid \
             AND attr.attnum = cons.conkey[1] \
             AND cons.contype = 'p' \
             AND dep.refobjid = to_regclass({})",
            self.regclass_literal(table)
        );
        Ok(self.select_one(&sql)?.and_then(|row| {
            Some((
                row.get("attname")?.to_string(),
                row.get("relname")?.to_string(),
            ))
        }))
    }
}

fn column_info_from_row(column: &str, row: &Row) -> ColumnInfo {
    ColumnInfo {
        name: row.get("attname").unwrap_or(column).to_string(),
        sql_type: row.get("format_type").unwrap_or_default().to_string(),
        nullable: !row.get_bool("attnotnull").unwrap_or(false),
        default: row.get("adsrc").map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::tests::adapter;
    use crate::test_helpers::{row1, MockExecutor};

    #[test]
    fn test_table_exists_uses_cache_until_reload() {
        let mock = MockExecutor::new().respond_to(
            "pg_tables",
            vec![row1("tablename", "users"), row1("tablename", "orders")],
        );
        let mut adapter = adapter(mock);

        assert!(adapter.table_exists("users", false).unwrap());
        assert!(!adapter.table_exists("invoices", false).unwrap());
        assert_eq!(adapter.executor().statements().len(), 1);

        assert!(adapter.table_exists("orders", true).unwrap());
        assert_eq!(adapter.executor().statements().len(), 2);
    }

    #[test]
    fn test_table_ddl_invalidates_cache() {
        let mock = MockExecutor::new().respond_to("pg_tables", vec![row1("tablename", "users")]);
        let mut adapter = adapter(mock);

        assert!(adapter.has_table("users").unwrap());
        adapter.drop_table("users").unwrap();
        adapter.has_table("users").unwrap();

        let loads = adapter
            .executor()
            .statements()
            .iter()
            .filter(|sql| sql.contains("pg_tables"))
            .count();
        assert_eq!(loads, 2);
    }

    #[test]
    fn test_indexes_and_has_index() {
        let mock = MockExecutor::new().respond_to(
            "pg_index",
            vec![
                Row::from_pairs(vec![("relname", Some("idx_users_email")), ("indisunique", Some("t"))]),
                Row::from_pairs(vec![("relname", Some("users_name_idx")), ("indisunique", Some("f"))]),
            ],
        );
        let adapter = adapter(mock);

        let indexes = adapter.indexes("users").unwrap();
        assert_eq!(
            indexes,
            vec![
                IndexInfo { name: "idx_users_email".into(), unique: true },
                IndexInfo { name: "users_name_idx".into(), unique: false },
            ]
        );
        assert!(adapter.executor().statements()[0].contains(r#"t.oid = to_regclass('"users"')"#));

        assert!(adapter.has_index("users", &["email"], &IndexOptions::new()).unwrap());
        assert!(!adapter.has_index("users", &["name"], &IndexOptions::new()).unwrap());
        assert!(adapter
            .has_index("users", &["name"], &IndexOptions::new().name("users_name_idx"))
            .unwrap());
    }

    #[test]
    fn test_schema_qualified_names_match_created_relations() {
        let mock = MockExecutor::new()
            .respond_to(
                "pg_tables",
                vec![Row::from_pairs(vec![
                    ("schemaname", Some("crm")),
                    ("tablename", Some("users")),
                ])],
            )
            .respond_to(
                "pg_index",
                vec![Row::from_pairs(vec![
                    ("relname", Some("idx_crm_users_email")),
                    ("indisunique", Some("f")),
                ])],
            );
        let mut adapter = adapter(mock);

        adapter
            .add_index("crm.users", &["email"], IndexOptions::new())
            .unwrap();
        assert!(adapter
            .has_index("crm.users", &["email"], &IndexOptions::new())
            .unwrap());
        assert!(adapter.has_table("crm.users").unwrap());
        assert!(adapter.has_table("users").unwrap());

        let statements = adapter.executor().statements();
        assert_eq!(
            statements[0],
            r#"CREATE INDEX "idx_crm_users_email" ON "crm"."users"("email")"#
        );
        assert!(statements[1].contains(r#"to_regclass('"crm"."users"')"#));
    }

    #[test]
    fn test_primary_keys() {
        let mock = MockExecutor::new().respond_to(
            "indisprimary",
            vec![Row::from_pairs(vec![("attname", Some("id")), ("format_type", Some("integer"))])],
        );
        let adapter = adapter(mock);
        assert_eq!(
            adapter.primary_keys("crm.users").unwrap(),
            vec![PrimaryKeyInfo { name: "id".into(), sql_type: "integer".into() }]
        );
        assert!(adapter.executor().statements()[0].contains(r#"to_regclass('"crm"."users"')"#));
    }

    #[test]
    fn test_column_info() {
        let mock = MockExecutor::new().respond_to(
            "'email'",
            vec![Row::from_pairs(vec![
                ("attname", Some("email")),
                ("format_type", Some("character varying(255)")),
                ("adsrc", None),
                ("attnotnull", Some("t")),
            ])],
        );
        let adapter = adapter(mock);

        let info = adapter.column_info("users", "email").unwrap().unwrap();
        assert_eq!(info.sql_type, "character varying(255)");
        assert!(!info.nullable);
        assert_eq!(info.default, None);
    }

    #[test]
    fn test_missing_column_is_none_not_error() {
        let adapter = adapter(MockExecutor::new());
        assert_eq!(adapter.column_info("users", "nope").unwrap(), None);
        assert_eq!(adapter.pk_and_sequence_for("users").unwrap(), None);
        assert!(adapter.column_info("", "nope").is_err());
    }
}
