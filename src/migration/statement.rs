//! Statement classification and a small SQL builder.
//!
//! [`QueryType`] decides what shape of result a statement produces.
//! [`SqlBuilder`] assembles DDL from a verb and validated parts so identifiers
//! are always quoted through [`quote_identifier`].

use super::quote::{quote_identifier, quote_table_name};
use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w*").unwrap());
static RETURNING_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\sRETURNING\s+"([^"]+)"$"#).unwrap());

/// Statement category derived from the leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Show,
    Insert,
    Update,
    Delete,
    Alter,
    Drop,
    Create,
    Rename,
    Set,
    Unknown,
}

impl QueryType {
    /// Classify `sql` by its first word, ignoring case and leading whitespace.
    pub fn of(sql: &str) -> Self {
        let lowered = sql.trim().to_lowercase();
        let word = LEADING_WORD
            .find(&lowered)
            .map(|m| m.as_str())
            .unwrap_or_default();
        match word {
            "select" => QueryType::Select,
            "show" => QueryType::Show,
            "insert" => QueryType::Insert,
            "update" => QueryType::Update,
            "delete" => QueryType::Delete,
            "alter" => QueryType::Alter,
            "drop" => QueryType::Drop,
            "create" => QueryType::Create,
            "rename" => QueryType::Rename,
            "set" => QueryType::Set,
            _ => QueryType::Unknown,
        }
    }

    /// Read statements return their rows
    pub fn is_read(self) -> bool {
        matches!(self, QueryType::Select | QueryType::Show)
    }
}

/// Column named by a trailing `RETURNING "<column>"` clause, if present.
///
/// A trailing `;` and whitespace are ignored.
pub fn returning_column(sql: &str) -> Option<&str> {
    let sql = sql.trim_end().trim_end_matches(';').trim_end();
    RETURNING_CLAUSE
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Builder for one SQL statement.
///
/// Parts are separated by single spaces unless appended with
/// [`append`](Self::append).
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    sql: String,
}

impl SqlBuilder {
    pub fn new(verb: &str) -> Self {
        Self {
            sql: verb.to_string(),
        }
    }

    fn space(&mut self) {
        if !self.sql.is_empty() && !self.sql.ends_with(' ') {
            self.sql.push(' ');
        }
    }

    /// Append a keyword or pre-rendered fragment after a space
    #[must_use]
    pub fn keyword(mut self, keyword: &str) -> Self {
        self.space();
        self.sql.push_str(keyword);
        self
    }

    /// Append a quoted identifier after a space
    #[must_use]
    pub fn ident(mut self, name: &str) -> Self {
        self.space();
        self.sql.push_str(&quote_identifier(name));
        self
    }

    /// Append a table name after a space, quoting each dotted part
    #[must_use]
    pub fn table(mut self, name: &str) -> Self {
        self.space();
        self.sql.push_str(&quote_table_name(name));
        self
    }

    /// Append `("a", "b")` after a space
    #[must_use]
    pub fn ident_list<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.space();
        self.sql.push_str(&paren_list(names));
        self
    }

    /// Append a fragment with no separating space
    #[must_use]
    pub fn append(mut self, fragment: &str) -> Self {
        self.sql.push_str(fragment);
        self
    }

    /// Append `keyword value` only when `value` is present
    #[must_use]
    pub fn keyword_opt(self, keyword: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.keyword(keyword).keyword(value),
            None => self,
        }
    }

    pub fn build(self) -> String {
        self.sql
    }
}

/// `("a", "b")`
pub fn paren_list<S: AsRef<str>>(names: &[S]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| quote_identifier(n.as_ref())).collect();
    format!("({})", quoted.join(", "))
}
