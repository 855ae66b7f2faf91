//! Recording executor for tests.
//!
//! `MockExecutor` never talks to a database. It records every statement in
//! order and answers with whatever the registered handlers return; statements
//! no handler claims succeed with no rows.

use crate::executor::{DriverError, Row, SqlExecutor};
use std::cell::RefCell;

type Handler = Box<dyn Fn(&str) -> Option<Result<Vec<Row>, DriverError>>>;

#[derive(Default)]
pub struct MockExecutor {
    statements: RefCell<Vec<String>>,
    handlers: Vec<Handler>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing `pattern` with `rows`
    #[must_use]
    pub fn respond_to(self, pattern: &str, rows: Vec<Row>) -> Self {
        let pattern = pattern.to_string();
        self.with_handler(move |sql| sql.contains(&pattern).then(|| Ok(rows.clone())))
    }

    /// Fail statements containing `pattern` with a driver error
    #[must_use]
    pub fn fail_on(self, pattern: &str, message: &str) -> Self {
        let pattern = pattern.to_string();
        let message = message.to_string();
        self.with_handler(move |sql| {
            sql.contains(&pattern)
                .then(|| Err(DriverError::Query(message.clone())))
        })
    }

    /// Register a custom handler; the first handler returning `Some` wins
    #[must_use]
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) -> Option<Result<Vec<Row>, DriverError>> + 'static,
    {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Every statement received so far, in order
    pub fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }

    pub fn clear(&self) {
        self.statements.borrow_mut().clear();
    }
}

impl SqlExecutor for MockExecutor {
    fn run(&self, sql: &str) -> Result<Vec<Row>, DriverError> {
        self.statements.borrow_mut().push(sql.to_string());
        self.handlers
            .iter()
            .find_map(|handler| handler(sql))
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Shorthand for a single-column row
pub fn row1(column: &str, value: &str) -> Row {
    Row::from_pairs(vec![(column, Some(value))])
}
