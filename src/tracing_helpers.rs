//! Span helpers for statement execution and transaction verbs.
//!
//! Only compiled with the `tracing` feature. Callers enter the returned span
//! for the duration of the driver call.

use tracing::{info_span, Span};

/// Longest statement prefix recorded on a span
const MAX_STATEMENT_LEN: usize = 256;

fn truncate(sql: &str) -> &str {
    if sql.len() <= MAX_STATEMENT_LEN {
        return sql;
    }
    let mut end = MAX_STATEMENT_LEN;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

pub fn execute_query_span(sql: &str) -> Span {
    info_span!("schemaguard.execute", db.system = "postgresql", db.statement = truncate(sql))
}

pub fn begin_transaction_span() -> Span {
    info_span!("schemaguard.transaction.begin")
}

pub fn commit_transaction_span() -> Span {
    info_span!("schemaguard.transaction.commit")
}

pub fn rollback_transaction_span() -> Span {
    info_span!("schemaguard.transaction.rollback")
}
