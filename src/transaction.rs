//! Transaction Module
//!
//! Tracks whether the adapter's single connection has an open transaction and
//! issues `BEGIN` / `COMMIT` / `ROLLBACK` against it.
//!
//! The primitives on [`TransactionGuard`] fail with
//! [`AdapterError::TransactionState`] when used in the wrong state. The
//! idempotent entry points migrations call (`start_transaction`,
//! `commit_transaction`, `rollback_transaction`) live on
//! [`PostgresAdapter`](crate::PostgresAdapter) and only reach these
//! primitives when the transition is legal.

use crate::error::{AdapterError, Result};
use crate::executor::SqlExecutor;

#[cfg(feature = "tracing")]
use crate::tracing_helpers;

/// Whether a transaction is open on the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    #[default]
    Idle,
    InTransaction,
}

impl TransactionState {
    /// Phrase used in misuse errors
    fn describe(self) -> &'static str {
        match self {
            TransactionState::Idle => "no transaction is open",
            TransactionState::InTransaction => "a transaction is already open",
        }
    }
}

/// Owner of the adapter's [`TransactionState`].
///
/// The state only changes after the driver accepted the statement.
#[derive(Debug, Default)]
pub struct TransactionGuard {
    state: TransactionState,
}

impl TransactionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn in_transaction(&self) -> bool {
        self.state == TransactionState::InTransaction
    }

    /// Issue `BEGIN`. Fails if a transaction is already open.
    ///
    /// # Errors
    ///
    /// `TransactionState` on misuse, `Query` if the driver rejects the statement.
    pub fn begin<E: SqlExecutor + ?Sized>(&mut self, executor: &E) -> Result<()> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::begin_transaction_span().entered();

        self.transition(
            executor,
            "BEGIN",
            TransactionState::Idle,
            TransactionState::InTransaction,
        )
    }

    /// Issue `COMMIT`. Fails if no transaction is open.
    ///
    /// # Errors
    ///
    /// `TransactionState` on misuse, `Query` if the driver rejects the statement.
    pub fn commit<E: SqlExecutor + ?Sized>(&mut self, executor: &E) -> Result<()> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::commit_transaction_span().entered();

        self.transition(
            executor,
            "COMMIT",
            TransactionState::InTransaction,
            TransactionState::Idle,
        )
    }

    /// Issue `ROLLBACK`. Fails if no transaction is open.
    ///
    /// # Errors
    ///
    /// `TransactionState` on misuse, `Query` if the driver rejects the statement.
    pub fn rollback<E: SqlExecutor + ?Sized>(&mut self, executor: &E) -> Result<()> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::rollback_transaction_span().entered();

        self.transition(
            executor,
            "ROLLBACK",
            TransactionState::InTransaction,
            TransactionState::Idle,
        )
    }

    fn transition<E: SqlExecutor + ?Sized>(
        &mut self,
        executor: &E,
        verb: &str,
        from: TransactionState,
        to: TransactionState,
    ) -> Result<()> {
        if self.state != from {
            return Err(AdapterError::TransactionState(format!(
                "cannot {verb}: {}",
                self.state.describe()
            )));
        }

        log::info!(target: crate::adapter::SQL_LOG_TARGET, "{verb}");
        executor
            .run(verb)
            .map_err(|e| AdapterError::query(verb, e.message()))?;

        log::debug!("transaction state {:?} -> {:?}", self.state, to);
        self.state = to;
        Ok(())
    }
}
