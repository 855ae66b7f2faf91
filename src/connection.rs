//! Connection Module
//!
//! Opens the single driver connection an adapter holds for its lifetime.

use crate::config::Dsn;
use crate::error::{AdapterError, Result};
use may_postgres::Client;
use std::time::Instant;

/// Establishes a connection described by `dsn`
///
/// # Errors
///
/// Returns `AdapterError::Config` if the DSN is incomplete or the server
/// cannot be reached with the given credentials.
pub fn connect(dsn: &Dsn) -> Result<Client> {
    dsn.validate()?;
    let start = Instant::now();

    let client = may_postgres::connect(&dsn.conninfo()).map_err(|e| {
        AdapterError::Config(format!(
            "Could not connect to the DB at {}, check host / user / password: {e}",
            dsn.redacted()
        ))
    })?;

    log::debug!("connected to {} in {:?}", dsn.redacted(), start.elapsed());
    Ok(client)
}
