//! Index naming and the identifier length limit.

use crate::error::{AdapterError, Result};

/// Longest identifier (in bytes) accepted for generated or supplied names
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Derive an index name: `idx_{table}_{col1}_and_{col2}`.
///
/// Dots in schema-qualified table names become underscores.
pub fn index_name<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    let columns: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
    format!("idx_{}_{}", table.replace('.', "_"), columns.join("_and_"))
}

/// Reject names longer than [`MAX_IDENTIFIER_LENGTH`]
///
/// # Errors
///
/// Returns `AdapterError::InvalidIndexName` carrying the offending name.
pub fn check_identifier_length(name: &str) -> Result<()> {
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(AdapterError::InvalidIndexName {
            name: name.to_string(),
            length: name.len(),
            limit: MAX_IDENTIFIER_LENGTH,
        });
    }
    Ok(())
}
