//! Error types for strata-store

use thiserror::Error;

/// Store operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection error (S001)
    #[error("[S001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Migration error (S002)
    #[error("[S002] Migration failed: {0}")]
    MigrationError(String),

    /// Transaction error (S003)
    #[error("[S003] Transaction failed: {0}")]
    TransactionError(String),

    /// SQL execution error (S004)
    #[error("[S004] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Query error (S005)
    #[error("[S005] Query failed: {0}")]
    QueryError(String),

    /// Record does not conform to the target table's column set (S006)
    #[error("[S006] Record does not fit '{table}': unknown column '{column}'")]
    ShapeMismatch { table: String, column: String },

    /// Record is missing a required key column (S007)
    #[error("[S007] Record for '{table}' has no value for key column '{column}'")]
    MissingKey { table: String, column: String },

    /// History table asked to consolidate under the wrong policy (S008)
    #[error("[S008] Table '{table}' is not maintained by the {expected} policy")]
    PolicyMismatch { table: String, expected: String },

    /// Post-operation count check failed (S009)
    #[error("[S009] Count invariant violated on '{table}': {detail}")]
    CountInvariant { table: String, detail: String },

    /// Failed to decode a row column (S010)
    #[error("[S010] Failed to decode row value: {0}")]
    RowDecode(String),
}

/// Result type alias for StoreError
pub type StoreResult<T> = Result<T, StoreError>;

impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::ExecutionError(err.to_string())
    }
}
