//! Store connection wrapper.
//!
//! [`Store`] owns a DuckDB [`Connection`] and provides helpers for opening,
//! migrating, and transacting against the staging and history tables.

use crate::ddl;
use crate::error::{StoreError, StoreResult};
use duckdb::Connection;
use std::path::Path;

/// Wrapper around a DuckDB connection holding the staging and history
/// tables.
///
/// Single-owner and sequential — consolidation is whole-batch set
/// operations, not a worker pool, so no `Mutex` is needed. Concurrent
/// pipelines each get their own `Store`.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at `path` and run pending migrations.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::ConnectionError(format!("{e}: {}", path.display())))?;
        ddl::apply_pending(&conn)?;
        Ok(Self { conn })
    }

    /// Create an in-memory store with all migrations applied.
    ///
    /// Useful for unit tests that don't need persistence.
    pub fn open_memory() -> StoreResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        ddl::apply_pending(&conn)?;
        Ok(Self { conn })
    }

    /// Open from a config path string (handles the `:memory:` special case).
    pub fn from_config_path(path: &str) -> StoreResult<Self> {
        if path == ":memory:" {
            Self::open_memory()
        } else {
            Self::open(Path::new(path))
        }
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back
    /// on error.
    ///
    /// Every staging reload and consolidation pass runs through here, so an
    /// external reader only ever observes the state before or after the
    /// whole batch, and any failure leaves the store untouched.
    pub fn transaction<F, T>(&self, body: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| StoreError::TransactionError(format!("BEGIN failed: {e}")))?;

        let result = body(&self.conn);

        match &result {
            Ok(_) => {
                if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(StoreError::TransactionError(format!(
                        "COMMIT failed: {commit_err}"
                    )));
                }
            }
            Err(_) => {
                let _ = self.conn.execute_batch("ROLLBACK");
            }
        }
        result
    }

    /// Row count of a table (convenience used by consolidation and tests).
    pub fn count(&self, table: &str) -> StoreResult<usize> {
        count_with(&self.conn, table)
    }
}

/// Row count via an explicit connection, usable inside a transaction body.
pub(crate) fn count_with(conn: &Connection, table: &str) -> StoreResult<usize> {
    let n: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .map_err(|e| StoreError::QueryError(format!("count of {table} failed: {e}")))?;
    Ok(n as usize)
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
