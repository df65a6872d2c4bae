//! Embedded schema DDL, versioned and self-applying.
//!
//! Each numbered `.sql` file is compiled in via `include_str!` and applied
//! on open if `etl.schema_version` does not list its version yet. A
//! migration and its version record commit together, so a half-applied
//! step can never be mistaken for a finished one.

use crate::error::{StoreError, StoreResult};
use duckdb::Connection;
use std::collections::HashSet;

const BOOTSTRAP_SQL: &str = "CREATE SCHEMA IF NOT EXISTS etl;
     CREATE TABLE IF NOT EXISTS etl.schema_version (
         version    INTEGER NOT NULL,
         applied_at TIMESTAMP NOT NULL DEFAULT now()
     );";

/// A single versioned DDL step.
pub struct Migration {
    pub version: i32,
    pub sql: &'static str,
}

/// All known migrations, in order.
pub static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("v001_initial.sql"),
}];

impl Migration {
    /// Execute the DDL and record the version as one transaction.
    fn apply(&self, conn: &Connection) -> StoreResult<()> {
        conn.execute_batch("BEGIN")
            .map_err(|e| self.step_error("could not start", e))?;

        let outcome = conn.execute_batch(self.sql).and_then(|_| {
            conn.execute(
                "INSERT INTO etl.schema_version (version) VALUES (?)",
                duckdb::params![self.version],
            )
            .map(|_| ())
        });

        match outcome {
            Ok(()) => conn
                .execute_batch("COMMIT")
                .map_err(|e| self.step_error("could not commit", e)),
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(self.step_error("rolled back", e))
            }
        }
    }

    fn step_error(&self, what: &str, e: duckdb::Error) -> StoreError {
        StoreError::MigrationError(format!("v{:03} {what}: {e}", self.version))
    }
}

/// Bring `conn` up to the latest schema version.
pub fn apply_pending(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(BOOTSTRAP_SQL)
        .map_err(|e| StoreError::MigrationError(format!("schema bootstrap: {e}")))?;

    let applied = applied_versions(conn)?;
    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }
        log::debug!("applying schema migration v{:03}", migration.version);
        migration.apply(conn)?;
    }
    Ok(())
}

fn applied_versions(conn: &Connection) -> StoreResult<HashSet<i32>> {
    let decode =
        |e: duckdb::Error| StoreError::MigrationError(format!("could not read schema_version: {e}"));
    let mut stmt = conn
        .prepare("SELECT version FROM etl.schema_version")
        .map_err(decode)?;
    let versions = stmt
        .query_map([], |row| row.get::<_, i32>(0))
        .map_err(decode)?
        .collect::<Result<HashSet<i32>, _>>()
        .map_err(decode)?;
    Ok(versions)
}

#[cfg(test)]
#[path = "ddl_test.rs"]
mod tests;
