//! Staging loader: full-refresh landing of normalized batches.
//!
//! A staging area holds exactly one batch at a time. [`StagingLoader::load`]
//! discards the prior batch and writes the new one inside a single
//! transaction, so a reader never observes a half-loaded area and a failed
//! load leaves the previous batch intact.

use crate::connection::{count_with, Store};
use crate::error::{StoreError, StoreResult};
use crate::rows::read_records;
use crate::value::to_db_value;
use duckdb::types::Value as DbValue;
use strata_core::record::Record;
use strata_core::run::RunId;
use strata_core::schema::{AreaSpec, RUN_ID_COL};

/// Loads normalized batches into staging areas with truncate-and-reload
/// semantics.
pub struct StagingLoader<'a> {
    store: &'a Store,
}

impl<'a> StagingLoader<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Atomically replace the full contents of `area` with `records`,
    /// tagging each row with `run_id`.
    ///
    /// Any record carrying a column the area does not know aborts the whole
    /// load; the prior batch survives the rollback. Duplicate or partial
    /// records are tolerated — staging enforces shape, not uniqueness.
    ///
    /// Returns the number of rows written (advisory, for reporting).
    pub fn load(
        &self,
        area: &AreaSpec,
        records: &[Record],
        run_id: &RunId,
    ) -> StoreResult<usize> {
        // Validate every record before touching the table so a malformed
        // batch fails without opening a transaction at all.
        for record in records {
            validate_shape(area, record)?;
        }

        self.store.transaction(|conn| {
            conn.execute(&format!("DELETE FROM {}", area.table), [])
                .map_err(|e| {
                    StoreError::ExecutionError(format!("truncate of {} failed: {e}", area.table))
                })?;

            let placeholders = vec!["?"; area.columns.len() + 1].join(", ");
            let insert_sql = format!(
                "INSERT INTO {} ({}, {RUN_ID_COL}) VALUES ({placeholders})",
                area.table,
                area.columns.join(", "),
            );
            let mut stmt = conn.prepare(&insert_sql)?;

            for record in records {
                let mut values: Vec<DbValue> = area
                    .columns
                    .iter()
                    .map(|col| record.get(col).map(to_db_value).unwrap_or(DbValue::Null))
                    .collect();
                values.push(DbValue::Text(run_id.as_str().to_string()));
                stmt.execute(duckdb::params_from_iter(values))?;
            }

            log::debug!(
                "staged {} rows into {} (run {run_id})",
                records.len(),
                area.table
            );
            Ok(records.len())
        })
    }

    /// Read the current batch back as records, ordered by the first business
    /// column for deterministic output. Null cells are omitted.
    pub fn read(&self, area: &AreaSpec) -> StoreResult<Vec<Record>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            area.columns.join(", "),
            area.table,
            area.columns[0],
        );
        read_records(self.store.conn(), &sql, area.columns)
    }

    /// Current row count of a staging area.
    pub fn count(&self, area: &AreaSpec) -> StoreResult<usize> {
        count_with(self.store.conn(), area.table)
    }
}

/// Every column the record carries must exist in the area's column set.
fn validate_shape(area: &AreaSpec, record: &Record) -> StoreResult<()> {
    for (column, _) in record.iter() {
        if !area.columns.iter().any(|c| *c == column) {
            return Err(StoreError::ShapeMismatch {
                table: area.table.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "staging_test.rs"]
mod tests;
