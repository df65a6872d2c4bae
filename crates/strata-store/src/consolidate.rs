//! Consolidator: moves batches from staging into the historical store.
//!
//! Two policies exist. Versioned upsert maintains slowly-changing
//! dimensions: one row per natural key, `version` incremented on every pass
//! that presents the key (unconditionally, even for identical payloads —
//! presence is what is being recorded). Append-only dedup maintains
//! immutable time series: re-presented composite keys are discarded and
//! counted, never an error, and no update path exists at all.
//!
//! Both run as one set-oriented merge inside a single transaction: the
//! batch is materialized into a temp relation and resolved against the
//! historical table with a single `INSERT ... ON CONFLICT`, so every record
//! sees the same start-of-operation snapshot and a failure rolls the whole
//! batch back. The store's UNIQUE constraints arbitrate concurrent inserts.

use crate::connection::{count_with, Store};
use crate::error::{StoreError, StoreResult};
use crate::value::to_db_value;
use duckdb::types::Value as DbValue;
use duckdb::Connection;
use strata_core::record::Record;
use strata_core::run::RunId;
use strata_core::schema::{HistorySpec, MergePolicy};

/// Temp relation holding the batch during a merge. Session-scoped and
/// replaced on every call; dropped before commit.
const BATCH_TABLE: &str = "strata_batch";

/// Counts from a versioned upsert pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertStats {
    /// Keys that did not exist before the pass
    pub inserted: usize,
    /// Keys that existed and had their version incremented
    pub updated: usize,
    /// History row count after the pass
    pub total: usize,
}

/// Counts from an append-only pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendStats {
    /// New measurements written
    pub inserted: usize,
    /// Records discarded because their composite key was already stored
    /// (or repeated within the batch)
    pub duplicates: usize,
    /// History row count after the pass
    pub total: usize,
}

/// Applies a merge policy to move a batch into a history table.
pub struct Consolidator<'a> {
    store: &'a Store,
}

impl<'a> Consolidator<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Versioned upsert: INSERT unknown keys with `version = 1`, UPDATE
    /// known keys in place with `version + 1`, `first_loaded_at` untouched.
    ///
    /// Duplicate natural keys within the batch resolve last-record-wins and
    /// count once, so `inserted + updated` equals the number of distinct
    /// keys presented. Any malformed record aborts the whole batch.
    pub fn versioned_upsert(
        &self,
        spec: &HistorySpec,
        batch: &[Record],
    ) -> StoreResult<UpsertStats> {
        let MergePolicy::VersionedUpsert { natural_key } = spec.policy else {
            return Err(StoreError::PolicyMismatch {
                table: spec.table.to_string(),
                expected: "versioned-upsert".to_string(),
            });
        };

        for record in batch {
            validate_record(spec, record)?;
        }
        if batch.is_empty() {
            return Ok(UpsertStats {
                inserted: 0,
                updated: 0,
                total: self.store.count(spec.table)?,
            });
        }

        let columns = spec.columns.join(", ");
        // Last record for a key wins: highest batch_seq survives.
        let deduped = format!(
            "SELECT {columns} FROM {BATCH_TABLE} \
             QUALIFY row_number() OVER (PARTITION BY {natural_key} ORDER BY batch_seq DESC) = 1"
        );
        let assignments: Vec<String> = spec
            .columns
            .iter()
            .filter(|col| ***col != *natural_key)
            .map(|col| format!("{col} = EXCLUDED.{col}"))
            .collect();
        let merge_sql = format!(
            "INSERT INTO {table} ({columns}, first_loaded_at, last_updated_at, version) \
             SELECT {columns}, now(), now(), 1 FROM ({deduped}) \
             ON CONFLICT ({natural_key}) DO UPDATE SET {assignments}, \
             last_updated_at = now(), version = version + 1",
            table = spec.table,
            assignments = assignments.join(", "),
        );

        self.store.transaction(|conn| {
            let total_before = count_with(conn, spec.table)?;
            materialize_batch(conn, spec, batch)?;

            let distinct_keys = count_query(conn, &format!("SELECT COUNT(*) FROM ({deduped})"))?;
            let pre_existing = count_query(
                conn,
                &format!(
                    "SELECT COUNT(*) FROM ({deduped}) t \
                     JOIN {table} h ON t.{natural_key} = h.{natural_key}",
                    table = spec.table,
                ),
            )?;

            conn.execute(&merge_sql, []).map_err(|e| {
                StoreError::ExecutionError(format!("upsert into {} failed: {e}", spec.table))
            })?;

            let total_after = count_with(conn, spec.table)?;
            let inserted = distinct_keys - pre_existing;
            if total_after != total_before + inserted {
                return Err(StoreError::CountInvariant {
                    table: spec.table.to_string(),
                    detail: format!(
                        "expected {} rows after upsert, found {total_after}",
                        total_before + inserted
                    ),
                });
            }
            drop_batch(conn)?;

            log::debug!(
                "upsert into {}: {} inserted, {} updated, {} total",
                spec.table,
                inserted,
                pre_existing,
                total_after
            );
            Ok(UpsertStats {
                inserted,
                updated: pre_existing,
                total: total_after,
            })
        })
    }

    /// Append-only dedup: insert measurements whose composite key is
    /// unknown, silently discard the rest.
    ///
    /// Existing rows are never touched — measurements are immutable facts.
    /// Within a batch, the first record for a composite key wins; repeats
    /// count as duplicates, so `inserted + duplicates` equals the batch
    /// length.
    pub fn append_only(
        &self,
        spec: &HistorySpec,
        batch: &[Record],
        run_id: &RunId,
    ) -> StoreResult<AppendStats> {
        let MergePolicy::AppendOnly {
            composite_key: (key_a, key_b),
        } = spec.policy
        else {
            return Err(StoreError::PolicyMismatch {
                table: spec.table.to_string(),
                expected: "append-only".to_string(),
            });
        };

        for record in batch {
            validate_record(spec, record)?;
        }
        if batch.is_empty() {
            return Ok(AppendStats {
                inserted: 0,
                duplicates: 0,
                total: self.store.count(spec.table)?,
            });
        }

        let columns = spec.columns.join(", ");
        let deduped = format!(
            "SELECT {columns} FROM {BATCH_TABLE} \
             QUALIFY row_number() OVER (PARTITION BY {key_a}, {key_b} ORDER BY batch_seq ASC) = 1"
        );
        let merge_sql = format!(
            "INSERT INTO {table} ({columns}, run_id, loaded_at) \
             SELECT {columns}, ?, now() FROM ({deduped}) \
             ON CONFLICT ({key_a}, {key_b}) DO NOTHING",
            table = spec.table,
        );

        self.store.transaction(|conn| {
            let total_before = count_with(conn, spec.table)?;
            materialize_batch(conn, spec, batch)?;

            let deduped_count = count_query(conn, &format!("SELECT COUNT(*) FROM ({deduped})"))?;
            let pre_existing = count_query(
                conn,
                &format!(
                    "SELECT COUNT(*) FROM ({deduped}) t \
                     JOIN {table} h ON t.{key_a} = h.{key_a} AND t.{key_b} = h.{key_b}",
                    table = spec.table,
                ),
            )?;

            conn.execute(&merge_sql, duckdb::params![run_id.as_str()])
                .map_err(|e| {
                    StoreError::ExecutionError(format!("append into {} failed: {e}", spec.table))
                })?;

            let total_after = count_with(conn, spec.table)?;
            let inserted = deduped_count - pre_existing;
            if total_after != total_before + inserted {
                return Err(StoreError::CountInvariant {
                    table: spec.table.to_string(),
                    detail: format!(
                        "expected {} rows after append, found {total_after}",
                        total_before + inserted
                    ),
                });
            }
            drop_batch(conn)?;

            log::debug!(
                "append into {}: {} inserted, {} duplicates, {} total",
                spec.table,
                inserted,
                batch.len() - inserted,
                total_after
            );
            Ok(AppendStats {
                inserted,
                duplicates: batch.len() - inserted,
                total: total_after,
            })
        })
    }
}

/// A record must carry only known business columns and a non-null value for
/// every key column.
fn validate_record(spec: &HistorySpec, record: &Record) -> StoreResult<()> {
    for (column, _) in record.iter() {
        if !spec.columns.iter().any(|c| *c == column) {
            return Err(StoreError::ShapeMismatch {
                table: spec.table.to_string(),
                column: column.to_string(),
            });
        }
    }
    for key in spec.key_columns() {
        if !record.has_value(key) {
            return Err(StoreError::MissingKey {
                table: spec.table.to_string(),
                column: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Materialize the batch into the temp relation, preserving iteration order
/// in `batch_seq` so tie-breaks are well-defined.
fn materialize_batch(conn: &Connection, spec: &HistorySpec, batch: &[Record]) -> StoreResult<()> {
    let columns = spec.columns.join(", ");
    conn.execute_batch(&format!(
        "CREATE OR REPLACE TEMPORARY TABLE {BATCH_TABLE} AS \
         SELECT CAST(NULL AS BIGINT) AS batch_seq, {columns} FROM {} LIMIT 0",
        spec.table,
    ))
    .map_err(|e| StoreError::ExecutionError(format!("batch staging failed: {e}")))?;

    let placeholders = vec!["?"; spec.columns.len() + 1].join(", ");
    let insert_sql =
        format!("INSERT INTO {BATCH_TABLE} (batch_seq, {columns}) VALUES ({placeholders})");
    let mut stmt = conn.prepare(&insert_sql)?;

    for (seq, record) in batch.iter().enumerate() {
        let mut values: Vec<DbValue> = Vec::with_capacity(spec.columns.len() + 1);
        values.push(DbValue::BigInt(seq as i64));
        for col in spec.columns {
            values.push(record.get(col).map(to_db_value).unwrap_or(DbValue::Null));
        }
        stmt.execute(duckdb::params_from_iter(values))?;
    }
    Ok(())
}

fn drop_batch(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {BATCH_TABLE}"))
        .map_err(|e| StoreError::ExecutionError(format!("batch cleanup failed: {e}")))?;
    Ok(())
}

fn count_query(conn: &Connection, sql: &str) -> StoreResult<usize> {
    let n: i64 = conn
        .query_row(sql, [], |row| row.get(0))
        .map_err(|e| StoreError::QueryError(format!("{e}: {sql}")))?;
    Ok(n as usize)
}

#[cfg(test)]
#[path = "consolidate_test.rs"]
mod tests;
