//! Shared helpers for reading DuckDB rows back into records.

use crate::error::{StoreError, StoreResult};
use crate::value::from_db_value;
use duckdb::Connection;
use strata_core::record::Record;

/// Execute `sql` and decode each row into a [`Record`] using `columns` as
/// the column names, in select-list order. Null cells are omitted.
pub(crate) fn read_records(
    conn: &Connection,
    sql: &str,
    columns: &[&str],
) -> StoreResult<Vec<Record>> {
    let mut stmt = conn.prepare(sql)?;

    let rows: Vec<StoreResult<Record>> = stmt
        .query_map([], |row| {
            let mut record = Record::new();
            let mut decode_err = None;
            for (idx, col) in columns.iter().enumerate() {
                let value = row.get_ref(idx)?;
                match from_db_value(value) {
                    Ok(json) => {
                        if !json.is_null() {
                            record.set(*col, json);
                        }
                    }
                    Err(e) => {
                        decode_err = Some(e);
                        break;
                    }
                }
            }
            Ok(match decode_err {
                None => Ok(record),
                Some(e) => Err(e),
            })
        })
        .map_err(|e| StoreError::QueryError(format!("query failed: {e}")))?
        .collect::<Result<_, _>>()
        .map_err(|e| StoreError::QueryError(format!("row error: {e}")))?;

    rows.into_iter().collect()
}

/// Execute a single-column `sql` and return the values rendered as strings.
///
/// Integer keys (station ids) come back in their canonical decimal form.
pub(crate) fn read_strings(conn: &Connection, sql: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;

    let rows: Vec<StoreResult<String>> = stmt
        .query_map([], |row| {
            let value = row.get_ref(0)?;
            Ok(from_db_value(value).map(|json| match json {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }))
        })
        .map_err(|e| StoreError::QueryError(format!("query failed: {e}")))?
        .collect::<Result<_, _>>()
        .map_err(|e| StoreError::QueryError(format!("row error: {e}")))?;

    rows.into_iter().collect()
}
