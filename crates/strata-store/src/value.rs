//! Conversions between record JSON values and DuckDB values.
//!
//! Binding: JSON scalars map to native DuckDB types; arrays and objects are
//! serialized to JSON text (staging columns holding nested API structures
//! are VARCHAR). Reading: DuckDB values map back to JSON scalars, with
//! timestamps rendered as RFC 3339 strings so records stay plain JSON.

use crate::error::{StoreError, StoreResult};
use chrono::DateTime;
use duckdb::types::{TimeUnit, Value as DbValue, ValueRef};
use serde_json::Value as JsonValue;

/// Convert a record value into a bindable DuckDB value.
pub(crate) fn to_db_value(value: &JsonValue) -> DbValue {
    match value {
        JsonValue::Null => DbValue::Null,
        JsonValue::Bool(b) => DbValue::Boolean(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                DbValue::BigInt(i)
            } else {
                DbValue::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => DbValue::Text(s.clone()),
        // Nested structures land as JSON text
        other => DbValue::Text(other.to_string()),
    }
}

/// Convert a DuckDB column value back into a record JSON value.
pub(crate) fn from_db_value(value: ValueRef<'_>) -> StoreResult<JsonValue> {
    let json = match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Boolean(b) => JsonValue::Bool(b),
        ValueRef::TinyInt(i) => JsonValue::from(i),
        ValueRef::SmallInt(i) => JsonValue::from(i),
        ValueRef::Int(i) => JsonValue::from(i),
        ValueRef::BigInt(i) => JsonValue::from(i),
        ValueRef::UTinyInt(i) => JsonValue::from(i),
        ValueRef::USmallInt(i) => JsonValue::from(i),
        ValueRef::UInt(i) => JsonValue::from(i),
        ValueRef::UBigInt(i) => JsonValue::from(i),
        ValueRef::Float(f) => JsonValue::from(f),
        ValueRef::Double(f) => JsonValue::from(f),
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| StoreError::RowDecode(format!("non-UTF8 text column: {e}")))?;
            JsonValue::from(s)
        }
        ValueRef::Timestamp(unit, raw) => JsonValue::from(format_timestamp(unit, raw)?),
        other => {
            return Err(StoreError::RowDecode(format!(
                "unsupported column type {:?}",
                other.data_type()
            )))
        }
    };
    Ok(json)
}

/// Render a DuckDB timestamp as an RFC 3339 UTC string.
fn format_timestamp(unit: TimeUnit, raw: i64) -> StoreResult<String> {
    let micros = match unit {
        TimeUnit::Second => raw.checked_mul(1_000_000),
        TimeUnit::Millisecond => raw.checked_mul(1_000),
        TimeUnit::Microsecond => Some(raw),
        TimeUnit::Nanosecond => Some(raw / 1_000),
    }
    .ok_or_else(|| StoreError::RowDecode(format!("timestamp out of range: {raw}")))?;

    let ts = DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::RowDecode(format!("timestamp out of range: {micros}")))?;
    Ok(ts.to_rfc3339())
}
