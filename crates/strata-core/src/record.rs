//! Normalized record type shared by staging, joining, and consolidation.
//!
//! A [`Record`] is an ordered mapping of column name to JSON value. It is the
//! canonical shape every normalizer produces and every store operation
//! consumes. Staging tolerates duplicate or partial records; shape checks
//! happen at load and consolidation time, not here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One normalized row: column name -> JSON value.
///
/// Values are plain JSON scalars; nested API structures (language maps,
/// border lists) are serialized to JSON text by the normalizers before they
/// reach a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    columns: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, replacing any existing value
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    /// Get a column value, if present
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Get a column as a string slice (None for missing or non-string)
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    /// Get a column as an i64 (None for missing or non-integer)
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    /// Get a column as an f64 (None for missing or non-numeric)
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    /// Get a column as a bool (None for missing or non-bool)
    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.get(column).and_then(Value::as_bool)
    }

    /// True if the column exists and holds a non-null value
    pub fn has_value(&self, column: &str) -> bool {
        matches!(self.get(column), Some(v) if !v.is_null())
    }

    /// Check whether a column is present (possibly null)
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Iterate over (column, value) pairs in column-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Column names in sorted order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the record has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Record {
        let mut r = Record::new();
        r.set("code_iso3", "ESP")
            .set("population", 47_500_000i64)
            .set("area", 505_992.0)
            .set("landlocked", false)
            .set("subregion", Value::Null);
        r
    }

    #[test]
    fn test_typed_accessors() {
        let r = sample();
        assert_eq!(r.get_str("code_iso3"), Some("ESP"));
        assert_eq!(r.get_i64("population"), Some(47_500_000));
        assert_eq!(r.get_f64("area"), Some(505_992.0));
        assert_eq!(r.get_bool("landlocked"), Some(false));
        assert_eq!(r.get_str("population"), None);
        assert_eq!(r.get_str("missing"), None);
    }

    #[test]
    fn test_has_value_distinguishes_null() {
        let r = sample();
        assert!(r.has_value("code_iso3"));
        assert!(!r.has_value("subregion"));
        assert!(r.contains("subregion"));
        assert!(!r.contains("missing"));
    }

    #[test]
    fn test_set_replaces() {
        let mut r = sample();
        r.set("population", 48_000_000i64);
        assert_eq!(r.get_i64("population"), Some(48_000_000));
        assert_eq!(r.len(), 5);
    }

    #[test]
    fn test_column_order_is_deterministic() {
        let r = sample();
        assert_eq!(
            r.column_names(),
            vec!["area", "code_iso3", "landlocked", "population", "subregion"]
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let r = sample();
        let json = serde_json::to_string(&r).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_from_iterator() {
        let r: Record = vec![
            ("city".to_string(), json!("Madrid")),
            ("temperature".to_string(), json!(21.5)),
        ]
        .into_iter()
        .collect();
        assert_eq!(r.get_str("city"), Some("Madrid"));
        assert_eq!(r.get_f64("temperature"), Some(21.5));
    }
}
