//! Multi-source joiner: assembles one wide entity from several narrow
//! staging areas.
//!
//! Upstream APIs cap the fields a single call may request, so one logical
//! entity arrives as several fragments loaded into disjoint staging areas.
//! The joiner inner-joins them on the shared natural key: only keys present
//! in every area produce a wide row. A partially extracted entity is
//! not-yet-ready rather than corrupt, so gaps are excluded silently — but
//! they are reported back so the caller can decide whether to warn.

use crate::connection::Store;
use crate::error::{StoreError, StoreResult};
use crate::rows::{read_records, read_strings};
use strata_core::record::Record;
use strata_core::schema::AreaSpec;

/// Result of joining staging areas on a natural key.
#[derive(Debug)]
pub struct JoinOutcome {
    /// Wide records, ordered by the join key ascending.
    pub rows: Vec<Record>,
    /// Keys present in at least one area but missing from another, ordered
    /// ascending. Empty when every key joined cleanly.
    pub excluded_keys: Vec<String>,
}

/// Inner-joins freshly loaded staging areas before consolidation.
pub struct Joiner<'a> {
    store: &'a Store,
}

impl<'a> Joiner<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Join `areas` on `key`. Every area must list `key` among its columns.
    ///
    /// Column collisions across areas resolve to the earliest listed area;
    /// the join key appears once. Output order is by join key ascending so
    /// consolidation input is reproducible across runs.
    pub fn join(&self, areas: &[&AreaSpec], key: &str) -> StoreResult<JoinOutcome> {
        if areas.is_empty() {
            return Err(StoreError::QueryError(
                "join requires at least one staging area".to_string(),
            ));
        }
        for area in areas {
            if !area.columns.iter().any(|c| *c == key) {
                return Err(StoreError::ShapeMismatch {
                    table: area.table.to_string(),
                    column: key.to_string(),
                });
            }
        }

        // Wide select list: first occurrence of each column wins.
        let mut seen: Vec<&str> = Vec::new();
        let mut select_items: Vec<String> = Vec::new();
        for (idx, area) in areas.iter().enumerate() {
            for &col in area.columns {
                if !seen.contains(&col) {
                    seen.push(col);
                    select_items.push(format!("a{idx}.{col}"));
                }
            }
        }

        let mut from_clause = format!("{} a0", areas[0].table);
        for (idx, area) in areas.iter().enumerate().skip(1) {
            from_clause.push_str(&format!(
                " INNER JOIN {} a{idx} ON a0.{key} = a{idx}.{key}",
                area.table
            ));
        }

        let join_sql = format!(
            "SELECT {} FROM {from_clause} ORDER BY a0.{key}",
            select_items.join(", "),
        );
        let rows = read_records(self.store.conn(), &join_sql, &seen)?;

        let excluded_keys = self.excluded_keys(areas, key)?;
        if !excluded_keys.is_empty() {
            log::warn!(
                "join on {key} excluded {} key(s) missing from at least one of {} areas",
                excluded_keys.len(),
                areas.len()
            );
        }

        Ok(JoinOutcome {
            rows,
            excluded_keys,
        })
    }

    /// Keys in the union of the areas but not in their intersection.
    fn excluded_keys(&self, areas: &[&AreaSpec], key: &str) -> StoreResult<Vec<String>> {
        if areas.len() < 2 {
            return Ok(Vec::new());
        }

        let union = areas
            .iter()
            .map(|a| format!("SELECT {key} FROM {}", a.table))
            .collect::<Vec<_>>()
            .join(" UNION ");
        let intersection = areas
            .iter()
            .map(|a| format!("SELECT {key} FROM {}", a.table))
            .collect::<Vec<_>>()
            .join(" INTERSECT ");

        let sql = format!(
            "SELECT {key} FROM (({union}) EXCEPT ({intersection})) \
             WHERE {key} IS NOT NULL ORDER BY {key}"
        );
        read_strings(self.store.conn(), &sql)
    }
}

#[cfg(test)]
#[path = "join_test.rs"]
mod tests;
