//! Tests for Store open, migration, transaction, and DDL shape.

use crate::Store;

// ── Helpers ────────────────────────────────────────────────────────────

/// Query a single i64 value (convenience for COUNT(*) assertions).
fn count(store: &Store, sql: &str) -> i64 {
    store
        .conn()
        .query_row(sql, [], |row| row.get::<_, i64>(0))
        .unwrap()
}

// ── Open & migration ───────────────────────────────────────────────────

#[test]
fn open_memory_succeeds() {
    let store = Store::open_memory().unwrap();
    assert!(count(&store, "SELECT COUNT(*) FROM etl.schema_version") >= 1);
}

#[test]
fn open_file_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strata.duckdb");
    assert!(!path.exists());
    let _store = Store::open(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn open_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strata.duckdb");
    {
        let _store1 = Store::open(&path).unwrap();
        // drop so the file is not held open
    }
    let store2 = Store::open(&path).unwrap();
    let migration_count = crate::ddl::MIGRATIONS.len() as i64;
    assert_eq!(
        count(&store2, "SELECT COUNT(*) FROM etl.schema_version"),
        migration_count,
        "schema_version should have one row per migration"
    );
}

#[test]
fn from_config_path_handles_memory() {
    let store = Store::from_config_path(":memory:").unwrap();
    assert_eq!(store.count("etl.sa_countries_basic").unwrap(), 0);
}

#[test]
fn migration_creates_all_tables() {
    let store = Store::open_memory().unwrap();
    for spec in strata_core::schema::ALL_AREAS {
        assert_eq!(store.count(spec.table).unwrap(), 0, "{}", spec.table);
    }
    for spec in strata_core::schema::ALL_HISTORY {
        assert_eq!(store.count(spec.table).unwrap(), 0, "{}", spec.table);
    }
}

// ── Transactions ───────────────────────────────────────────────────────

#[test]
fn transaction_commits_on_ok() {
    let store = Store::open_memory().unwrap();
    store
        .transaction(|conn| {
            conn.execute(
                "INSERT INTO etl.sa_region_stats (region, run_id) VALUES ('europe', 'r1')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
    assert_eq!(store.count("etl.sa_region_stats").unwrap(), 1);
}

#[test]
fn transaction_rolls_back_on_err() {
    let store = Store::open_memory().unwrap();
    let result: crate::StoreResult<()> = store.transaction(|conn| {
        conn.execute(
            "INSERT INTO etl.sa_region_stats (region, run_id) VALUES ('europe', 'r1')",
            [],
        )?;
        Err(crate::StoreError::ExecutionError("forced abort".to_string()))
    });
    assert!(result.is_err());
    assert_eq!(store.count("etl.sa_region_stats").unwrap(), 0);
}

#[test]
fn unique_constraint_rejects_duplicate_natural_key() {
    let store = Store::open_memory().unwrap();
    let insert = "INSERT INTO etl.th_region_stats \
                  (region, first_loaded_at, last_updated_at, version) \
                  VALUES ('europe', now(), now(), 1)";
    store.conn().execute(insert, []).unwrap();
    assert!(
        store.conn().execute(insert, []).is_err(),
        "duplicate natural key must be rejected by the store itself"
    );
}
