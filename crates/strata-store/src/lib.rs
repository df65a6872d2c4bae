//! strata-store - Staging and history store for Strata
//!
//! DuckDB-backed implementation of the staging-to-history consolidation
//! protocol: full-refresh staging loads, multi-source inner joins, and the
//! two consolidation policies (versioned upsert, append-only dedup).

pub mod connection;
pub mod consolidate;
pub mod ddl;
pub mod error;
pub mod join;
mod rows;
pub mod staging;
mod value;

pub use connection::Store;
pub use consolidate::{AppendStats, Consolidator, UpsertStats};
pub use error::{StoreError, StoreResult};
pub use join::{JoinOutcome, Joiner};
pub use staging::StagingLoader;
