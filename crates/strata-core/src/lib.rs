//! strata-core - Core library for Strata
//!
//! This crate provides the shared types used across all Strata components:
//! normalized records, staging-area and history-table schemas, run
//! identifiers, per-stage reports, and project configuration.

pub mod config;
pub mod error;
pub mod record;
pub mod report;
pub mod run;
pub mod schema;

pub use config::{Config, DatabaseConfig};
pub use error::{CoreError, CoreResult};
pub use record::Record;
pub use report::{Policy, RunReport, RunStatus, StageReport, StageStatus};
pub use run::RunId;
pub use schema::{AreaSpec, HistorySpec, MergePolicy};
