//! Pipeline layer: sources, normalizers, and the task orchestrator.
//!
//! `strata-pipeline` sits between raw API payloads and the store. An
//! [`Extractor`] produces raw JSON, per-entity normalizers shape it into
//! staging records, and the [`Runner`] walks the task DAG staging and
//! consolidating each entity in dependency order.

pub mod dag;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod runner;
pub mod task;

pub use dag::TaskDag;
pub use error::{ExtractError, PipelineError, PipelineResult};
pub use extract::{Extractor, FixtureExtractor};
pub use normalize::Normalized;
pub use runner::{selection_with_dependencies, Runner};
pub use task::{Task, TaskKind, TASKS};
