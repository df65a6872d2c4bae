//! Pipeline error types

use strata_core::error::CoreError;
use strata_store::StoreError;
use thiserror::Error;

/// Failure while obtaining raw payloads from a source.
///
/// Extraction errors never abort a run: the affected stage reports no data
/// and its dependents are skipped.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("fixture not found: {path}")]
    FixtureNotFound { path: String },

    #[error("fixture unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload shape: {message}")]
    Shape { message: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("[P001] Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("[P002] Unknown task: {name}")]
    UnknownTask { name: String },

    #[error("[P003] No extractor registered for task: {task}")]
    MissingExtractor { task: String },

    #[error("[P004] Circular task dependency: {cycle}")]
    CircularDependency { cycle: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
