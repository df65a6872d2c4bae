//! Source abstraction and the fixture-backed implementation.

use crate::error::ExtractError;
use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// A source of raw payloads for one pipeline task.
///
/// Implementations must be Send + Sync so the runner can hold them across
/// await points. Returning an error means the source produced nothing this
/// run; the stage reports no data and its dependents are skipped.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Pull every raw payload the source has for this run.
    async fn extract(&self) -> Result<Vec<Value>, ExtractError>;

    /// Source identifier for logging.
    fn source(&self) -> &str;
}

/// Serves pre-recorded payloads from a JSON file or from memory.
///
/// The upstream HTTP clients live outside this crate; fixtures carry their
/// captured responses so the pipeline stays runnable offline and in tests.
#[derive(Debug)]
pub struct FixtureExtractor {
    name: String,
    payloads: Vec<Value>,
}

impl FixtureExtractor {
    /// Load a fixture file containing a JSON array of raw payloads.
    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::FixtureNotFound {
                path: path.display().to_string(),
            });
        }
        let raw = fs::read_to_string(path)?;
        let parsed: Value = serde_json::from_str(&raw)?;
        let Value::Array(payloads) = parsed else {
            return Err(ExtractError::Shape {
                message: format!("{} must hold a JSON array", path.display()),
            });
        };
        Ok(Self {
            name: name.into(),
            payloads,
        })
    }

    pub fn from_values(name: impl Into<String>, payloads: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            payloads,
        }
    }
}

#[async_trait]
impl Extractor for FixtureExtractor {
    async fn extract(&self) -> Result<Vec<Value>, ExtractError> {
        log::debug!("{}: serving {} fixture payloads", self.name, self.payloads.len());
        Ok(self.payloads.clone())
    }

    fn source(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
