//! Opaque run identifier threaded through extraction, staging, and
//! consolidation for traceability. It carries no semantics beyond
//! correlation: it is never a uniqueness key and never used for locking.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation id for one pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh short run id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string()[..8].to_string())
    }

    /// Wrap an id handed down by an external orchestrator
    pub fn from_external(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
