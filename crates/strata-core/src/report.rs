//! Per-stage and per-run reporting.
//!
//! A [`StageReport`] packages the counts one pipeline stage produced for the
//! calling orchestrator. Building a report never fails: upstream errors are
//! carried as populated `errors` plus a sentinel status, and the orchestrator
//! decides retry policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CoreResult;
use crate::run::RunId;

/// Consolidation policy a stage applied, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Staging load only, no history merge
    StageOnly,
    VersionedUpsert,
    AppendOnly,
}

/// Outcome of a single pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    /// Extraction returned nothing usable; downstream stages were skipped
    NoData,
    Failed,
    /// Not executed because an upstream stage failed
    Skipped,
}

/// Statistics one stage hands back to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub task: String,
    pub run_id: RunId,
    pub status: StageStatus,
    pub policy: Policy,

    /// Raw records the extractor produced
    pub extracted: usize,
    /// Records surviving normalization
    pub normalized: usize,
    /// Records dropped as malformed during normalization
    pub dropped: usize,
    /// Rows written to the staging area
    pub staged: usize,
    /// Join keys excluded because they were missing from at least one area
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub join_gaps: Vec<String>,

    /// New history rows
    pub inserted: usize,
    /// Existing keys refreshed (versioned upsert only)
    pub updated: usize,
    /// Re-presented composite keys discarded (append-only only)
    pub duplicates: usize,
    /// History row count after consolidation
    pub total: usize,

    pub duration_ms: u64,
    pub errors: Vec<String>,
}

impl StageReport {
    /// Start a report for a task; counts default to zero and status to
    /// `Success` until a failure marks it otherwise.
    pub fn new(task: impl Into<String>, run_id: RunId, policy: Policy) -> Self {
        Self {
            task: task.into(),
            run_id,
            status: StageStatus::Success,
            policy,
            extracted: 0,
            normalized: 0,
            dropped: 0,
            staged: 0,
            join_gaps: Vec::new(),
            inserted: 0,
            updated: 0,
            duplicates: 0,
            total: 0,
            duration_ms: 0,
            errors: Vec::new(),
        }
    }

    /// Record a failure; keeps any counts accumulated so far.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = StageStatus::Failed;
        self.errors.push(error.into());
    }

    /// Record that extraction produced zero usable records.
    pub fn mark_no_data(&mut self, reason: impl Into<String>) {
        self.status = StageStatus::NoData;
        self.errors.push(reason.into());
    }

    /// Record that the stage never ran because an upstream stage failed.
    pub fn mark_skipped(&mut self, reason: impl Into<String>) {
        self.status = StageStatus::Skipped;
        self.errors.push(reason.into());
    }

    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Success
    }
}

/// Overall run outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Aggregated report for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageReport>,
}

impl RunReport {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
        }
    }

    pub fn push(&mut self, stage: StageReport) {
        self.stages.push(stage);
    }

    /// Close the run: `Failed` when any stage failed, `Completed` otherwise
    /// (no-data and skipped stages do not fail a run by themselves).
    pub fn finish(&mut self) {
        self.status = if self.stages.iter().any(|s| s.status == StageStatus::Failed) {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        self.finished_at = Some(Utc::now());
    }

    pub fn stage(&self, task: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.task == task)
    }

    /// Persist the report as JSON, write-to-temp-then-rename so a crashed
    /// writer never leaves a torn file.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)?;
        log::debug!("run report written to {}", path.display());
        Ok(())
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Policy::StageOnly => write!(f, "stage-only"),
            Policy::VersionedUpsert => write!(f, "versioned-upsert"),
            Policy::AppendOnly => write!(f, "append-only"),
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Success => write!(f, "success"),
            StageStatus::NoData => write!(f, "no_data"),
            StageStatus::Failed => write!(f, "failed"),
            StageStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(task: &str, run: &RunId) -> StageReport {
        StageReport::new(task, run.clone(), Policy::VersionedUpsert)
    }

    #[test]
    fn test_new_report_is_success_with_zero_counts() {
        let run = RunId::generate();
        let r = report("merge_countries", &run);
        assert!(r.is_success());
        assert_eq!(r.inserted + r.updated + r.duplicates, 0);
        assert!(r.errors.is_empty());
    }

    #[test]
    fn test_mark_failed_keeps_counts() {
        let run = RunId::generate();
        let mut r = report("weather", &run);
        r.extracted = 10;
        r.staged = 10;
        r.mark_failed("consolidation aborted");
        assert_eq!(r.status, StageStatus::Failed);
        assert_eq!(r.staged, 10);
        assert_eq!(r.errors.len(), 1);
    }

    #[test]
    fn test_run_finish_failed_when_any_stage_failed() {
        let run = RunId::generate();
        let mut rr = RunReport::new(run.clone());
        rr.push(report("a", &run));
        let mut failed = report("b", &run);
        failed.mark_failed("boom");
        rr.push(failed);
        rr.finish();
        assert_eq!(rr.status, RunStatus::Failed);
        assert!(rr.finished_at.is_some());
    }

    #[test]
    fn test_run_finish_completed_despite_no_data() {
        let run = RunId::generate();
        let mut rr = RunReport::new(run.clone());
        let mut nd = report("air_quality", &run);
        nd.mark_no_data("extractor returned error status");
        rr.push(nd);
        rr.finish();
        assert_eq!(rr.status, RunStatus::Completed);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target/run_report.json");

        let run = RunId::generate();
        let mut rr = RunReport::new(run.clone());
        rr.push(report("countries_basic", &run));
        rr.finish();
        rr.save(&path).unwrap();

        let loaded: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.run_id, run);
        assert_eq!(loaded.stages.len(), 1);
    }
}
