//! Sequential pipeline runner.
//!
//! Executes the task DAG in topological order, producing one [`StageReport`]
//! per task and a closing [`RunReport`]. A task is never allowed to panic
//! the run: any failure is folded into its report and every transitive
//! dependent is marked skipped. A source that yields nothing marks its task
//! no-data, which blocks dependents the same way without failing the run.

use crate::dag::TaskDag;
use crate::error::{PipelineError, PipelineResult};
use crate::extract::Extractor;
use crate::task::{Task, TaskKind, TASKS};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use strata_core::report::{RunReport, StageReport, StageStatus};
use strata_core::run::RunId;
use strata_store::{Consolidator, Joiner, StagingLoader, Store};

pub struct Runner<'a> {
    store: &'a Store,
    extractors: HashMap<String, Box<dyn Extractor>>,
}

impl<'a> Runner<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            extractors: HashMap::new(),
        }
    }

    /// Register the source for a task. Tasks that stage data and have no
    /// registered extractor fail at execution time.
    pub fn with_extractor(mut self, task: &str, extractor: Box<dyn Extractor>) -> Self {
        self.extractors.insert(task.to_string(), extractor);
        self
    }

    /// Execute every registered task.
    pub async fn run(&self, run_id: &RunId) -> PipelineResult<RunReport> {
        self.run_selected(run_id, None).await
    }

    /// Execute `selection` (plus nothing else) in dependency order, or the
    /// whole registry when `selection` is `None`. Selected tasks whose
    /// dependencies are not part of the selection still run against
    /// whatever the staging areas currently hold.
    pub async fn run_selected(
        &self,
        run_id: &RunId,
        selection: Option<&HashSet<String>>,
    ) -> PipelineResult<RunReport> {
        if let Some(selected) = selection {
            for name in selected {
                if crate::task::find(name).is_none() {
                    return Err(PipelineError::UnknownTask { name: name.clone() });
                }
            }
        }

        let dag = TaskDag::for_registry()?;
        let order = dag.topological_order()?;

        let mut report = RunReport::new(run_id.clone());
        let mut blocked: HashSet<String> = HashSet::new();

        for name in order {
            let Some(task) = crate::task::find(&name) else {
                return Err(PipelineError::UnknownTask { name });
            };
            if let Some(selected) = selection {
                if !selected.contains(task.name) {
                    continue;
                }
            }

            if let Some(upstream) = task
                .depends_on
                .iter()
                .find(|dep| blocked.contains(**dep))
            {
                let mut stage = StageReport::new(task.name, run_id.clone(), task.policy());
                stage.mark_skipped(format!("upstream task {upstream} did not complete"));
                blocked.insert(task.name.to_string());
                report.push(stage);
                continue;
            }

            let stage = self.run_task(task, run_id).await;
            if stage.status != StageStatus::Success {
                blocked.insert(task.name.to_string());
            }
            report.push(stage);
        }

        report.finish();
        Ok(report)
    }

    /// Execute one task, folding every failure into its report.
    async fn run_task(&self, task: &Task, run_id: &RunId) -> StageReport {
        let mut stage = StageReport::new(task.name, run_id.clone(), task.policy());
        let started = Instant::now();

        match &task.kind {
            TaskKind::Stage { area, normalize } => {
                let _ = self
                    .extract_and_stage(task, *area, *normalize, run_id, &mut stage)
                    .await;
            }
            TaskKind::StageThenUpsert {
                area,
                normalize,
                history,
            } => {
                if let Some(batch) =
                    self.extract_and_stage(task, *area, *normalize, run_id, &mut stage).await
                {
                    match Consolidator::new(self.store).versioned_upsert(history, &batch) {
                        Ok(stats) => {
                            stage.inserted = stats.inserted;
                            stage.updated = stats.updated;
                            stage.total = stats.total;
                        }
                        Err(e) => stage.mark_failed(e.to_string()),
                    }
                }
            }
            TaskKind::StageThenAppend {
                area,
                normalize,
                history,
            } => {
                if let Some(batch) =
                    self.extract_and_stage(task, *area, *normalize, run_id, &mut stage).await
                {
                    match Consolidator::new(self.store).append_only(history, &batch, run_id) {
                        Ok(stats) => {
                            stage.inserted = stats.inserted;
                            stage.duplicates = stats.duplicates;
                            stage.total = stats.total;
                        }
                        Err(e) => stage.mark_failed(e.to_string()),
                    }
                }
            }
            TaskKind::JoinThenUpsert {
                areas,
                key,
                history,
            } => match Joiner::new(self.store).join(areas, key) {
                Ok(outcome) => {
                    stage.normalized = outcome.rows.len();
                    stage.join_gaps = outcome.excluded_keys;
                    match Consolidator::new(self.store).versioned_upsert(history, &outcome.rows) {
                        Ok(stats) => {
                            stage.inserted = stats.inserted;
                            stage.updated = stats.updated;
                            stage.total = stats.total;
                        }
                        Err(e) => stage.mark_failed(e.to_string()),
                    }
                }
                Err(e) => stage.mark_failed(e.to_string()),
            },
        }

        stage.duration_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "{}: {} [{}ms]",
            task.name,
            stage.status,
            stage.duration_ms
        );
        stage
    }

    /// Shared front half of every staging task: extract, normalize, load.
    /// Returns the normalized batch for consolidation, or `None` when the
    /// stage already reached a terminal status.
    async fn extract_and_stage(
        &self,
        task: &Task,
        area: &'static strata_core::schema::AreaSpec,
        normalize: fn(&[serde_json::Value]) -> crate::normalize::Normalized,
        run_id: &RunId,
        stage: &mut StageReport,
    ) -> Option<Vec<strata_core::record::Record>> {
        let Some(extractor) = self.extractors.get(task.name) else {
            stage.mark_failed(
                PipelineError::MissingExtractor {
                    task: task.name.to_string(),
                }
                .to_string(),
            );
            return None;
        };

        let raw = match extractor.extract().await {
            Ok(raw) => raw,
            Err(e) => {
                stage.mark_no_data(format!("{}: {e}", extractor.source()));
                return None;
            }
        };
        stage.extracted = raw.len();
        if raw.is_empty() {
            stage.mark_no_data(format!("{}: source returned no payloads", extractor.source()));
            return None;
        }

        let normalized = normalize(&raw);
        stage.normalized = normalized.records.len();
        stage.dropped = normalized.dropped;
        if normalized.records.is_empty() {
            stage.mark_no_data("no records survived normalization".to_string());
            return None;
        }

        match StagingLoader::new(self.store).load(area, &normalized.records, run_id) {
            Ok(staged) => {
                stage.staged = staged;
                Some(normalized.records)
            }
            Err(e) => {
                stage.mark_failed(e.to_string());
                None
            }
        }
    }
}

/// Expand a selection to include everything each named task depends on.
pub fn selection_with_dependencies(names: &[String]) -> PipelineResult<HashSet<String>> {
    let dag = TaskDag::build(TASKS)?;
    let mut selected = HashSet::new();
    for name in names {
        if !dag.contains(name) {
            return Err(PipelineError::UnknownTask { name: name.clone() });
        }
        let mut pending = vec![name.clone()];
        while let Some(current) = pending.pop() {
            if selected.insert(current.clone()) {
                pending.extend(dag.dependencies(&current));
            }
        }
    }
    Ok(selected)
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
