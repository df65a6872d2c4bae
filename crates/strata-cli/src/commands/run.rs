//! Run command implementation

use anyhow::{bail, Result};
use std::time::Instant;
use strata_core::report::{RunReport, StageStatus};
use strata_core::run::RunId;
use strata_pipeline::{selection_with_dependencies, FixtureExtractor, Runner, TASKS};

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{load_config, open_store, project_path};

pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let store = open_store(global, &config)?;

    let run_id = match &args.run_id {
        Some(external) => RunId::from_external(external.clone()),
        None => RunId::generate(),
    };

    let selection = match &args.select {
        Some(raw) => {
            let names: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            Some(selection_with_dependencies(&names)?)
        }
        None => None,
    };

    let runner = build_runner(&store, global, &config)?;

    println!("Running pipeline (run {run_id})...\n");
    let start_time = Instant::now();
    let report = runner.run_selected(&run_id, selection.as_ref()).await?;
    print_stages(&report);

    let report_path = match &args.report {
        Some(path) => project_path(global, path),
        None => project_path(global, &config.target_path).join("run_report.json"),
    };
    report.save(&report_path)?;

    let (ok, failed, skipped) = tally(&report);
    println!();
    println!("Completed: {ok} succeeded, {failed} failed, {skipped} skipped");
    println!("Report: {}", report_path.display());
    println!("Total time: {}ms", start_time.elapsed().as_millis());

    if failed > 0 {
        bail!("run {run_id} failed");
    }
    Ok(())
}

/// Wire a fixture extractor for every staging task that has a
/// `<fixtures_dir>/<task>.json` capture. Tasks without one fail at
/// execution time and show up in the report.
fn build_runner<'a>(
    store: &'a strata_store::Store,
    global: &GlobalArgs,
    config: &strata_core::config::Config,
) -> Result<Runner<'a>> {
    let mut runner = Runner::new(store);
    let Some(fixtures_dir) = &config.fixtures_dir else {
        return Ok(runner);
    };
    let dir = project_path(global, fixtures_dir);

    for task in TASKS {
        if !task.needs_extractor() {
            continue;
        }
        let fixture = dir.join(format!("{}.json", task.name));
        if fixture.exists() {
            runner = runner.with_extractor(
                task.name,
                Box::new(FixtureExtractor::from_file(task.name, &fixture)?),
            );
        } else {
            log::debug!("{}: no fixture at {}", task.name, fixture.display());
        }
    }
    Ok(runner)
}

fn print_stages(report: &RunReport) {
    for stage in &report.stages {
        match stage.status {
            StageStatus::Success => {
                let counts = match stage.policy {
                    strata_core::report::Policy::StageOnly => {
                        format!("{} staged", stage.staged)
                    }
                    strata_core::report::Policy::VersionedUpsert => format!(
                        "{} inserted, {} updated",
                        stage.inserted, stage.updated
                    ),
                    strata_core::report::Policy::AppendOnly => format!(
                        "{} inserted, {} duplicates",
                        stage.inserted, stage.duplicates
                    ),
                };
                println!(
                    "  ✓ {} ({counts}) [{}ms]",
                    stage.task, stage.duration_ms
                );
                if !stage.join_gaps.is_empty() {
                    println!(
                        "    ! {} key(s) excluded from join: {}",
                        stage.join_gaps.len(),
                        stage.join_gaps.join(", ")
                    );
                }
            }
            StageStatus::NoData => {
                println!("  - {} (no data) [{}ms]", stage.task, stage.duration_ms);
            }
            StageStatus::Skipped => {
                println!("  - {} (skipped)", stage.task);
            }
            StageStatus::Failed => {
                let error = stage.errors.first().map(String::as_str).unwrap_or("unknown");
                println!(
                    "  ✗ {} - {error} [{}ms]",
                    stage.task, stage.duration_ms
                );
            }
        }
    }
}

fn tally(report: &RunReport) -> (usize, usize, usize) {
    let mut ok = 0;
    let mut failed = 0;
    let mut skipped = 0;
    for stage in &report.stages {
        match stage.status {
            StageStatus::Success => ok += 1,
            StageStatus::Failed => failed += 1,
            StageStatus::NoData | StageStatus::Skipped => skipped += 1,
        }
    }
    (ok, failed, skipped)
}
