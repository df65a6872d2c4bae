//! End-to-end tests over the sample fixture project: captured API payloads
//! flow through extraction, staging, joining, and consolidation, and the
//! saved run report reloads intact.

use std::path::{Path, PathBuf};

use strata_core::config::Config;
use strata_core::report::{RunReport, RunStatus, StageStatus};
use strata_core::run::RunId;
use strata_pipeline::{selection_with_dependencies, FixtureExtractor, Runner, TASKS};
use strata_store::Store;

fn sample_project() -> &'static Path {
    Path::new("tests/fixtures/sample_project")
}

fn fixtures_dir(config: &Config) -> PathBuf {
    sample_project().join(config.fixtures_dir.as_deref().unwrap())
}

/// Wire every extraction task to its captured fixture file.
fn runner_from_fixtures<'a>(store: &'a Store, config: &Config) -> Runner<'a> {
    let dir = fixtures_dir(config);
    let mut runner = Runner::new(store);
    for task in TASKS {
        if !task.needs_extractor() {
            continue;
        }
        let fixture = dir.join(format!("{}.json", task.name));
        runner = runner.with_extractor(
            task.name,
            Box::new(FixtureExtractor::from_file(task.name, &fixture).unwrap()),
        );
    }
    runner
}

#[test]
fn sample_project_config_loads() {
    let config = Config::load_from_dir(sample_project()).unwrap();
    assert_eq!(config.name, "sample_project");
    assert_eq!(config.database.path, ":memory:");
    assert_eq!(config.fixtures_dir.as_deref(), Some("fixtures"));
}

#[tokio::test]
async fn full_run_lands_every_entity_in_history() {
    let config = Config::load_from_dir(sample_project()).unwrap();
    let store = Store::open_memory().unwrap();
    let runner = runner_from_fixtures(&store, &config);

    let report = runner.run(&RunId::generate()).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.stages.len(), TASKS.len());
    for stage in &report.stages {
        assert_eq!(stage.status, StageStatus::Success, "{}", stage.task);
    }

    // Both countries are present in all three fragments, so the join has
    // no gaps and the merge inserts each exactly once.
    let merge = report.stage("merge_countries").unwrap();
    assert_eq!(merge.inserted, 2);
    assert_eq!(merge.updated, 0);
    assert!(merge.join_gaps.is_empty());

    // The Andorra station reports no current data and is dropped before
    // staging; the other two land.
    let air = report.stage("air_quality").unwrap();
    assert_eq!(air.extracted, 3);
    assert_eq!(air.dropped, 1);
    assert_eq!(air.inserted, 2);

    assert_eq!(store.count("etl.th_countries").unwrap(), 2);
    assert_eq!(store.count("etl.th_region_stats").unwrap(), 1);
    assert_eq!(store.count("etl.th_weather").unwrap(), 2);
    assert_eq!(store.count("etl.th_air_quality").unwrap(), 2);
}

#[tokio::test]
async fn rerun_of_same_fixtures_versions_dimensions_and_appends_nothing() {
    let config = Config::load_from_dir(sample_project()).unwrap();
    let store = Store::open_memory().unwrap();
    let runner = runner_from_fixtures(&store, &config);

    runner.run(&RunId::generate()).await.unwrap();
    let second = runner.run(&RunId::generate()).await.unwrap();

    assert_eq!(second.status, RunStatus::Completed);

    let merge = second.stage("merge_countries").unwrap();
    assert_eq!(merge.inserted, 0);
    assert_eq!(merge.updated, 2);

    let weather = second.stage("weather").unwrap();
    assert_eq!(weather.inserted, 0);
    assert_eq!(weather.duplicates, 2);

    // History row counts are unchanged by the rerun.
    assert_eq!(store.count("etl.th_countries").unwrap(), 2);
    assert_eq!(store.count("etl.th_weather").unwrap(), 2);
}

#[tokio::test]
async fn selection_runs_requested_entity_and_its_dependencies_only() {
    let config = Config::load_from_dir(sample_project()).unwrap();
    let store = Store::open_memory().unwrap();
    let runner = runner_from_fixtures(&store, &config);

    let selection = selection_with_dependencies(&["region_stats".to_string()]).unwrap();
    let report = runner
        .run_selected(&RunId::generate(), Some(&selection))
        .await
        .unwrap();

    // Three country fragments, the merge, and region_stats itself.
    assert_eq!(report.stages.len(), 5);
    assert!(report.stage("region_stats").is_some());
    assert!(report.stage("weather").is_none());
    assert!(report.stage("air_quality").is_none());
    assert_eq!(store.count("etl.th_weather").unwrap(), 0);
}

#[tokio::test]
async fn saved_report_reloads_with_every_stage() {
    let config = Config::load_from_dir(sample_project()).unwrap();
    let store = Store::open_memory().unwrap();
    let runner = runner_from_fixtures(&store, &config);

    let run_id = RunId::generate();
    let report = runner.run(&run_id).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run_report.json");
    report.save(&path).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let reloaded: RunReport = serde_json::from_str(&raw).unwrap();
    assert_eq!(reloaded.run_id, run_id);
    assert_eq!(reloaded.status, RunStatus::Completed);
    assert_eq!(reloaded.stages.len(), TASKS.len());
    assert!(reloaded.stage("merge_countries").is_some());
}
