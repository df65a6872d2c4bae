//! Tests for the pipeline runner.

use crate::error::ExtractError;
use crate::extract::{Extractor, FixtureExtractor};
use crate::runner::{selection_with_dependencies, Runner};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use strata_core::report::{RunStatus, StageStatus};
use strata_core::run::RunId;
use strata_store::Store;

/// A source whose upstream is unreachable this run.
struct DownSource;

#[async_trait]
impl Extractor for DownSource {
    async fn extract(&self) -> Result<Vec<Value>, ExtractError> {
        Err(ExtractError::Shape {
            message: "connection refused".to_string(),
        })
    }

    fn source(&self) -> &str {
        "down"
    }
}

fn country(code: &str) -> Value {
    json!({
        "cca2": &code[..2],
        "cca3": code,
        "name": {"common": format!("Country {code}")},
        "region": "Europe",
        "population": 1000,
        "area": 10.0,
        "latlng": [1.0, 2.0],
        "landlocked": false,
        "languages": {"spa": "Spanish"},
        "unMember": true
    })
}

fn fixture(name: &str, payloads: Vec<Value>) -> Box<FixtureExtractor> {
    Box::new(FixtureExtractor::from_values(name, payloads))
}

fn runner_with_all_sources(store: &Store) -> Runner<'_> {
    Runner::new(store)
        .with_extractor(
            "countries_basic",
            fixture("countries_basic", vec![country("ESP"), country("FRA")]),
        )
        .with_extractor(
            "countries_geo",
            fixture("countries_geo", vec![country("ESP"), country("FRA")]),
        )
        .with_extractor(
            "countries_culture",
            fixture("countries_culture", vec![country("ESP"), country("FRA")]),
        )
        .with_extractor(
            "region_stats",
            fixture(
                "region_stats",
                vec![json!({
                    "region": "Europe",
                    "countries": [{"population": 1000, "area": 10.0, "unMember": true}]
                })],
            ),
        )
        .with_extractor(
            "weather",
            fixture(
                "weather",
                vec![json!({
                    "country": "ES",
                    "city": "Madrid",
                    "current": {"time": "2026-08-01T06:00:00", "temperature_2m": 28.0}
                })],
            ),
        )
        .with_extractor(
            "air_quality",
            fixture(
                "air_quality",
                vec![json!({
                    "idx": 5722,
                    "aqi": 42,
                    "city": {"name": "Madrid"},
                    "time": {"s": "2026-08-01 06:00:00"}
                })],
            ),
        )
}

#[tokio::test]
async fn full_run_consolidates_every_entity() {
    let store = Store::open_memory().unwrap();
    let runner = runner_with_all_sources(&store);

    let report = runner.run(&RunId::generate()).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.stages.len(), 7);

    let merge = report.stage("merge_countries").unwrap();
    assert_eq!(merge.status, StageStatus::Success);
    assert_eq!(merge.inserted, 2);
    assert!(merge.join_gaps.is_empty());

    assert_eq!(report.stage("region_stats").unwrap().inserted, 1);
    assert_eq!(report.stage("weather").unwrap().inserted, 1);
    assert_eq!(report.stage("air_quality").unwrap().inserted, 1);

    assert_eq!(store.count("etl.th_countries").unwrap(), 2);
    assert_eq!(store.count("etl.th_region_stats").unwrap(), 1);
    assert_eq!(store.count("etl.th_weather").unwrap(), 1);
    assert_eq!(store.count("etl.th_air_quality").unwrap(), 1);
}

#[tokio::test]
async fn rerun_updates_dimensions_and_appends_nothing() {
    let store = Store::open_memory().unwrap();
    let runner = runner_with_all_sources(&store);

    runner.run(&RunId::generate()).await.unwrap();
    let report = runner.run(&RunId::generate()).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    let merge = report.stage("merge_countries").unwrap();
    assert_eq!(merge.inserted, 0);
    assert_eq!(merge.updated, 2);

    let weather = report.stage("weather").unwrap();
    assert_eq!(weather.inserted, 0);
    assert_eq!(weather.duplicates, 1);
    assert_eq!(store.count("etl.th_weather").unwrap(), 1);
}

#[tokio::test]
async fn missing_extractor_fails_task_and_skips_dependents() {
    let store = Store::open_memory().unwrap();
    // Misconfigured deployment: the geo source was never registered.
    let runner = Runner::new(&store)
        .with_extractor(
            "countries_basic",
            fixture("countries_basic", vec![country("ESP")]),
        )
        .with_extractor(
            "countries_culture",
            fixture("countries_culture", vec![country("ESP")]),
        );

    let report = runner.run(&RunId::generate()).await.unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(
        report.stage("countries_geo").unwrap().status,
        StageStatus::Failed
    );
    for skipped in ["merge_countries", "region_stats", "weather", "air_quality"] {
        assert_eq!(
            report.stage(skipped).unwrap().status,
            StageStatus::Skipped,
            "{skipped} should be skipped"
        );
    }
    assert_eq!(store.count("etl.th_countries").unwrap(), 0);
}

#[tokio::test]
async fn extractor_error_marks_no_data_and_blocks_dependents() {
    let store = Store::open_memory().unwrap();
    let runner = runner_with_all_sources(&store)
        .with_extractor("countries_culture", Box::new(DownSource));

    let report = runner.run(&RunId::generate()).await.unwrap();

    // No data is not a failure, but nothing downstream may run on a
    // partial set of fragments.
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(
        report.stage("countries_culture").unwrap().status,
        StageStatus::NoData
    );
    assert_eq!(
        report.stage("merge_countries").unwrap().status,
        StageStatus::Skipped
    );
    assert_eq!(store.count("etl.th_countries").unwrap(), 0);
}

#[tokio::test]
async fn join_gaps_surface_in_the_merge_report() {
    let store = Store::open_memory().unwrap();
    let runner = runner_with_all_sources(&store).with_extractor(
        "countries_geo",
        fixture("countries_geo", vec![country("ESP")]),
    );

    let report = runner.run(&RunId::generate()).await.unwrap();

    let merge = report.stage("merge_countries").unwrap();
    assert_eq!(merge.status, StageStatus::Success);
    assert_eq!(merge.inserted, 1);
    assert_eq!(merge.join_gaps, vec!["FRA"]);
}

#[tokio::test]
async fn selection_expands_to_dependencies_and_runs_nothing_else() {
    let store = Store::open_memory().unwrap();
    let runner = runner_with_all_sources(&store);

    let selected = selection_with_dependencies(&["merge_countries".to_string()]).unwrap();
    let expected: HashSet<String> = [
        "countries_basic",
        "countries_geo",
        "countries_culture",
        "merge_countries",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(selected, expected);

    let report = runner
        .run_selected(&RunId::generate(), Some(&selected))
        .await
        .unwrap();
    assert_eq!(report.stages.len(), 4);
    assert!(report.stage("weather").is_none());
    assert_eq!(store.count("etl.th_countries").unwrap(), 2);
    assert_eq!(store.count("etl.th_weather").unwrap(), 0);
}

#[tokio::test]
async fn unknown_selection_is_rejected() {
    let err = selection_with_dependencies(&["tides".to_string()]).unwrap_err();
    assert!(matches!(
        err,
        crate::error::PipelineError::UnknownTask { .. }
    ));
}
