//! Static task registry: what each pipeline step stages, joins, and merges.

use crate::normalize::{self, Normalized};
use serde_json::Value;
use strata_core::report::Policy;
use strata_core::schema::{
    AreaSpec, HistorySpec, SA_AIR_QUALITY, SA_COUNTRIES_BASIC, SA_COUNTRIES_CULTURE,
    SA_COUNTRIES_GEO, SA_REGION_STATS, SA_WEATHER, TH_AIR_QUALITY, TH_COUNTRIES, TH_REGION_STATS,
    TH_WEATHER,
};

/// What a task does once its inputs are available.
pub enum TaskKind {
    /// Extract, normalize, and stage; consolidation happens downstream.
    Stage {
        area: &'static AreaSpec,
        normalize: fn(&[Value]) -> Normalized,
    },
    /// Extract, normalize, stage, then versioned-upsert the same batch.
    StageThenUpsert {
        area: &'static AreaSpec,
        normalize: fn(&[Value]) -> Normalized,
        history: &'static HistorySpec,
    },
    /// Extract, normalize, stage, then append-only merge the same batch.
    StageThenAppend {
        area: &'static AreaSpec,
        normalize: fn(&[Value]) -> Normalized,
        history: &'static HistorySpec,
    },
    /// Join previously staged areas on a shared key and upsert the wide rows.
    JoinThenUpsert {
        areas: &'static [&'static AreaSpec],
        key: &'static str,
        history: &'static HistorySpec,
    },
}

pub struct Task {
    pub name: &'static str,
    pub kind: TaskKind,
    pub depends_on: &'static [&'static str],
}

impl Task {
    pub fn policy(&self) -> Policy {
        match self.kind {
            TaskKind::Stage { .. } => Policy::StageOnly,
            TaskKind::StageThenUpsert { .. } | TaskKind::JoinThenUpsert { .. } => {
                Policy::VersionedUpsert
            }
            TaskKind::StageThenAppend { .. } => Policy::AppendOnly,
        }
    }

    /// Whether the task pulls from a source (and therefore needs an
    /// extractor registered).
    pub fn needs_extractor(&self) -> bool {
        !matches!(self.kind, TaskKind::JoinThenUpsert { .. })
    }
}

static COUNTRY_AREAS: [&AreaSpec; 3] =
    [&SA_COUNTRIES_BASIC, &SA_COUNTRIES_GEO, &SA_COUNTRIES_CULTURE];

/// The shipped pipeline: three country fragments fan into the merge, then
/// the remaining entities run against the merged dimension.
pub static TASKS: &[Task] = &[
    Task {
        name: "countries_basic",
        kind: TaskKind::Stage {
            area: &SA_COUNTRIES_BASIC,
            normalize: normalize::countries_basic,
        },
        depends_on: &[],
    },
    Task {
        name: "countries_geo",
        kind: TaskKind::Stage {
            area: &SA_COUNTRIES_GEO,
            normalize: normalize::countries_geo,
        },
        depends_on: &[],
    },
    Task {
        name: "countries_culture",
        kind: TaskKind::Stage {
            area: &SA_COUNTRIES_CULTURE,
            normalize: normalize::countries_culture,
        },
        depends_on: &[],
    },
    Task {
        name: "merge_countries",
        kind: TaskKind::JoinThenUpsert {
            areas: &COUNTRY_AREAS,
            key: "code_iso3",
            history: &TH_COUNTRIES,
        },
        depends_on: &["countries_basic", "countries_geo", "countries_culture"],
    },
    Task {
        name: "region_stats",
        kind: TaskKind::StageThenUpsert {
            area: &SA_REGION_STATS,
            normalize: normalize::region_stats,
            history: &TH_REGION_STATS,
        },
        depends_on: &["merge_countries"],
    },
    Task {
        name: "weather",
        kind: TaskKind::StageThenAppend {
            area: &SA_WEATHER,
            normalize: normalize::weather,
            history: &TH_WEATHER,
        },
        depends_on: &["merge_countries"],
    },
    Task {
        name: "air_quality",
        kind: TaskKind::StageThenAppend {
            area: &SA_AIR_QUALITY,
            normalize: normalize::air_quality,
            history: &TH_AIR_QUALITY,
        },
        depends_on: &["merge_countries"],
    },
];

pub fn find(name: &str) -> Option<&'static Task> {
    TASKS.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_dependency_names_a_registered_task() {
        for task in TASKS {
            for dep in task.depends_on {
                assert!(find(dep).is_some(), "{}: unknown dependency {dep}", task.name);
            }
        }
    }

    #[test]
    fn merge_depends_on_all_three_fragments() {
        let merge = find("merge_countries").unwrap();
        assert_eq!(merge.depends_on.len(), 3);
        assert!(!merge.needs_extractor());
        assert_eq!(merge.policy(), Policy::VersionedUpsert);
    }

    #[test]
    fn stage_only_tasks_report_stage_only_policy() {
        assert_eq!(find("countries_basic").unwrap().policy(), Policy::StageOnly);
        assert_eq!(find("weather").unwrap().policy(), Policy::AppendOnly);
        assert_eq!(
            find("region_stats").unwrap().policy(),
            Policy::VersionedUpsert
        );
    }
}
