//! Staging-area and history-table schemas.
//!
//! Every table the store owns is described here: staging areas (transient,
//! fully replaced each run) and history tables (durable, merged under one of
//! two policies). The DDL in `strata-store` must stay in sync with these
//! column lists.

/// Schema that holds every table the pipeline owns.
pub const SCHEMA: &str = "etl";

/// Audit column on staging and append-only history tables.
pub const RUN_ID_COL: &str = "run_id";
/// Audit column on append-only history tables.
pub const LOADED_AT_COL: &str = "loaded_at";
/// Audit columns on versioned history tables.
pub const VERSION_COL: &str = "version";
pub const FIRST_LOADED_AT_COL: &str = "first_loaded_at";
pub const LAST_UPDATED_AT_COL: &str = "last_updated_at";

/// A staging area: one transient landing table, truncated and reloaded as a
/// whole on every run.
#[derive(Debug, PartialEq, Eq)]
pub struct AreaSpec {
    /// Short name used in task wiring and logs
    pub name: &'static str,
    /// Fully qualified table name
    pub table: &'static str,
    /// Business columns (excludes the `run_id` audit column)
    pub columns: &'static [&'static str],
}

/// How records move from staging into a history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Slowly-changing dimension: one row per natural key, `version`
    /// incremented on every consolidation pass that presents the key.
    VersionedUpsert { natural_key: &'static str },
    /// Immutable time series: rows keyed by (timestamp, location), existing
    /// composite keys silently discarded.
    AppendOnly {
        composite_key: (&'static str, &'static str),
    },
}

/// A durable history table and the merge policy that maintains it.
#[derive(Debug, PartialEq, Eq)]
pub struct HistorySpec {
    pub name: &'static str,
    /// Fully qualified table name
    pub table: &'static str,
    /// Business columns (excludes audit columns)
    pub columns: &'static [&'static str],
    pub policy: MergePolicy,
}

impl HistorySpec {
    /// Columns that participate in conflict detection for this table.
    pub fn key_columns(&self) -> Vec<&'static str> {
        match self.policy {
            MergePolicy::VersionedUpsert { natural_key } => vec![natural_key],
            MergePolicy::AppendOnly { composite_key } => {
                vec![composite_key.0, composite_key.1]
            }
        }
    }
}

// ── Training dataset registry ──────────────────────────────────────────
//
// Three field-subsets of countries are extracted in parallel (the upstream
// API caps fields per call) and joined on code_iso3 before consolidation.

pub static SA_COUNTRIES_BASIC: AreaSpec = AreaSpec {
    name: "countries_basic",
    table: "etl.sa_countries_basic",
    columns: &[
        "code_iso2",
        "code_iso3",
        "name_common",
        "name_official",
        "name_native",
        "capital",
        "region",
        "subregion",
        "area",
        "population",
    ],
};

pub static SA_COUNTRIES_GEO: AreaSpec = AreaSpec {
    name: "countries_geo",
    table: "etl.sa_countries_geo",
    columns: &[
        "code_iso2",
        "code_iso3",
        "latitude",
        "longitude",
        "landlocked",
        "borders",
    ],
};

pub static SA_COUNTRIES_CULTURE: AreaSpec = AreaSpec {
    name: "countries_culture",
    table: "etl.sa_countries_culture",
    columns: &[
        "code_iso2",
        "code_iso3",
        "code_numeric",
        "languages",
        "currencies",
        "timezones",
        "flag_emoji",
        "flag_svg",
        "independent",
        "un_member",
    ],
};

pub static SA_REGION_STATS: AreaSpec = AreaSpec {
    name: "region_stats",
    table: "etl.sa_region_stats",
    columns: &[
        "region",
        "total_countries",
        "total_population",
        "avg_population",
        "total_area",
        "landlocked_count",
        "independent_count",
        "un_member_count",
    ],
};

pub static SA_WEATHER: AreaSpec = AreaSpec {
    name: "weather",
    table: "etl.sa_weather",
    columns: &[
        "measured_at",
        "country",
        "city",
        "latitude",
        "longitude",
        "temperature",
        "humidity",
        "precipitation",
        "wind_speed",
        "weather_code",
    ],
};

pub static SA_AIR_QUALITY: AreaSpec = AreaSpec {
    name: "air_quality",
    table: "etl.sa_air_quality",
    columns: &[
        "measured_at",
        "station_id",
        "city_name",
        "country_code",
        "latitude",
        "longitude",
        "aqi",
        "dominant_pollutant",
        "pm25",
        "pm10",
        "o3",
        "no2",
        "so2",
        "co",
        "temperature",
        "humidity",
        "pressure",
        "wind_speed",
    ],
};

pub static TH_COUNTRIES: HistorySpec = HistorySpec {
    name: "countries",
    table: "etl.th_countries",
    columns: &[
        "code_iso2",
        "code_iso3",
        "code_numeric",
        "name_common",
        "name_official",
        "name_native",
        "capital",
        "region",
        "subregion",
        "latitude",
        "longitude",
        "area",
        "landlocked",
        "population",
        "languages",
        "currencies",
        "timezones",
        "borders",
        "flag_emoji",
        "flag_svg",
        "independent",
        "un_member",
    ],
    policy: MergePolicy::VersionedUpsert {
        natural_key: "code_iso3",
    },
};

pub static TH_REGION_STATS: HistorySpec = HistorySpec {
    name: "region_stats",
    table: "etl.th_region_stats",
    columns: SA_REGION_STATS.columns,
    policy: MergePolicy::VersionedUpsert {
        natural_key: "region",
    },
};

pub static TH_WEATHER: HistorySpec = HistorySpec {
    name: "weather",
    table: "etl.th_weather",
    columns: SA_WEATHER.columns,
    policy: MergePolicy::AppendOnly {
        composite_key: ("measured_at", "city"),
    },
};

pub static TH_AIR_QUALITY: HistorySpec = HistorySpec {
    name: "air_quality",
    table: "etl.th_air_quality",
    columns: SA_AIR_QUALITY.columns,
    policy: MergePolicy::AppendOnly {
        composite_key: ("measured_at", "station_id"),
    },
};

/// All staging areas, for migrations and sanity checks.
pub static ALL_AREAS: &[&AreaSpec] = &[
    &SA_COUNTRIES_BASIC,
    &SA_COUNTRIES_GEO,
    &SA_COUNTRIES_CULTURE,
    &SA_REGION_STATS,
    &SA_WEATHER,
    &SA_AIR_QUALITY,
];

/// All history tables.
pub static ALL_HISTORY: &[&HistorySpec] = &[
    &TH_COUNTRIES,
    &TH_REGION_STATS,
    &TH_WEATHER,
    &TH_AIR_QUALITY,
];
