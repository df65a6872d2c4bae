//! Per-entity normalizers: raw API payloads into staging-shaped records.
//!
//! Normalizers are pure and total: a malformed payload drops that record
//! and bumps the `dropped` count, the rest of the batch continues. Nested
//! structures (native names, capitals, languages) are carried as JSON text
//! because the staging areas store them as VARCHAR.

use serde_json::Value;
use strata_core::record::Record;

/// Outcome of normalizing one raw batch.
#[derive(Debug, Default)]
pub struct Normalized {
    pub records: Vec<Record>,
    pub dropped: usize,
}

impl Normalized {
    fn keep(&mut self, record: Record) {
        self.records.push(record);
    }

    fn drop_one(&mut self, entity: &str, reason: &str) {
        self.dropped += 1;
        log::debug!("{entity}: dropped record ({reason})");
    }
}

/// Identity, names, and headline figures from `/all`.
///
/// `cca3` is the natural key of the joined entity, so a payload without it
/// can never consolidate and is dropped here.
pub fn countries_basic(raw: &[Value]) -> Normalized {
    let mut out = Normalized::default();
    for payload in raw {
        let Some(code) = str_field(payload, "cca3") else {
            out.drop_one("countries_basic", "missing cca3");
            continue;
        };
        let mut r = Record::new();
        r.set("code_iso3", code);
        set_str(&mut r, "code_iso2", payload, "cca2");
        if let Some(name) = payload.get("name") {
            set_str(&mut r, "name_common", name, "common");
            set_str(&mut r, "name_official", name, "official");
            set_json_text(&mut r, "name_native", name, "nativeName");
        }
        set_json_text(&mut r, "capital", payload, "capital");
        set_str(&mut r, "region", payload, "region");
        set_str(&mut r, "subregion", payload, "subregion");
        set_f64(&mut r, "area", payload, "area");
        set_i64(&mut r, "population", payload, "population");
        out.keep(r);
    }
    out
}

/// Coordinates and land borders from the geo fields.
pub fn countries_geo(raw: &[Value]) -> Normalized {
    let mut out = Normalized::default();
    for payload in raw {
        let Some(code) = str_field(payload, "cca3") else {
            out.drop_one("countries_geo", "missing cca3");
            continue;
        };
        let mut r = Record::new();
        r.set("code_iso3", code);
        set_str(&mut r, "code_iso2", payload, "cca2");
        if let Some(latlng) = payload.get("latlng").and_then(Value::as_array) {
            if let Some(lat) = latlng.first().and_then(Value::as_f64) {
                r.set("latitude", lat);
            }
            if let Some(lon) = latlng.get(1).and_then(Value::as_f64) {
                r.set("longitude", lon);
            }
        }
        set_bool(&mut r, "landlocked", payload, "landlocked");
        set_json_text(&mut r, "borders", payload, "borders");
        out.keep(r);
    }
    out
}

/// Languages, currencies, flags, and membership flags.
pub fn countries_culture(raw: &[Value]) -> Normalized {
    let mut out = Normalized::default();
    for payload in raw {
        let Some(code) = str_field(payload, "cca3") else {
            out.drop_one("countries_culture", "missing cca3");
            continue;
        };
        let mut r = Record::new();
        r.set("code_iso3", code);
        set_str(&mut r, "code_iso2", payload, "cca2");
        set_str(&mut r, "code_numeric", payload, "ccn3");
        set_json_text(&mut r, "languages", payload, "languages");
        set_json_text(&mut r, "currencies", payload, "currencies");
        set_json_text(&mut r, "timezones", payload, "timezones");
        set_str(&mut r, "flag_emoji", payload, "flag");
        if let Some(flags) = payload.get("flags") {
            set_str(&mut r, "flag_svg", flags, "svg");
        }
        set_bool(&mut r, "independent", payload, "independent");
        set_bool(&mut r, "un_member", payload, "unMember");
        out.keep(r);
    }
    out
}

/// Aggregate one region's country list into a single statistics row.
///
/// Each payload is `{"region": ..., "countries": [...]}` as captured from
/// the per-region endpoint. Counts treat absent flags as false and absent
/// figures as zero, matching the upstream data where the field list was
/// capped.
pub fn region_stats(raw: &[Value]) -> Normalized {
    let mut out = Normalized::default();
    for payload in raw {
        let Some(region) = str_field(payload, "region") else {
            out.drop_one("region_stats", "missing region");
            continue;
        };
        let Some(countries) = payload.get("countries").and_then(Value::as_array) else {
            out.drop_one("region_stats", "missing countries array");
            continue;
        };

        let total_countries = countries.len() as i64;
        let mut total_population: i64 = 0;
        let mut total_area: f64 = 0.0;
        let mut landlocked_count: i64 = 0;
        let mut independent_count: i64 = 0;
        let mut un_member_count: i64 = 0;
        for country in countries {
            total_population += country
                .get("population")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            total_area += country.get("area").and_then(Value::as_f64).unwrap_or(0.0);
            if bool_field(country, "landlocked") {
                landlocked_count += 1;
            }
            if bool_field(country, "independent") {
                independent_count += 1;
            }
            if bool_field(country, "unMember") {
                un_member_count += 1;
            }
        }
        let avg_population = if total_countries > 0 {
            total_population as f64 / total_countries as f64
        } else {
            0.0
        };

        let mut r = Record::new();
        r.set("region", region)
            .set("total_countries", total_countries)
            .set("total_population", total_population)
            .set("avg_population", avg_population)
            .set("total_area", total_area)
            .set("landlocked_count", landlocked_count)
            .set("independent_count", independent_count)
            .set("un_member_count", un_member_count);
        out.keep(r);
    }
    out
}

/// Current conditions from the weather API, one payload per city.
///
/// The extraction step injects `country` and `city` alongside the raw
/// response; a payload without a city or an observation time cannot form
/// the composite key and is dropped.
pub fn weather(raw: &[Value]) -> Normalized {
    let mut out = Normalized::default();
    for payload in raw {
        let Some(city) = str_field(payload, "city") else {
            out.drop_one("weather", "missing city");
            continue;
        };
        let Some(measured_at) = payload
            .get("current")
            .and_then(|c| c.get("time"))
            .and_then(Value::as_str)
        else {
            out.drop_one("weather", "missing current.time");
            continue;
        };

        let mut r = Record::new();
        r.set("measured_at", measured_at).set("city", city);
        set_str(&mut r, "country", payload, "country");
        set_f64(&mut r, "latitude", payload, "latitude");
        set_f64(&mut r, "longitude", payload, "longitude");
        if let Some(current) = payload.get("current") {
            set_f64(&mut r, "temperature", current, "temperature_2m");
            set_f64(&mut r, "humidity", current, "relative_humidity_2m");
            set_f64(&mut r, "precipitation", current, "precipitation");
            set_f64(&mut r, "wind_speed", current, "wind_speed_10m");
            set_i64(&mut r, "weather_code", current, "weather_code");
        }
        out.keep(r);
    }
    out
}

/// Station readings from the air quality API, one payload per station.
///
/// Pollutant figures live under `iaqi.<code>.v`. A station without an id or
/// an observation time cannot form the composite key; a station reporting
/// `aqi: "-"` has no current data. Both are dropped.
pub fn air_quality(raw: &[Value]) -> Normalized {
    let mut out = Normalized::default();
    for payload in raw {
        let Some(station_id) = payload.get("idx").and_then(Value::as_i64) else {
            out.drop_one("air_quality", "missing idx");
            continue;
        };
        let Some(measured_at) = payload
            .get("time")
            .and_then(|t| t.get("s"))
            .and_then(Value::as_str)
        else {
            out.drop_one("air_quality", "missing time.s");
            continue;
        };
        if payload.get("aqi") == Some(&Value::String("-".to_string())) {
            out.drop_one("air_quality", "station has no current data");
            continue;
        }

        let mut r = Record::new();
        r.set("measured_at", measured_at).set("station_id", station_id);
        if let Some(city) = payload.get("city") {
            set_str(&mut r, "city_name", city, "name");
            if let Some(geo) = city.get("geo").and_then(Value::as_array) {
                if let Some(lat) = geo.first().and_then(Value::as_f64) {
                    r.set("latitude", lat);
                }
                if let Some(lon) = geo.get(1).and_then(Value::as_f64) {
                    r.set("longitude", lon);
                }
            }
        }
        set_str(&mut r, "country_code", payload, "country_code");
        set_i64(&mut r, "aqi", payload, "aqi");
        // Field name carries the upstream API's typo.
        set_str(&mut r, "dominant_pollutant", payload, "dominentpol");
        for (column, code) in [
            ("pm25", "pm25"),
            ("pm10", "pm10"),
            ("o3", "o3"),
            ("no2", "no2"),
            ("so2", "so2"),
            ("co", "co"),
            ("temperature", "t"),
            ("humidity", "h"),
            ("pressure", "p"),
            ("wind_speed", "w"),
        ] {
            if let Some(v) = payload
                .get("iaqi")
                .and_then(|iaqi| iaqi.get(code))
                .and_then(|entry| entry.get("v"))
                .and_then(Value::as_f64)
            {
                r.set(column, v);
            }
        }
        out.keep(r);
    }
    out
}

// ── Field helpers ──────────────────────────────────────────────────────

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn bool_field(payload: &Value, key: &str) -> bool {
    payload.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn set_str(record: &mut Record, column: &str, payload: &Value, key: &str) {
    if let Some(v) = payload.get(key).and_then(Value::as_str) {
        record.set(column, v);
    }
}

fn set_f64(record: &mut Record, column: &str, payload: &Value, key: &str) {
    if let Some(v) = payload.get(key).and_then(Value::as_f64) {
        record.set(column, v);
    }
}

fn set_i64(record: &mut Record, column: &str, payload: &Value, key: &str) {
    if let Some(v) = payload.get(key).and_then(Value::as_i64) {
        record.set(column, v);
    }
}

fn set_bool(record: &mut Record, column: &str, payload: &Value, key: &str) {
    if let Some(v) = payload.get(key).and_then(Value::as_bool) {
        record.set(column, v);
    }
}

/// Carry a nested structure as its JSON text rendering.
fn set_json_text(record: &mut Record, column: &str, payload: &Value, key: &str) {
    if let Some(v) = payload.get(key) {
        if !v.is_null() {
            record.set(column, v.to_string());
        }
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
