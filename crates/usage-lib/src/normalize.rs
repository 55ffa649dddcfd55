//! Query response normalization
//!
//! Turns a faceted time-series response into [`UsageRecord`]s. Missing or
//! null averages (including the literal string `"None"`) become zero; a
//! response without any time-series points is reported as
//! [`Normalized::NoData`] rather than an error.

use crate::error::ShapeError;
use crate::models::UsageRecord;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;

/// Display format for the start and end timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Aggregates per time-series point, in select order
const CPU: usize = 0;
const MEMORY: usize = 1;
const DISK: usize = 2;

/// Outcome of normalizing one query response
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Records(Vec<UsageRecord>),
    NoData,
}

impl Normalized {
    pub fn into_records(self) -> Vec<UsageRecord> {
        match self {
            Normalized::Records(records) => records,
            Normalized::NoData => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Facet {
    #[serde(default)]
    name: String,
    #[serde(rename = "timeSeries", default)]
    time_series: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Deserialize)]
struct TimeSeriesPoint {
    #[serde(rename = "beginTimeSeconds")]
    begin_time_seconds: i64,
    #[serde(rename = "endTimeSeconds")]
    end_time_seconds: i64,
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    #[serde(default)]
    average: Value,
}

/// Normalize a query response body.
///
/// `fallback_host` names records whose facet has an empty name, and
/// `local` is the offset used for the human-readable timestamps.
pub fn normalize(
    body: &Value,
    fallback_host: &str,
    local: &FixedOffset,
) -> Result<Normalized, ShapeError> {
    let facets = body.get("facets").ok_or(ShapeError::MissingField("facets"))?;
    let facets = Vec::<Facet>::deserialize(facets).map_err(|e| ShapeError::Malformed {
        context: "facets",
        message: e.to_string(),
    })?;

    let mut records = Vec::new();
    for facet in facets {
        let hostname = if facet.name.is_empty() {
            fallback_host.to_string()
        } else {
            facet.name
        };

        for point in facet.time_series {
            records.push(UsageRecord {
                hostname: hostname.clone(),
                epoch_start_time: point.begin_time_seconds,
                epoch_end_time: point.end_time_seconds,
                start_date_time: format_epoch(point.begin_time_seconds, local)?,
                end_date_time: format_epoch(point.end_time_seconds, local)?,
                cpu_avg: average_at(&point.results, CPU)?,
                mem_avg: average_at(&point.results, MEMORY)?,
                disk_avg: average_at(&point.results, DISK)?,
            });
        }
    }

    if records.is_empty() {
        Ok(Normalized::NoData)
    } else {
        Ok(Normalized::Records(records))
    }
}

fn average_at(results: &[AggregateResult], index: usize) -> Result<f64, ShapeError> {
    let result = results
        .get(index)
        .ok_or(ShapeError::MissingAggregate { index })?;
    coerce_average(index, &result.average)
}

/// Null-coalesce one average value
fn coerce_average(index: usize, value: &Value) -> Result<f64, ShapeError> {
    let invalid = || ShapeError::InvalidAverage {
        index,
        value: value.to_string(),
    };

    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n.as_f64().ok_or_else(invalid),
        Value::String(s) if s == "None" => Ok(0.0),
        Value::String(s) => s.trim().parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn format_epoch(epoch: i64, local: &FixedOffset) -> Result<String, ShapeError> {
    let utc = DateTime::from_timestamp(epoch, 0).ok_or(ShapeError::InvalidTimestamp(epoch))?;
    Ok(utc.with_timezone(local).format(TIMESTAMP_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const T: i64 = 1_700_000_000;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn response(results: Value) -> Value {
        json!({
            "facets": [{
                "name": "AZUPWTABGW01",
                "timeSeries": [{
                    "beginTimeSeconds": T,
                    "endTimeSeconds": T + 3600,
                    "results": results
                }]
            }]
        })
    }

    #[test]
    fn test_null_and_none_become_zero() {
        let body = response(json!([
            {"average": null},
            {"average": "None"},
            {"average": 3.5}
        ]));

        let records = normalize(&body, "fallback", &utc()).unwrap().into_records();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cpu_avg, 0.0);
        assert_eq!(records[0].mem_avg, 0.0);
        assert_eq!(records[0].disk_avg, 3.5);
    }

    #[test]
    fn test_missing_average_key_becomes_zero() {
        let body = response(json!([{"average": 1.0}, {}, {"average": 2}]));

        let records = normalize(&body, "fallback", &utc()).unwrap().into_records();

        assert_eq!(records[0].cpu_avg, 1.0);
        assert_eq!(records[0].mem_avg, 0.0);
        assert_eq!(records[0].disk_avg, 2.0);
    }

    #[test]
    fn test_empty_facets_is_no_data() {
        let body = json!({"facets": []});

        assert_eq!(normalize(&body, "h", &utc()).unwrap(), Normalized::NoData);
    }

    #[test]
    fn test_empty_time_series_is_no_data() {
        let body = json!({"facets": [{"name": "h", "timeSeries": []}]});

        assert_eq!(normalize(&body, "h", &utc()).unwrap(), Normalized::NoData);
    }

    #[test]
    fn test_missing_facets_is_shape_error() {
        let body = json!({"error": "NRQL Syntax Error"});

        assert_eq!(
            normalize(&body, "h", &utc()).unwrap_err(),
            ShapeError::MissingField("facets")
        );
    }

    #[test]
    fn test_malformed_facets_is_shape_error() {
        let body = json!({"facets": "nope"});

        assert!(matches!(
            normalize(&body, "h", &utc()),
            Err(ShapeError::Malformed { context: "facets", .. })
        ));
    }

    #[test]
    fn test_short_results_is_shape_error() {
        let body = response(json!([{"average": 1.0}, {"average": 2.0}]));

        assert_eq!(
            normalize(&body, "h", &utc()).unwrap_err(),
            ShapeError::MissingAggregate { index: 2 }
        );
    }

    #[test]
    fn test_unrecognized_average_is_shape_error() {
        let body = response(json!([{"average": "n/a"}, {"average": 1}, {"average": 1}]));

        assert!(matches!(
            normalize(&body, "h", &utc()),
            Err(ShapeError::InvalidAverage { index: 0, .. })
        ));
    }

    #[test]
    fn test_numeric_strings_are_parsed() {
        let body = response(json!([{"average": "12.25"}, {"average": 1}, {"average": 1}]));

        let records = normalize(&body, "h", &utc()).unwrap().into_records();

        assert_eq!(records[0].cpu_avg, 12.25);
    }

    #[test]
    fn test_record_fields_and_timestamps() {
        let body = response(json!([{"average": 10.0}, {"average": 20.0}, {"average": 30.0}]));
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();

        let records = normalize(&body, "fallback", &plus_two).unwrap().into_records();
        let record = &records[0];

        assert_eq!(record.hostname, "AZUPWTABGW01");
        assert_eq!(record.epoch_start_time, T);
        assert_eq!(record.epoch_end_time, T + 3600);
        // 1_700_000_000 is 2023-11-14 22:13:20 UTC
        assert_eq!(record.start_date_time, "2023-11-15 00:13:20");
        assert_eq!(record.end_date_time, "2023-11-15 01:13:20");
    }

    #[test]
    fn test_one_record_per_point() {
        let body = json!({
            "facets": [{
                "name": "",
                "timeSeries": [
                    {"beginTimeSeconds": T, "endTimeSeconds": T + 1800,
                     "results": [{"average": 1}, {"average": 2}, {"average": 3}]},
                    {"beginTimeSeconds": T + 1800, "endTimeSeconds": T + 3600,
                     "results": [{"average": 4}, {"average": 5}, {"average": 6}]}
                ]
            }]
        });

        let records = normalize(&body, "configured-host", &utc()).unwrap().into_records();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.hostname == "configured-host"));
        assert_eq!(records[1].epoch_start_time, T + 1800);
        assert_eq!(records[1].disk_avg, 6.0);
    }
}
