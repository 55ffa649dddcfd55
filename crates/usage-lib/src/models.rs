//! Core data models for usage collection

use serde::{Deserialize, Serialize};

/// Seconds in one query window
pub const WINDOW_SECS: i64 = 3600;

/// A monitored host as configured for the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    pub entity_id: u64,
}

impl Host {
    pub fn new(name: impl Into<String>, entity_id: u64) -> Self {
        Self {
            name: name.into(),
            entity_id,
        }
    }
}

/// Half-open `[start, end)` interval in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        debug_assert!(start < end, "window start must precede end");
        Self { start, end }
    }

    /// Width of the window in seconds
    pub fn duration_secs(&self) -> i64 {
        self.end - self.start
    }

    /// Whether two half-open windows share any second
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// One normalized usage sample for a host and window.
///
/// Field names double as the CSV header names, so the struct can be
/// deserialized straight back out of a written file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub hostname: String,
    pub epoch_start_time: i64,
    pub epoch_end_time: i64,
    pub start_date_time: String,
    pub end_date_time: String,
    pub cpu_avg: f64,
    pub mem_avg: f64,
    pub disk_avg: f64,
}
