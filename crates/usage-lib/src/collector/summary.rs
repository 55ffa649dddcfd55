//! Per-run counters reported back to the caller

use crate::models::TimeWindow;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one host's window loop
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostSummary {
    pub host: String,
    pub windows_queried: usize,
    /// Windows whose response carried no time-series points
    pub windows_empty: usize,
    /// Windows skipped on a transport or response shape error
    pub windows_failed: usize,
    pub records_written: usize,
    pub records_stored: usize,
    pub db_errors: usize,
    pub csv_path: Option<PathBuf>,
    /// Set when a CSV write or close failed and the host's loop stopped early
    pub csv_error: Option<String>,
}

impl HostSummary {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }
}

/// Outcome of a whole collection run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_stamp: String,
    pub base_window: TimeWindow,
    pub hosts: Vec<HostSummary>,
}

impl RunSummary {
    pub fn records_written(&self) -> usize {
        self.hosts.iter().map(|h| h.records_written).sum()
    }

    pub fn windows_failed(&self) -> usize {
        self.hosts.iter().map(|h| h.windows_failed).sum()
    }

    pub fn db_errors(&self) -> usize {
        self.hosts.iter().map(|h| h.db_errors).sum()
    }

    pub fn csv_errors(&self) -> usize {
        self.hosts.iter().filter(|h| h.csv_error.is_some()).count()
    }
}
