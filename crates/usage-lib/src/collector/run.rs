//! The sequential host and window loop

use super::{HostSummary, RunSummary};
use crate::error::{CollectError, SinkError};
use crate::models::{Host, TimeWindow, UsageRecord};
use crate::normalize::{normalize, Normalized};
use crate::query::MetricsSource;
use crate::sink::{CsvOpener, CsvSink, UsageStore};
use crate::window::{self, HOURS_PER_DAY};
use chrono::{FixedOffset, Local, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timestamp format embedded in CSV file names
pub const RUN_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S%.3f";

/// Configuration for a collection run
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Hourly windows queried per host (default: 24)
    pub num_hours: u32,
    /// Delay after each window to pace calls to the API (default: 1 second)
    pub pacing: Duration,
    /// Directory receiving the per-host CSV files
    pub output_dir: PathBuf,
    /// Hours subtracted from the base window on top of the 24 hour day shift
    pub offset_hours: i64,
    /// Offset used for local midnight and the human-readable timestamps
    pub local_offset: FixedOffset,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            num_hours: HOURS_PER_DAY,
            pacing: Duration::from_secs(1),
            output_dir: PathBuf::from("."),
            offset_hours: window::DEFAULT_OFFSET_HOURS,
            local_offset: *Local::now().offset(),
        }
    }
}

/// Drives fetch, normalize and write for every host and window
pub struct UsageCollector {
    source: Arc<dyn MetricsSource>,
    store: Arc<dyn UsageStore>,
    config: CollectionConfig,
    open_csv: CsvOpener,
}

impl UsageCollector {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        store: Arc<dyn UsageStore>,
        config: CollectionConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
            open_csv: CsvSink::create,
        }
    }

    pub fn builder() -> UsageCollectorBuilder {
        UsageCollectorBuilder::new()
    }

    /// Collect all hosts against the base window for the current day
    pub async fn run(&self, hosts: &[Host]) -> Result<RunSummary, CollectError> {
        let base = window::base_window(self.config.local_offset, self.config.offset_hours);
        self.run_from(hosts, base).await
    }

    /// Collect all hosts against an explicit base window
    pub async fn run_from(&self, hosts: &[Host], base: TimeWindow) -> Result<RunSummary, CollectError> {
        let run_stamp = Utc::now()
            .with_timezone(&self.config.local_offset)
            .format(RUN_STAMP_FORMAT)
            .to_string();

        info!(
            hosts = hosts.len(),
            num_hours = self.config.num_hours,
            base_start = base.start,
            base_end = base.end,
            "Starting usage collection"
        );

        let mut summary = RunSummary {
            run_stamp,
            base_window: base,
            hosts: Vec::with_capacity(hosts.len()),
        };

        for host in hosts {
            let host_summary = self.collect_host(host, base, &summary.run_stamp).await?;
            summary.hosts.push(host_summary);
        }

        info!(
            records = summary.records_written(),
            failed_windows = summary.windows_failed(),
            db_errors = summary.db_errors(),
            csv_errors = summary.csv_errors(),
            "Usage collection complete"
        );

        Ok(summary)
    }

    /// Run every window for one host into its own CSV file.
    ///
    /// Failing to open the file aborts the run. A failed write or close
    /// ends this host early and is recorded in its summary.
    async fn collect_host(
        &self,
        host: &Host,
        base: TimeWindow,
        run_stamp: &str,
    ) -> Result<HostSummary, CollectError> {
        let mut sink = (self.open_csv)(&self.config.output_dir, &host.name, run_stamp).map_err(
            |source| CollectError::Csv {
                host: host.name.clone(),
                source,
            },
        )?;
        let mut summary = HostSummary::new(&host.name);
        summary.csv_path = Some(sink.path().to_path_buf());

        info!(host = %host.name, entity_id = host.entity_id, path = %sink.path().display(), "Collecting host");

        'windows: for (hour, window) in window::hourly_windows(base, self.config.num_hours) {
            summary.windows_queried += 1;

            match self.source.fetch(host.entity_id, window).await {
                Err(e) => {
                    summary.windows_failed += 1;
                    warn!(host = %host.name, hour, start = window.start, error = %e, "Query failed, skipping window");
                }
                Ok(body) => match normalize(&body, &host.name, &self.config.local_offset) {
                    Err(e) => {
                        summary.windows_failed += 1;
                        warn!(host = %host.name, hour, start = window.start, error = %e, "Unexpected response shape, skipping window");
                    }
                    Ok(Normalized::NoData) => {
                        summary.windows_empty += 1;
                        info!(host = %host.name, hour, start = window.start, "No data for window");
                    }
                    Ok(Normalized::Records(records)) => {
                        for record in &records {
                            if let Err(e) = self.write_record(&mut sink, record, &mut summary).await {
                                error!(host = %host.name, hour, start = window.start, error = %e, "CSV write failed, stopping host");
                                summary.csv_error = Some(e.to_string());
                                break 'windows;
                            }
                        }
                    }
                },
            }

            self.pace().await;
        }

        if let Err(e) = sink.close() {
            error!(host = %host.name, error = %e, "Failed to close CSV file");
            summary.csv_error.get_or_insert_with(|| e.to_string());
        }

        info!(
            host = %host.name,
            records = summary.records_written,
            empty = summary.windows_empty,
            failed = summary.windows_failed,
            "Finished host"
        );

        Ok(summary)
    }

    /// Write to CSV first; a store failure is logged and counted only
    async fn write_record(
        &self,
        sink: &mut CsvSink,
        record: &UsageRecord,
        summary: &mut HostSummary,
    ) -> Result<(), SinkError> {
        sink.write(record)?;
        summary.records_written += 1;

        match self.store.write(record).await {
            Ok(()) => summary.records_stored += 1,
            Err(e) => {
                summary.db_errors += 1;
                error!(
                    host = %record.hostname,
                    start = record.epoch_start_time,
                    error = %e,
                    "Failed to store usage row"
                );
            }
        }

        debug!(host = %record.hostname, start = record.epoch_start_time, "Recorded usage");
        Ok(())
    }

    async fn pace(&self) {
        if !self.config.pacing.is_zero() {
            tokio::time::sleep(self.config.pacing).await;
        }
    }
}

/// Builder for creating a collector
pub struct UsageCollectorBuilder {
    source: Option<Arc<dyn MetricsSource>>,
    store: Option<Arc<dyn UsageStore>>,
    config: CollectionConfig,
    open_csv: CsvOpener,
}

impl UsageCollectorBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            source: None,
            store: None,
            config: CollectionConfig::default(),
            open_csv: CsvSink::create,
        }
    }

    /// Set the metrics source
    pub fn source(mut self, source: Arc<dyn MetricsSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the relational store
    pub fn store(mut self, store: Arc<dyn UsageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the number of hourly windows per host
    pub fn num_hours(mut self, num_hours: u32) -> Self {
        self.config.num_hours = num_hours;
        self
    }

    /// Set the delay after each window
    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.config.pacing = pacing;
        self
    }

    /// Set the CSV output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Set the extra hours subtracted from the base window
    pub fn offset_hours(mut self, hours: i64) -> Self {
        self.config.offset_hours = hours;
        self
    }

    /// Set the local offset for midnight and timestamps
    pub fn local_offset(mut self, offset: FixedOffset) -> Self {
        self.config.local_offset = offset;
        self
    }

    /// Replace how per-host CSV files are opened
    pub fn csv_opener(mut self, open_csv: CsvOpener) -> Self {
        self.open_csv = open_csv;
        self
    }

    /// Build the collector
    pub fn build(self) -> Result<UsageCollector, CollectError> {
        let source = self
            .source
            .ok_or_else(|| CollectError::Config("metrics source is required".to_string()))?;
        let store = self
            .store
            .ok_or_else(|| CollectError::Config("usage store is required".to_string()))?;

        if self.config.num_hours == 0 || self.config.num_hours > HOURS_PER_DAY {
            return Err(CollectError::Config(format!(
                "num_hours must be between 1 and {}, got {}",
                HOURS_PER_DAY, self.config.num_hours
            )));
        }

        let mut collector = UsageCollector::new(source, store, self.config);
        collector.open_csv = self.open_csv;
        Ok(collector)
    }
}

impl Default for UsageCollectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
