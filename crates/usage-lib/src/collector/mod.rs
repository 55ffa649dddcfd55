//! Collection run orchestration
//!
//! A run walks the configured hosts in order. For each host it opens one
//! CSV file, queries every hourly window in turn, and writes the normalized
//! records to the CSV file and the relational store.

mod run;
mod summary;


pub use run::{CollectionConfig, UsageCollector, UsageCollectorBuilder, RUN_STAMP_FORMAT};
pub use summary::{HostSummary, RunSummary};
