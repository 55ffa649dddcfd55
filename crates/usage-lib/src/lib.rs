//! Library for collecting hourly host resource usage
//!
//! This crate provides the core functionality for:
//! - Computing the rolling hourly query windows
//! - Querying averaged CPU, memory and disk usage over NRQL
//! - Normalizing query responses into usage records
//! - Writing records to CSV files and a relational table

pub mod collector;
pub mod error;
pub mod models;
pub mod normalize;
pub mod query;
pub mod sink;
pub mod window;

pub use collector::{CollectionConfig, HostSummary, RunSummary, UsageCollector, UsageCollectorBuilder};
pub use error::{CollectError, QueryError, ShapeError, SinkError};
pub use models::*;
pub use normalize::{normalize, Normalized};
pub use query::{MetricsSource, NewRelicClient, NewRelicCredentials, NrqlQuery};
pub use sink::{CsvOpener, CsvSink, PooledUsageStore, SqlUsageStore, UsageStore};
