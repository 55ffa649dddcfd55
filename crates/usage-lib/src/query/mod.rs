//! Metrics queries against the New Relic Insights API
//!
//! The collector only depends on the [`MetricsSource`] trait, so tests and
//! alternative backends can stand in for the HTTP client.

mod client;
mod nrql;


pub use client::{NewRelicClient, NewRelicCredentials, DEFAULT_ENDPOINT};
pub use nrql::NrqlQuery;

use crate::error::QueryError;
use crate::models::TimeWindow;

pub use async_trait::async_trait;

/// Source of averaged usage data for one entity over one window
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Run the usage query and return the parsed response body
    async fn fetch(&self, entity_id: u64, window: TimeWindow) -> Result<serde_json::Value, QueryError>;
}
