//! HTTP client for the Insights query endpoint

use super::{async_trait, MetricsSource, NrqlQuery};
use crate::error::QueryError;
use crate::models::TimeWindow;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Public Insights API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://insights-api.newrelic.com";

const QUERY_KEY_HEADER: &str = "X-Query-Key";

/// Account and key used to authenticate queries
#[derive(Debug, Clone)]
pub struct NewRelicCredentials {
    pub account_id: u64,
    pub query_key: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl NewRelicCredentials {
    pub fn new(account_id: u64, query_key: impl Into<String>) -> Self {
        Self {
            account_id,
            query_key: query_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Insights API client issuing one GET per query
pub struct NewRelicClient {
    client: Client,
    base_url: Url,
    account_id: u64,
    query_key: String,
}

impl NewRelicClient {
    /// Create a new client with its own connection settings
    pub fn new(credentials: NewRelicCredentials) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(credentials.timeout)
            .build()
            .map_err(QueryError::Transport)?;

        Self::with_client(client, credentials)
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_client(client: Client, credentials: NewRelicCredentials) -> Result<Self, QueryError> {
        let base_url = Url::parse(&credentials.endpoint)?;

        Ok(Self {
            client,
            base_url,
            account_id: credentials.account_id,
            query_key: credentials.query_key,
        })
    }

    /// Full request URL for a query, with the NRQL text URL-encoded
    pub fn query_url(&self, query: &NrqlQuery) -> Result<Url, QueryError> {
        let mut url = self
            .base_url
            .join(&format!("v1/accounts/{}/query", self.account_id))?;
        url.query_pairs_mut().append_pair("nrql", &query.to_string());
        Ok(url)
    }
}

#[async_trait]
impl MetricsSource for NewRelicClient {
    async fn fetch(&self, entity_id: u64, window: TimeWindow) -> Result<serde_json::Value, QueryError> {
        let query = NrqlQuery::system_usage(entity_id, window);
        let url = self.query_url(&query)?;

        debug!(entity_id, start = window.start, end = window.end, "Querying usage");

        let response = self
            .client
            .get(url)
            .header(QUERY_KEY_HEADER, &self.query_key)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(QueryError::Transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Status { status, body });
        }

        let body = response.bytes().await.map_err(QueryError::Transport)?;
        serde_json::from_slice(&body).map_err(QueryError::Decode)
    }
}
