//! Error types for usage collection

use thiserror::Error;

/// Failure talking to the metrics API
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A query response that does not have the expected facet layout
#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("response is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("malformed {context}: {message}")]
    Malformed {
        context: &'static str,
        message: String,
    },

    #[error("time series point has no aggregate at position {index}")]
    MissingAggregate { index: usize },

    #[error("unrecognized average value at position {index}: {value}")]
    InvalidAverage { index: usize, value: String },

    #[error("epoch {0} is out of range for a timestamp")]
    InvalidTimestamp(i64),
}

/// Failure writing a record to one of the sinks
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors that abort a collection run
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("csv sink failed for host {host}: {source}")]
    Csv {
        host: String,
        #[source]
        source: SinkError,
    },

    #[error("collector misconfigured: {0}")]
    Config(String),
}
