//! Output sinks for usage records
//!
//! Two independent writers consume every record:
//! - A per-host CSV file, the primary artifact of a run
//! - The `tableau_system_usage` relational table

mod csv_file;
mod sql;

pub use csv_file::{file_name, CsvOpener, CsvSink, CSV_HEADER};
pub use sql::{ensure_table, table_exists, PooledUsageStore, SqlUsageStore, CREATE_TABLE_SQL, TABLE_NAME};

use crate::error::SinkError;
use crate::models::UsageRecord;

pub use async_trait::async_trait;

/// Relational destination for usage records
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Persist one record, creating the table first if needed
    async fn write(&self, record: &UsageRecord) -> Result<(), SinkError>;
}
