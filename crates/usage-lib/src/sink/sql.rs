//! Relational sink for the `tableau_system_usage` table
//!
//! [`SqlUsageStore`] runs a full connect, ensure-table, insert, commit and
//! close cycle for every record. [`PooledUsageStore`] does the same against a
//! pooled connection that is returned to the pool when the write finishes.
//! Both go through `sqlx::Any`, so PostgreSQL and SQLite URLs work alike.

use super::{async_trait, UsageStore};
use crate::error::SinkError;
use crate::models::UsageRecord;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::{AnyConnection, AnyPool, Connection};
use tracing::{debug, info, warn};

pub const TABLE_NAME: &str = "tableau_system_usage";

pub const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE tableau_system_usage (
        hostname VARCHAR(64),
        epoch_start_time BIGINT,
        epoch_end_time BIGINT,
        start_time VARCHAR(32),
        end_time VARCHAR(32),
        cpu_avg DOUBLE PRECISION,
        mem_avg DOUBLE PRECISION,
        disk_avg DOUBLE PRECISION
    )
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO tableau_system_usage (hostname, epoch_start_time, epoch_end_time,
                                      start_time, end_time, cpu_avg, mem_avg, disk_avg)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

const SQLITE_TABLE_EXISTS_SQL: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1";

// Scoped to the schema an unqualified CREATE TABLE writes to
const POSTGRES_TABLE_EXISTS_SQL: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_name = $1 AND table_schema = current_schema()";

/// Whether the usage table exists on this connection's database
pub async fn table_exists(conn: &mut AnyConnection) -> Result<bool, sqlx::Error> {
    let sql = if conn.backend_name().eq_ignore_ascii_case("sqlite") {
        SQLITE_TABLE_EXISTS_SQL
    } else {
        POSTGRES_TABLE_EXISTS_SQL
    };

    let count: i64 = sqlx::query_scalar(sql)
        .bind(TABLE_NAME)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// Create the usage table unless it already exists.
///
/// Returns `true` when this call created the table.
pub async fn ensure_table(conn: &mut AnyConnection) -> Result<bool, sqlx::Error> {
    if table_exists(conn).await? {
        return Ok(false);
    }

    sqlx::query(CREATE_TABLE_SQL).execute(&mut *conn).await?;
    info!(table = TABLE_NAME, "Created usage table");
    Ok(true)
}

async fn insert(conn: &mut AnyConnection, record: &UsageRecord) -> Result<(), sqlx::Error> {
    sqlx::query(INSERT_SQL)
        .bind(record.hostname.as_str())
        .bind(record.epoch_start_time)
        .bind(record.epoch_end_time)
        .bind(record.start_date_time.as_str())
        .bind(record.end_date_time.as_str())
        .bind(record.cpu_avg)
        .bind(record.mem_avg)
        .bind(record.disk_avg)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn write_record(conn: &mut AnyConnection, record: &UsageRecord) -> Result<(), sqlx::Error> {
    ensure_table(conn).await?;

    let mut tx = conn.begin().await?;
    insert(&mut tx, record).await?;
    tx.commit().await?;

    debug!(
        host = %record.hostname,
        start = record.epoch_start_time,
        "Inserted usage row"
    );
    Ok(())
}

/// Store that opens a fresh connection for every record
#[derive(Debug, Clone)]
pub struct SqlUsageStore {
    url: String,
}

impl SqlUsageStore {
    pub fn new(url: impl Into<String>) -> Self {
        install_default_drivers();
        Self { url: url.into() }
    }
}

#[async_trait]
impl UsageStore for SqlUsageStore {
    async fn write(&self, record: &UsageRecord) -> Result<(), SinkError> {
        let mut conn = AnyConnection::connect(&self.url).await?;

        let result = write_record(&mut conn, record).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close database connection");
        }

        result.map_err(SinkError::from)
    }
}

/// Store that borrows connections from a shared pool
#[derive(Debug, Clone)]
pub struct PooledUsageStore {
    pool: AnyPool,
}

impl PooledUsageStore {
    /// Connect a pool with at most `max_connections` connections
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, SinkError> {
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl UsageStore for PooledUsageStore {
    async fn write(&self, record: &UsageRecord) -> Result<(), SinkError> {
        let mut conn = self.pool.acquire().await?;
        write_record(&mut conn, record).await?;
        Ok(())
    }
}
