//! System usage collector
//!
//! Queries New Relic for the hourly CPU, memory and disk averages of each
//! configured host over the previous day, then writes them to one CSV file
//! per host and to the `tableau_system_usage` table.

mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use usage_lib::{NewRelicClient, PooledUsageStore, SqlUsageStore, UsageCollector, UsageStore};

/// Collect hourly host usage from New Relic into CSV and SQL
#[derive(Parser)]
#[command(name = "system-usage")]
#[command(author, version, about = "System usage collector for New Relic hosts", long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short, env = "SYSTEM_USAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of hourly windows to collect per host (overrides num_hours)
    #[arg(long)]
    pub hours: Option<u32>,

    /// Directory for the CSV files (overrides output_dir)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Summary output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // JSON logs on stderr keep stdout for the summary
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    info!("Starting system-usage collector");

    let mut config = config::AppConfig::load(cli.config.as_deref())?;
    if let Some(hours) = cli.hours {
        config.num_hours = hours;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    config.validate().context("Invalid configuration")?;

    info!(
        account_id = config.newrelic.account_id,
        hosts = config.hosts.len(),
        pooled = config.database.pooled,
        "Collector configured"
    );

    let source = Arc::new(
        NewRelicClient::new(config.credentials()).context("Failed to create New Relic client")?,
    );

    let database_url = config.database.connection_url()?;
    let store: Arc<dyn UsageStore> = if config.database.pooled {
        Arc::new(
            PooledUsageStore::connect(&database_url, config.database.max_connections)
                .await
                .context("Failed to connect database pool")?,
        )
    } else {
        Arc::new(SqlUsageStore::new(database_url))
    };

    let collector = UsageCollector::new(source, store, config.collection_config()?);
    let summary = collector.run(&config.hosts()).await?;

    output::print_summary(&summary, cli.format)?;

    Ok(())
}
