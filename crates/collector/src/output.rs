//! Run summary output

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};
use usage_lib::{HostSummary, RunSummary};

/// Output format for the run summary
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for the per-host summary table
#[derive(Tabled)]
struct HostRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Windows")]
    windows: usize,
    #[tabled(rename = "Empty")]
    empty: String,
    #[tabled(rename = "Failed")]
    failed: String,
    #[tabled(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "DB Errors")]
    db_errors: String,
    #[tabled(rename = "CSV")]
    csv: String,
}

impl From<&HostSummary> for HostRow {
    fn from(summary: &HostSummary) -> Self {
        Self {
            host: summary.host.clone(),
            windows: summary.windows_queried,
            empty: color_count(summary.windows_empty, false),
            failed: color_count(summary.windows_failed, true),
            rows: summary.records_written,
            db_errors: color_count(summary.db_errors, true),
            csv: match (&summary.csv_path, &summary.csv_error) {
                (_, Some(e)) => format!("write failed: {}", e).red().to_string(),
                (Some(p), None) => p.display().to_string(),
                (None, None) => "-".to_string(),
            },
        }
    }
}

/// Print the summary of a finished run
pub fn print_summary(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Table => {
            if summary.hosts.is_empty() {
                print_warning("No hosts were collected");
                return Ok(());
            }

            let rows: Vec<HostRow> = summary.hosts.iter().map(HostRow::from).collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);

            let message = format!(
                "Collected {} rows for {} hosts (run {})",
                summary.records_written(),
                summary.hosts.len(),
                summary.run_stamp
            );
            if summary.windows_failed() > 0 || summary.db_errors() > 0 || summary.csv_errors() > 0 {
                print_warning(&message);
            } else {
                print_success(&message);
            }
        }
    }

    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Highlight non-zero counts, red for errors and yellow otherwise
fn color_count(count: usize, is_error: bool) -> String {
    let text = count.to_string();
    match (count, is_error) {
        (0, _) => text,
        (_, true) => text.red().to_string(),
        (_, false) => text.yellow().to_string(),
    }
}
