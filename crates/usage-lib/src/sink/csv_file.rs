//! Per-host CSV output

use crate::error::SinkError;
use crate::models::UsageRecord;
use csv::{Writer, WriterBuilder};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Header line written once when a file is created
pub const CSV_HEADER: &str =
    "hostname, epoch_start_time, epoch_end_time, start_date_time, end_date_time, cpu_avg, mem_avg, disk_avg";

/// Signature of the function that opens a host's CSV sink for a run
pub type CsvOpener = fn(&Path, &str, &str) -> Result<CsvSink, SinkError>;

/// Append-only CSV writer for one host's run
pub struct CsvSink {
    writer: Writer<Box<dyn Write + Send>>,
    path: PathBuf,
    rows: usize,
}

impl CsvSink {
    /// Create the file for `hostname` under `dir`, named with the run stamp.
    ///
    /// Fails if the file already exists, so two runs never share a file.
    pub fn create(dir: &Path, hostname: &str, run_stamp: &str) -> Result<Self, SinkError> {
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        let path = dir.join(file_name(hostname, run_stamp));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;

        debug!(path = %path.display(), "Created CSV sink");
        Self::from_writer(file, path)
    }

    /// Wrap an arbitrary writer, writing the header first
    pub fn from_writer<W: Write + Send + 'static>(
        mut writer: W,
        path: impl Into<PathBuf>,
    ) -> Result<Self, SinkError> {
        let path = path.into();
        writeln!(writer, "{}", CSV_HEADER).map_err(|e| io_error(&path, e))?;

        let writer: Box<dyn Write + Send> = Box::new(writer);
        Ok(Self {
            writer: WriterBuilder::new().has_headers(false).from_writer(writer),
            path,
            rows: 0,
        })
    }

    /// Append one record and flush it to disk
    pub fn write(&mut self, record: &UsageRecord) -> Result<(), SinkError> {
        self.writer.serialize(record)?;
        self.writer.flush().map_err(|e| io_error(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows written through this sink
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and close the file, returning its path
    pub fn close(mut self) -> Result<PathBuf, SinkError> {
        self.writer.flush().map_err(|e| io_error(&self.path, e))?;
        Ok(self.path)
    }
}

/// File name for a host's CSV in one run
pub fn file_name(hostname: &str, run_stamp: &str) -> String {
    let host: String = hostname
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}.csv", host, run_stamp)
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.display().to_string(),
        source,
    }
}
