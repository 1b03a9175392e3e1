//! Append-only history of telemetry polls.
//!
//! One CSV row per successful poll under a fixed header. The file is only
//! ever appended to; the daemon never reads it back.

use irrig_shared::{IrrigError, Reading};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// Column names, in row order
pub const COLUMNS: [&str; 4] = ["timestamp", "temp", "hum", "soil"];

/// Header line as it appears in the file
pub const HEADER: &str = "timestamp,temp,hum,soil";

#[derive(Debug)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    /// Ensure the log exists with its header. Existing content is kept.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, IrrigError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let needs_header = match fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        if needs_header {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let mut writer = row_writer(file);
            writer.write_record(COLUMNS).map_err(csv_error)?;
            writer.flush()?;
            info!("Created history log {}", path.display());
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one reading and flush.
    pub fn append(&self, reading: &Reading) -> Result<(), IrrigError> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                IrrigError::History(format!("cannot open {}: {}", self.path.display(), e))
            })?;

        let mut writer = row_writer(file);
        writer.write_record(record(reading)).map_err(csv_error)?;
        writer.flush()?;
        Ok(())
    }
}

fn row_writer(file: File) -> csv::Writer<File> {
    csv::WriterBuilder::new().has_headers(false).from_writer(file)
}

fn csv_error(e: csv::Error) -> IrrigError {
    IrrigError::History(format!("cannot write row: {}", e))
}

/// Cells for one reading. Missing values are empty.
fn record(reading: &Reading) -> [String; 4] {
    let cell = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    [
        reading.timestamp.clone(),
        cell(reading.temperature),
        cell(reading.humidity),
        cell(reading.soil_moisture),
    ]
}
