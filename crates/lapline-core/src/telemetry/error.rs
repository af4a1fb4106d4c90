//! Telemetry load errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort loading a telemetry file
///
/// Individual malformed rows are not errors; they are skipped and counted in
/// the [`LoadReport`](super::LoadReport).
#[derive(Error, Debug)]
pub enum LoadError {
    /// The telemetry path does not exist
    #[error("Telemetry file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file could not be read
    #[error("I/O error reading telemetry: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV header could not be read
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header
    #[error("Missing required column '{0}'")]
    MissingColumn(String),
}
