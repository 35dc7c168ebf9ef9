//! Error types for the gapfill library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for gapfill operations.
///
/// Lookup misses (unknown key, row out of range) are not errors; they surface
/// as empty results. Only configuration and I/O faults end up here.
#[derive(Debug, Error)]
pub enum GapfillError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target file is held open by another process.
    #[error("File '{path}' is locked by another program. Close the file and retry.")]
    FileLocked { path: PathBuf },

    /// A timestamped output name is already taken.
    #[error("Output file '{path}' already exists")]
    OutputExists { path: PathBuf },

    /// A named column does not exist in a dataset.
    #[error("Column '{column}' not found in {dataset}")]
    MissingColumn { dataset: String, column: String },

    /// A column name cannot be used.
    #[error("Invalid column name '{0}'")]
    InvalidColumn(String),

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error reading a spreadsheet.
    #[error("Spreadsheet error: {0}")]
    Excel(#[from] calamine::Error),

    /// Error writing a spreadsheet.
    #[error("Workbook write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// File format not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Empty file or no data to load.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GapfillError {
    /// Build an I/O error, classifying permission failures as a locked file.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            GapfillError::FileLocked { path }
        } else {
            GapfillError::Io { path, source }
        }
    }

    /// Whether the operation can succeed if retried after user action.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GapfillError::FileLocked { .. })
    }
}

/// Result type alias for gapfill operations.
pub type Result<T> = std::result::Result<T, GapfillError>;
