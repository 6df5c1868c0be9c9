//! Error types for dataset loading, persistence and views.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`DatasetError`].
pub type Result<T> = std::result::Result<T, DatasetError>;

/// Every failure the crate reports to its caller.
///
/// None of these are fatal to the process; a failed load is never cached,
/// so retrying the same call performs the load again.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The logical name does not resolve to an existing file.
    #[error("Data set '{name}' not found at {}", .path.display())]
    NotFound { name: String, path: PathBuf },

    /// Malformed persisted table.
    #[error("Format error on line {line}: {message}")]
    Format { line: usize, message: String },

    /// Row position or base-row index outside the valid bounds.
    #[error("Index {index} out of range [0, {len})")]
    IndexOutOfRange { index: i64, len: usize },

    /// Structural mutation attempted through an indexed view.
    #[error(
        "Cannot mutate indexed view {reference}:{rows}. \
         If it's absolutely necessary, materialize a mutable copy first"
    )]
    ImmutableView { reference: String, rows: usize },

    /// Zero columns, duplicate attribute names, mismatched values and similar.
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// A view was offered as the base of another view.
    #[error(
        "Indexed views are flattened, not wrapped: call flatten on the view \
         instead (data set reference: {reference})"
    )]
    NestedView { reference: String },

    /// The store's directory layout is unusable.
    #[error("Illegal path {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatasetError {
    pub fn format(line: usize, message: impl Into<String>) -> Self {
        DatasetError::Format {
            line,
            message: message.into(),
        }
    }

    pub fn invalid_table(message: impl Into<String>) -> Self {
        DatasetError::InvalidTable(message.into())
    }

    pub fn out_of_range(index: usize, len: usize) -> Self {
        DatasetError::IndexOutOfRange {
            index: index as i64,
            len,
        }
    }
}
