//! Error types for dataset operations.

use thiserror::Error;

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading or binning a dataset.
#[derive(Debug, Error)]
pub enum DataError {
    /// CSV reading error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Named column is not in the file
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Cell of a numeric column could not be parsed
    #[error("Non-numeric value {value:?} in column {column} at row {row}")]
    NonNumeric {
        /// Column name
        column: String,
        /// Zero-based data row
        row: usize,
        /// Offending cell
        value: String,
    },

    /// Column length disagrees with the label column
    #[error("Column {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        /// Column name
        column: String,
        /// Number of labels
        expected: usize,
        /// Number of values in the column
        actual: usize,
    },

    /// Dataset has no rows
    #[error("Dataset is empty: {0}")]
    Empty(String),

    /// Configuration cannot describe a valid dataset or binning
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
