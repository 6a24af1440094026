//! Error types for metric scoring.

use thiserror::Error;

/// Result type for metric operations.
pub type Result<T> = std::result::Result<T, MetricError>;

/// Errors that can occur while scoring a metric.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    /// Metric key is not in the catalogue
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Input slices disagree in length
    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Which input was the wrong length
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Group index in a bin vector is beyond the allowed group count
    #[error("Invalid bin {bin} at row {row}: group indices must be below {limit}")]
    InvalidBin {
        /// Row holding the index
        row: usize,
        /// Offending group index
        bin: usize,
        /// Exclusive upper bound on group indices
        limit: usize,
    },
}
