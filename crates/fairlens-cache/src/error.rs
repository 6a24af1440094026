//! Error types for the metric cache and its fetchers.

use thiserror::Error;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors raised by a [`MetricFetcher`](crate::MetricFetcher).
///
/// Cloneable so that one failed fetch can be reported to every caller that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Scoring service answered with a non-success status
    #[error("HTTP error {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// Response body was not a metric value
    #[error("Decode error: {0}")]
    Decode(String),

    /// Request cannot be scored (bad model index, bin vector length, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Scoring itself failed
    #[error("Scoring error: {0}")]
    Scoring(String),
}

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Feature or model index outside the cache grid
    #[error("{axis} index {index} out of range (size {size})")]
    IndexOutOfRange {
        /// Which axis of the grid
        axis: &'static str,
        /// Requested index
        index: usize,
        /// Size of the axis
        size: usize,
    },

    /// Upstream fetch failed
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Caller cancelled while waiting for a fetch
    #[error("Metric request cancelled")]
    Cancelled,

    /// Precomputed grid is malformed
    #[error("Invalid precomputed metrics: {0}")]
    InvalidPrecomputed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
