//! Error types for fairness assessments.

use fairlens_cache::CacheError;
use fairlens_data::DataError;
use thiserror::Error;

/// Result type for assessment operations.
pub type Result<T> = std::result::Result<T, AssessmentError>;

/// Errors that can occur during an assessment.
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// Dataset or binning error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Metric cache error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Performance metric key is not in the catalogue
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Fairness metric key is not in the catalogue
    #[error("Unknown fairness metric: {0}")]
    UnknownFairnessMetric(String),

    /// Feature index past the last sensitive feature
    #[error("Feature index {index} out of range ({count} features)")]
    FeatureOutOfRange {
        /// Requested index
        index: usize,
        /// Number of features
        count: usize,
    },

    /// Precomputed grid does not match the dataset
    #[error("Precomputed grid is {actual:?} (features, models), dataset needs {expected:?}")]
    ShapeMismatch {
        /// (features, models) of the dataset
        expected: (usize, usize),
        /// (features, models) of the grid
        actual: (usize, usize),
    },
}
