#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/fairlens/fairlens/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assessment;
pub mod error;
pub mod scorer;

// Re-export main types from sub-crates
pub use fairlens_cache as cache;
pub use fairlens_data as data;
pub use fairlens_metrics as metrics;
pub use fairlens_output as output;

pub use assessment::{FairnessAssessment, ModelEvaluation};
pub use error::{AssessmentError, Result};
pub use scorer::LocalMetricScorer;

// Re-export the types most callers need
pub use fairlens_cache::{MetricFetcher, MetricRequest, MetricsCache, PrecomputedMetrics};
pub use fairlens_data::{BinningConfig, Dataset, DatasetConfig, FeatureBinning};
pub use fairlens_metrics::{MetricValue, ParityMode};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
