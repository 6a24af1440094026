#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/fairlens/fairlens/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod parity;
pub mod registry;
pub mod scoring;
pub mod value;

pub use error::{MetricError, Result};
pub use parity::{ParityMode, disparity};
pub use registry::{
    FairnessMetricInfo, MetricCategory, MetricInfo, PerformanceMetric, available_fairness_metrics,
    available_metrics, get_fairness_metric_info, get_metric_info, list_metric_keys,
    metrics_by_category,
};
pub use scoring::{MIN_GROUP_LIMIT, score, score_by_group};
pub use value::MetricValue;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
