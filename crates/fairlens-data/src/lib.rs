#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/fairlens/fairlens/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod binning;
pub mod dataset;
pub mod error;

pub use binning::{BinKind, BinningConfig, FeatureBinning};
pub use dataset::{Dataset, DatasetConfig, Feature, FeatureValues, ModelPredictions};
pub use error::{DataError, Result};

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
