#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/fairlens/fairlens/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod error;
pub mod fetcher;
pub mod metrics_cache;
pub mod precomputed;
pub mod remote;
pub mod stats;

pub use cancel::CancellationToken;
pub use error::{CacheError, FetchError, Result};
pub use fetcher::{FnFetcher, MetricFetcher, MetricRequest, fetch_fn};
pub use metrics_cache::MetricsCache;
pub use precomputed::{MetricMap, PrecomputedMetrics};
pub use remote::{HttpMetricFetcher, RemoteConfig};
pub use stats::CacheStatsSnapshot;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
