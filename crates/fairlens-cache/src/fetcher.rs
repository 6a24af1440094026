//! Metric requests and the fetcher seam.
//!
//! A fetcher turns a [`MetricRequest`] into a [`MetricValue`]. The request is
//! also the JSON body sent to a remote scoring service:
//!
//! ```json
//! { "metricKey": "accuracy_score", "binVector": [0, 1, 1], "modelIndex": 0 }
//! ```
//!
//! The feature index a value is cached under is not part of the request; the
//! bin vector already encodes the binning of that feature.

use crate::error::FetchError;
use fairlens_metrics::MetricValue;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// A request to score one metric for one model under one binning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRequest {
    /// Metric key, e.g. `"selection_rate"`
    pub metric_key: String,
    /// Group index of every dataset row
    pub bin_vector: Vec<usize>,
    /// Model whose predictions are scored
    pub model_index: usize,
}

impl MetricRequest {
    /// Create a new request.
    pub fn new(metric_key: impl Into<String>, bin_vector: Vec<usize>, model_index: usize) -> Self {
        Self {
            metric_key: metric_key.into(),
            bin_vector,
            model_index,
        }
    }
}

/// Source of metric values for cache misses.
///
/// The returned future must own everything it needs so that the cache can
/// share it between concurrent callers.
pub trait MetricFetcher: Send + Sync {
    /// Score the requested metric.
    fn fetch(&self, request: MetricRequest) -> BoxFuture<'static, Result<MetricValue, FetchError>>;
}

/// Adapter turning an async closure into a [`MetricFetcher`].
pub struct FnFetcher<F> {
    f: F,
}

impl<F> fmt::Debug for FnFetcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}

/// Wrap an async closure as a fetcher.
///
/// # Examples
///
/// ```
/// use fairlens_cache::{FetchError, MetricFetcher, MetricRequest, fetch_fn};
/// use fairlens_metrics::MetricValue;
///
/// let fetcher = fetch_fn(|request: MetricRequest| async move {
///     Ok::<_, FetchError>(MetricValue::global_only(request.model_index as f64))
/// });
/// # let _ = fetcher.fetch(MetricRequest::new("average", vec![], 2));
/// ```
pub const fn fetch_fn<F, Fut>(f: F) -> FnFetcher<F>
where
    F: Fn(MetricRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<MetricValue, FetchError>> + Send + 'static,
{
    FnFetcher { f }
}

impl<F, Fut> MetricFetcher for FnFetcher<F>
where
    F: Fn(MetricRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<MetricValue, FetchError>> + Send + 'static,
{
    fn fetch(&self, request: MetricRequest) -> BoxFuture<'static, Result<MetricValue, FetchError>> {
        (self.f)(request).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = MetricRequest::new("accuracy_score", vec![0, 1, 1], 2);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "metricKey": "accuracy_score",
                "binVector": [0, 1, 1],
                "modelIndex": 2
            })
        );

        let parsed: MetricRequest = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, request);
    }

    #[tokio::test]
    async fn test_fn_fetcher() {
        let fetcher = fetch_fn(|request: MetricRequest| async move {
            if request.metric_key == "broken" {
                Err(FetchError::Scoring("boom".to_string()))
            } else {
                Ok(MetricValue::global_only(request.bin_vector.len() as f64))
            }
        });

        let value = fetcher
            .fetch(MetricRequest::new("average", vec![0, 0, 1], 0))
            .await
            .unwrap();
        assert_eq!(value.global, Some(3.0));

        let err = fetcher
            .fetch(MetricRequest::new("broken", vec![], 0))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Scoring("boom".to_string()));
    }
}
