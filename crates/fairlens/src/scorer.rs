//! In-process metric scoring.

use fairlens_cache::{FetchError, MetricFetcher, MetricRequest};
use fairlens_data::Dataset;
use fairlens_metrics::{MetricValue, score, score_by_group};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// Fetcher that scores requests against an in-memory dataset.
///
/// Scoring runs on the runtime's blocking pool. An empty bin vector scores
/// the whole cohort only.
#[derive(Debug, Clone)]
pub struct LocalMetricScorer {
    dataset: Arc<Dataset>,
}

impl LocalMetricScorer {
    /// Create a scorer over a dataset.
    pub const fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    /// Dataset requests are scored against.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Score a request on the calling thread.
    pub fn score_request(&self, request: &MetricRequest) -> Result<MetricValue, FetchError> {
        let dataset = &self.dataset;
        let predictions = dataset.predictions(request.model_index).ok_or_else(|| {
            FetchError::InvalidRequest(format!(
                "model index {} out of range ({} models)",
                request.model_index,
                dataset.model_count()
            ))
        })?;

        if request.bin_vector.is_empty() {
            let global = score(&request.metric_key, dataset.labels(), predictions)
                .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
            return Ok(MetricValue::new(global, None));
        }

        if request.bin_vector.len() != dataset.row_count() {
            return Err(FetchError::InvalidRequest(format!(
                "bin vector has {} entries, dataset has {} rows",
                request.bin_vector.len(),
                dataset.row_count()
            )));
        }

        score_by_group(
            &request.metric_key,
            dataset.labels(),
            predictions,
            &request.bin_vector,
        )
        .map_err(|e| FetchError::InvalidRequest(e.to_string()))
    }
}

impl MetricFetcher for LocalMetricScorer {
    fn fetch(&self, request: MetricRequest) -> BoxFuture<'static, Result<MetricValue, FetchError>> {
        let scorer = self.clone();
        async move {
            debug!(
                metric_key = %request.metric_key,
                model_index = request.model_index,
                "scoring metric locally"
            );
            tokio::task::spawn_blocking(move || scorer.score_request(&request))
                .await
                .map_err(|e| FetchError::Scoring(e.to_string()))?
        }
        .boxed()
    }
}
