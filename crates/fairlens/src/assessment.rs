//! Fairness assessment over a dataset.
//!
//! A [`FairnessAssessment`] owns the binning of every sensitive feature and a
//! [`MetricsCache`] sized `features x models`. Evaluations read through the
//! cache, so each (feature, model, metric) triple is scored at most once until
//! its feature is rebinned.

use crate::error::{AssessmentError, Result};
use crate::scorer::LocalMetricScorer;
use fairlens_cache::{MetricFetcher, MetricsCache, PrecomputedMetrics};
use fairlens_data::{BinningConfig, Dataset, FeatureBinning};
use fairlens_metrics::{
    FairnessMetricInfo, MetricInfo, MetricValue, get_fairness_metric_info, get_metric_info,
};
use fairlens_output::{AssessmentReport, ModelRow};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::info;

/// Scores of one model for one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEvaluation {
    /// Model index in the dataset.
    pub model_index: usize,

    /// Model name.
    pub model: String,

    /// Performance metric, `None` when not computable.
    pub performance: Option<MetricValue>,

    /// Fairness metric, `NaN` when not computable.
    pub fairness: f64,
}

impl ModelEvaluation {
    /// Convert to a report row with one entry per group.
    pub fn to_row(&self, group_count: usize) -> ModelRow {
        let (global, mut bins) = self
            .performance
            .as_ref()
            .map_or((None, Vec::new()), |value| {
                (value.global, value.bins.clone().unwrap_or_default())
            });
        bins.resize(group_count, None);
        ModelRow::new(self.model.clone(), global, bins, self.fairness)
    }
}

/// Binnings, models and metric cache of one assessment.
#[derive(Debug)]
pub struct FairnessAssessment {
    dataset: Arc<Dataset>,
    binnings: Vec<FeatureBinning>,
    cache: MetricsCache,
}

fn build_binnings(dataset: &Dataset, config: &BinningConfig) -> Result<Vec<FeatureBinning>> {
    dataset
        .features()
        .iter()
        .map(|feature| FeatureBinning::build(feature, config).map_err(AssessmentError::from))
        .collect()
}

fn performance_info(key: &str) -> Result<MetricInfo> {
    get_metric_info(key).ok_or_else(|| AssessmentError::UnknownMetric(key.to_string()))
}

fn fairness_info(key: &str) -> Result<FairnessMetricInfo> {
    get_fairness_metric_info(key)
        .ok_or_else(|| AssessmentError::UnknownFairnessMetric(key.to_string()))
}

impl FairnessAssessment {
    /// Create an assessment whose cache fetches misses from `fetcher`.
    pub fn new(
        dataset: impl Into<Arc<Dataset>>,
        binning_config: &BinningConfig,
        fetcher: Arc<dyn MetricFetcher>,
    ) -> Result<Self> {
        let dataset = dataset.into();
        let binnings = build_binnings(&dataset, binning_config)?;
        let cache = MetricsCache::new(binnings.len(), dataset.model_count(), Some(fetcher));
        Ok(Self {
            dataset,
            binnings,
            cache,
        })
    }

    /// Create an assessment that scores misses in process.
    pub fn local(dataset: impl Into<Arc<Dataset>>, binning_config: &BinningConfig) -> Result<Self> {
        let dataset = dataset.into();
        let scorer = LocalMetricScorer::new(Arc::clone(&dataset));
        Self::new(dataset, binning_config, Arc::new(scorer))
    }

    /// Create an assessment seeded from a precomputed grid.
    ///
    /// Without a fetcher, metrics missing from the grid are not computable.
    /// The grid must have one row per feature and one column per model.
    pub fn with_precomputed(
        dataset: impl Into<Arc<Dataset>>,
        binning_config: &BinningConfig,
        precomputed: PrecomputedMetrics,
        fetcher: Option<Arc<dyn MetricFetcher>>,
    ) -> Result<Self> {
        let dataset = dataset.into();
        let binnings = build_binnings(&dataset, binning_config)?;

        let expected = (binnings.len(), dataset.model_count());
        let actual = (precomputed.feature_count(), precomputed.model_count());
        if expected != actual {
            return Err(AssessmentError::ShapeMismatch { expected, actual });
        }

        let cache = MetricsCache::from_precomputed(precomputed, fetcher)?;
        Ok(Self {
            dataset,
            binnings,
            cache,
        })
    }

    /// Dataset under assessment.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Current binning of every feature.
    pub fn binnings(&self) -> &[FeatureBinning] {
        &self.binnings
    }

    /// Current binning of one feature.
    pub fn binning(&self, feature_index: usize) -> Result<&FeatureBinning> {
        self.binnings
            .get(feature_index)
            .ok_or(AssessmentError::FeatureOutOfRange {
                index: feature_index,
                count: self.binnings.len(),
            })
    }

    /// Metric cache.
    pub const fn cache(&self) -> &MetricsCache {
        &self.cache
    }

    /// Evaluate every model on one feature.
    ///
    /// Models are evaluated concurrently. The fairness score combines the
    /// disparities of the fairness metric's base metrics with its parity mode.
    ///
    /// # Arguments
    ///
    /// * `feature_index` - Feature whose groups are compared
    /// * `performance_key` - Performance metric to report
    /// * `fairness_key` - Fairness metric to report
    pub async fn evaluate(
        &self,
        feature_index: usize,
        performance_key: &str,
        fairness_key: &str,
    ) -> Result<Vec<ModelEvaluation>> {
        let performance = performance_info(performance_key)?;
        let fairness = fairness_info(fairness_key)?;
        let binning = self.binning(feature_index)?;
        let bins = binning.bin_vector.as_slice();
        let performance_key = performance.key;

        info!(
            feature = %binning.feature_name,
            performance = performance_key,
            fairness = fairness.key,
            models = self.dataset.model_count(),
            "evaluating models"
        );

        let models = self.dataset.models().iter().enumerate();
        let evaluations = models.map(|(model_index, model)| {
            let fairness = &fairness;
            async move {
                let value = self
                    .cache
                    .get_metric(bins, feature_index, model_index, performance_key)
                    .await?;

                let mut disparities = Vec::with_capacity(fairness.base_metrics.len());
                for base in fairness.base_metrics {
                    disparities.push(
                        self.cache
                            .get_disparity_metric(
                                bins,
                                feature_index,
                                model_index,
                                base.key(),
                                fairness.mode,
                            )
                            .await?,
                    );
                }

                Ok::<_, AssessmentError>(ModelEvaluation {
                    model_index,
                    model: model.name.clone(),
                    performance: value.map(|v| v.as_ref().clone()),
                    fairness: fairness.mode.combine(disparities),
                })
            }
        });

        try_join_all(evaluations).await
    }

    /// Evaluate every model on one feature and build a report.
    pub async fn report(
        &self,
        feature_index: usize,
        performance_key: &str,
        fairness_key: &str,
    ) -> Result<AssessmentReport> {
        let evaluations = self
            .evaluate(feature_index, performance_key, fairness_key)
            .await?;
        let binning = self.binning(feature_index)?;
        let rows = evaluations
            .iter()
            .map(|evaluation| evaluation.to_row(binning.group_count()))
            .collect();

        Ok(AssessmentReport::new(
            self.dataset.name(),
            binning.feature_name.clone(),
            binning.labels.clone(),
            performance_key,
            fairness_key,
            rows,
        ))
    }

    /// Rebuild one feature's binning and forget its cached metrics.
    pub async fn rebin_feature(
        &mut self,
        feature_index: usize,
        config: &BinningConfig,
    ) -> Result<()> {
        let feature = self
            .dataset
            .features()
            .get(feature_index)
            .ok_or(AssessmentError::FeatureOutOfRange {
                index: feature_index,
                count: self.binnings.len(),
            })?;
        let binning = FeatureBinning::build(feature, config)?;

        info!(
            feature = %binning.feature_name,
            groups = binning.group_count(),
            "rebinned feature"
        );
        self.binnings[feature_index] = binning;
        self.cache.clear_cache(Some(feature_index)).await?;
        Ok(())
    }

    /// Score every metric for every feature and model.
    ///
    /// `progress` is called with `(done, total)` after each feature and
    /// metric pair. Returns every value held by the cache afterwards.
    pub async fn precompute(
        &self,
        metric_keys: &[&str],
        progress: Option<&(dyn Fn(usize, usize) + Sync)>,
    ) -> Result<PrecomputedMetrics> {
        for key in metric_keys {
            performance_info(key)?;
        }

        let model_count = self.dataset.model_count();
        let total = self.binnings.len() * metric_keys.len() * model_count;
        let mut done = 0;
        info!(
            features = self.binnings.len(),
            models = model_count,
            metrics = metric_keys.len(),
            "precomputing metrics"
        );

        for (feature_index, binning) in self.binnings.iter().enumerate() {
            let bins = binning.bin_vector.as_slice();
            for key in metric_keys {
                try_join_all((0..model_count).map(|model_index| {
                    self.cache.get_metric(bins, feature_index, model_index, key)
                }))
                .await?;

                done += model_count;
                if let Some(report) = progress {
                    report(done, total);
                }
            }
        }

        Ok(self.cache.snapshot().await)
    }
}
