//! Metric Registry
//!
//! Catalogue of the performance metrics that can be scored per group and the
//! fairness metrics derived from them. Lookups are by the string key used on
//! the wire (e.g. `"accuracy_score"`).

use crate::parity::ParityMode;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Kind of model output a metric applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricCategory {
    /// Binary classifiers (labels 0/1)
    Classification,
    /// Regressors
    Regression,
    /// Probabilistic classifiers scored as regressors on [0, 1]
    Probability,
}

/// Performance metrics that can be scored on `(y_true, y_pred)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerformanceMetric {
    /// Fraction of correct predictions
    Accuracy,
    /// Mean of true positive rate and true negative rate
    BalancedAccuracy,
    /// TP / (TP + FP)
    Precision,
    /// TP / (TP + FN), also the true positive rate
    Recall,
    /// Harmonic mean of precision and recall
    F1,
    /// Fraction of predictions that are positive
    SelectionRate,
    /// FP / (FP + TN)
    FalsePositiveRate,
    /// FN / (FN + TP)
    FalseNegativeRate,
    /// Fraction of wrong predictions
    ErrorRate,
    /// FP / n
    Overprediction,
    /// FN / n
    Underprediction,
    /// Mean absolute error
    MeanAbsoluteError,
    /// Mean squared error
    MeanSquaredError,
    /// Square root of the mean squared error
    RootMeanSquaredError,
    /// Coefficient of determination
    R2,
    /// Mean prediction
    Average,
    /// Mean of `max(pred - true, 0)`
    MeanOverprediction,
    /// Mean of `max(true - pred, 0)`
    MeanUnderprediction,
}

impl PerformanceMetric {
    /// Every performance metric, in catalogue order.
    pub const ALL: [Self; 18] = [
        Self::Accuracy,
        Self::BalancedAccuracy,
        Self::Precision,
        Self::Recall,
        Self::F1,
        Self::SelectionRate,
        Self::FalsePositiveRate,
        Self::FalseNegativeRate,
        Self::ErrorRate,
        Self::Overprediction,
        Self::Underprediction,
        Self::MeanAbsoluteError,
        Self::MeanSquaredError,
        Self::RootMeanSquaredError,
        Self::R2,
        Self::Average,
        Self::MeanOverprediction,
        Self::MeanUnderprediction,
    ];

    /// Wire key of the metric.
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy_score",
            Self::BalancedAccuracy => "balanced_accuracy_score",
            Self::Precision => "precision_score",
            Self::Recall => "recall_score",
            Self::F1 => "f1_score",
            Self::SelectionRate => "selection_rate",
            Self::FalsePositiveRate => "false_positive_rate",
            Self::FalseNegativeRate => "false_negative_rate",
            Self::ErrorRate => "error_rate",
            Self::Overprediction => "overprediction",
            Self::Underprediction => "underprediction",
            Self::MeanAbsoluteError => "mean_absolute_error",
            Self::MeanSquaredError => "mean_squared_error",
            Self::RootMeanSquaredError => "root_mean_squared_error",
            Self::R2 => "r2_score",
            Self::Average => "average",
            Self::MeanOverprediction => "mean_overprediction",
            Self::MeanUnderprediction => "mean_underprediction",
        }
    }

    /// Look a metric up by its wire key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    /// Catalogue entry for this metric.
    pub fn info(&self) -> MetricInfo {
        let (title, description, category, parity_mode) = match self {
            Self::Accuracy => (
                "Accuracy",
                "Fraction of predictions that match the label",
                MetricCategory::Classification,
                ParityMode::Difference,
            ),
            Self::BalancedAccuracy => (
                "Balanced accuracy",
                "Average of the true positive and true negative rates",
                MetricCategory::Classification,
                ParityMode::Difference,
            ),
            Self::Precision => (
                "Precision",
                "Fraction of positive predictions that are correct",
                MetricCategory::Classification,
                ParityMode::Difference,
            ),
            Self::Recall => (
                "Recall",
                "Fraction of positive labels that are predicted positive",
                MetricCategory::Classification,
                ParityMode::Difference,
            ),
            Self::F1 => (
                "F1 score",
                "Harmonic mean of precision and recall",
                MetricCategory::Classification,
                ParityMode::Difference,
            ),
            Self::SelectionRate => (
                "Selection rate",
                "Fraction of rows predicted positive",
                MetricCategory::Classification,
                ParityMode::Ratio,
            ),
            Self::FalsePositiveRate => (
                "False positive rate",
                "Fraction of negative labels that are predicted positive",
                MetricCategory::Classification,
                ParityMode::Difference,
            ),
            Self::FalseNegativeRate => (
                "False negative rate",
                "Fraction of positive labels that are predicted negative",
                MetricCategory::Classification,
                ParityMode::Difference,
            ),
            Self::ErrorRate => (
                "Error rate",
                "Fraction of predictions that do not match the label",
                MetricCategory::Classification,
                ParityMode::Difference,
            ),
            Self::Overprediction => (
                "Overprediction",
                "False positives as a fraction of all rows",
                MetricCategory::Classification,
                ParityMode::Difference,
            ),
            Self::Underprediction => (
                "Underprediction",
                "False negatives as a fraction of all rows",
                MetricCategory::Classification,
                ParityMode::Difference,
            ),
            Self::MeanAbsoluteError => (
                "Mean absolute error",
                "Average absolute difference between prediction and label",
                MetricCategory::Regression,
                ParityMode::Difference,
            ),
            Self::MeanSquaredError => (
                "Mean squared error",
                "Average squared difference between prediction and label",
                MetricCategory::Regression,
                ParityMode::Difference,
            ),
            Self::RootMeanSquaredError => (
                "Root mean squared error",
                "Square root of the mean squared error",
                MetricCategory::Probability,
                ParityMode::Difference,
            ),
            Self::R2 => (
                "R2 score",
                "Coefficient of determination",
                MetricCategory::Regression,
                ParityMode::Difference,
            ),
            Self::Average => (
                "Average prediction",
                "Mean of the predictions",
                MetricCategory::Regression,
                ParityMode::Ratio,
            ),
            Self::MeanOverprediction => (
                "Mean overprediction",
                "Average amount by which predictions exceed the label",
                MetricCategory::Probability,
                ParityMode::Difference,
            ),
            Self::MeanUnderprediction => (
                "Mean underprediction",
                "Average amount by which predictions fall short of the label",
                MetricCategory::Probability,
                ParityMode::Difference,
            ),
        };

        MetricInfo {
            key: self.key(),
            title,
            description,
            category,
            parity_mode,
        }
    }
}

impl fmt::Display for PerformanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PerformanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("Unknown metric: {}", s))
    }
}

/// Performance metric metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricInfo {
    /// Metric key (unique identifier)
    pub key: &'static str,
    /// Display title
    pub title: &'static str,
    /// Brief description of what the metric measures
    pub description: &'static str,
    /// Kind of model the metric applies to
    pub category: MetricCategory,
    /// Natural mode when the metric is compared across groups
    pub parity_mode: ParityMode,
}

/// Fairness metric metadata
///
/// A fairness metric is the disparity of one or more base metrics. With
/// several base metrics the disparities are folded with
/// [`ParityMode::combine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FairnessMetricInfo {
    /// Metric key (unique identifier)
    pub key: &'static str,
    /// Display title
    pub title: &'static str,
    /// Brief description of what the metric measures
    pub description: &'static str,
    /// Metrics whose group disparity is measured
    pub base_metrics: &'static [PerformanceMetric],
    /// How group scores are reduced
    pub mode: ParityMode,
}

/// Get all available performance metric info
pub fn available_metrics() -> Vec<MetricInfo> {
    PerformanceMetric::ALL.iter().map(|m| m.info()).collect()
}

/// Get metrics by category
pub fn metrics_by_category(category: MetricCategory) -> Vec<MetricInfo> {
    available_metrics()
        .into_iter()
        .filter(|m| m.category == category)
        .collect()
}

/// Get metric info by key
pub fn get_metric_info(key: &str) -> Option<MetricInfo> {
    PerformanceMetric::from_key(key).map(|m| m.info())
}

/// List all performance metric keys
pub fn list_metric_keys() -> Vec<&'static str> {
    PerformanceMetric::ALL.iter().map(|m| m.key()).collect()
}

/// Get a map of all performance metrics indexed by key
pub fn metric_map() -> HashMap<&'static str, MetricInfo> {
    available_metrics().into_iter().map(|m| (m.key, m)).collect()
}

/// Get all available fairness metric info
pub fn available_fairness_metrics() -> Vec<FairnessMetricInfo> {
    use PerformanceMetric::{Accuracy, ErrorRate, FalsePositiveRate, Recall, SelectionRate};

    vec![
        FairnessMetricInfo {
            key: "demographic_parity_difference",
            title: "Demographic parity difference",
            description: "Largest gap in selection rate between groups",
            base_metrics: &[SelectionRate],
            mode: ParityMode::Difference,
        },
        FairnessMetricInfo {
            key: "demographic_parity_ratio",
            title: "Demographic parity ratio",
            description: "Smallest selection rate divided by the largest",
            base_metrics: &[SelectionRate],
            mode: ParityMode::Ratio,
        },
        FairnessMetricInfo {
            key: "equal_opportunity_difference",
            title: "Equal opportunity difference",
            description: "Largest gap in true positive rate between groups",
            base_metrics: &[Recall],
            mode: ParityMode::Difference,
        },
        FairnessMetricInfo {
            key: "equal_opportunity_ratio",
            title: "Equal opportunity ratio",
            description: "Smallest true positive rate divided by the largest",
            base_metrics: &[Recall],
            mode: ParityMode::Ratio,
        },
        FairnessMetricInfo {
            key: "equalized_odds_difference",
            title: "Equalized odds difference",
            description: "Larger of the true and false positive rate differences",
            base_metrics: &[Recall, FalsePositiveRate],
            mode: ParityMode::Difference,
        },
        FairnessMetricInfo {
            key: "equalized_odds_ratio",
            title: "Equalized odds ratio",
            description: "Smaller of the true and false positive rate ratios",
            base_metrics: &[Recall, FalsePositiveRate],
            mode: ParityMode::Ratio,
        },
        FairnessMetricInfo {
            key: "error_rate_difference",
            title: "Error rate difference",
            description: "Largest gap in error rate between groups",
            base_metrics: &[ErrorRate],
            mode: ParityMode::Difference,
        },
        FairnessMetricInfo {
            key: "error_rate_ratio",
            title: "Error rate ratio",
            description: "Smallest error rate divided by the largest",
            base_metrics: &[ErrorRate],
            mode: ParityMode::Ratio,
        },
        FairnessMetricInfo {
            key: "accuracy_score_difference",
            title: "Accuracy difference",
            description: "Largest gap in accuracy between groups",
            base_metrics: &[Accuracy],
            mode: ParityMode::Difference,
        },
        FairnessMetricInfo {
            key: "accuracy_score_ratio",
            title: "Accuracy ratio",
            description: "Smallest accuracy divided by the largest",
            base_metrics: &[Accuracy],
            mode: ParityMode::Ratio,
        },
    ]
}

/// Get fairness metric info by key
pub fn get_fairness_metric_info(key: &str) -> Option<FairnessMetricInfo> {
    available_fairness_metrics()
        .into_iter()
        .find(|f| f.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_metrics_count() {
        assert_eq!(available_metrics().len(), 18);
        assert_eq!(list_metric_keys().len(), 18);
    }

    #[test]
    fn test_keys_are_unique() {
        let map = metric_map();
        assert_eq!(map.len(), PerformanceMetric::ALL.len());
        assert!(map.contains_key("accuracy_score"));
        assert!(map.contains_key("selection_rate"));
    }

    #[test]
    fn test_key_round_trip() {
        for metric in PerformanceMetric::ALL {
            assert_eq!(PerformanceMetric::from_key(metric.key()), Some(metric));
            assert_eq!(metric.to_string().parse::<PerformanceMetric>(), Ok(metric));
        }
        assert!(PerformanceMetric::from_key("nonexistent_metric").is_none());
    }

    #[test]
    fn test_metrics_by_category() {
        let classification = metrics_by_category(MetricCategory::Classification);
        assert_eq!(classification.len(), 11);
        assert!(
            classification
                .iter()
                .all(|m| m.category == MetricCategory::Classification)
        );

        let regression = metrics_by_category(MetricCategory::Regression);
        assert_eq!(regression.len(), 4);

        let probability = metrics_by_category(MetricCategory::Probability);
        assert_eq!(probability.len(), 3);
    }

    #[test]
    fn test_get_metric_info() {
        let info = get_metric_info("selection_rate").unwrap();
        assert_eq!(info.title, "Selection rate");
        assert_eq!(info.parity_mode, ParityMode::Ratio);
        assert!(get_metric_info("nonexistent_metric").is_none());
    }

    #[test]
    fn test_fairness_metrics() {
        let fairness = available_fairness_metrics();
        assert_eq!(fairness.len(), 10);
        for metric in &fairness {
            assert!(!metric.base_metrics.is_empty(), "{} has no base metric", metric.key);
            let suffix = format!("_{}", metric.mode);
            assert!(
                metric.key.ends_with(&suffix),
                "{} does not end with {}",
                metric.key,
                suffix
            );
        }

        let odds = get_fairness_metric_info("equalized_odds_difference").unwrap();
        assert_eq!(
            odds.base_metrics,
            &[PerformanceMetric::Recall, PerformanceMetric::FalsePositiveRate]
        );
        assert!(get_fairness_metric_info("accuracy_score").is_none());
    }
}
