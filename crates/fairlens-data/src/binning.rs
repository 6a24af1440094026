//! Sensitive-feature binning.
//!
//! A binning splits the rows of a cohort into groups by one feature. Its bin
//! vector has one entry per row, the index of that row's group, and is what
//! per-group metrics are scored against.

use crate::dataset::{Feature, FeatureValues};
use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

/// How a feature is split into groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningConfig {
    /// Number of equal-width bins for continuous numeric features
    pub bin_count: usize,

    /// Numeric features with at most this many distinct values are binned per value
    pub categorical_threshold: usize,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            bin_count: 5,
            categorical_threshold: 5,
        }
    }
}

impl BinningConfig {
    /// Configuration with the given number of equal-width bins.
    pub fn with_bin_count(bin_count: usize) -> Self {
        Self {
            bin_count,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.bin_count == 0 {
            return Err(DataError::InvalidConfig(
                "bin_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Kind of groups a binning produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinKind {
    /// One group per distinct value
    Categorical,
    /// Equal-width numeric intervals
    Interval,
}

/// Assignment of every row to a group of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBinning {
    /// Feature the groups were built from
    pub feature_name: String,

    /// Display label of each group
    pub labels: Vec<String>,

    /// Group index of each row, in `0..labels.len()`
    pub bin_vector: Vec<usize>,

    /// Kind of groups
    pub kind: BinKind,
}

impl FeatureBinning {
    /// Build the groups of a feature.
    ///
    /// Categorical features, and numeric features with at most
    /// `categorical_threshold` distinct values, get one group per distinct
    /// value in sorted order. Other numeric features are cut into
    /// `bin_count` equal-width intervals over `[min, max]`, the last one
    /// closed. A constant column yields a single group.
    pub fn build(feature: &Feature, config: &BinningConfig) -> Result<Self> {
        config.validate()?;
        if feature.values.is_empty() {
            return Err(DataError::Empty(feature.name.clone()));
        }

        let binning = match &feature.values {
            FeatureValues::Categorical(values) => categorical(&feature.name, values),
            FeatureValues::Numeric(values) => numeric(&feature.name, values, config),
        };
        debug!(
            feature = %binning.feature_name,
            groups = binning.labels.len(),
            kind = ?binning.kind,
            "built feature binning"
        );
        Ok(binning)
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.labels.len()
    }

    /// Number of rows in each group.
    pub fn group_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.labels.len()];
        for &bin in &self.bin_vector {
            counts[bin] += 1;
        }
        counts
    }
}

fn categorical(name: &str, values: &[String]) -> FeatureBinning {
    let labels: Vec<String> = values
        .iter()
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    let bin_vector = values
        .iter()
        .map(|v| labels.binary_search(v).unwrap_or_default())
        .collect();

    FeatureBinning {
        feature_name: name.to_string(),
        labels,
        bin_vector,
        kind: BinKind::Categorical,
    }
}

fn numeric(name: &str, values: &[f64], config: &BinningConfig) -> FeatureBinning {
    let mut distinct = values.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    if distinct.len() <= config.categorical_threshold {
        let bin_vector = values
            .iter()
            .map(|v| {
                distinct
                    .binary_search_by(|probe| probe.total_cmp(v))
                    .unwrap_or_default()
            })
            .collect();
        return FeatureBinning {
            feature_name: name.to_string(),
            labels: distinct.iter().map(|v| v.to_string()).collect(),
            bin_vector,
            kind: BinKind::Categorical,
        };
    }

    let min = distinct[0];
    let max = distinct[distinct.len() - 1];

    if max.total_cmp(&min) == Ordering::Equal {
        return FeatureBinning {
            feature_name: name.to_string(),
            labels: vec![format!("[{}, {}]", format_edge(min), format_edge(max))],
            bin_vector: vec![0; values.len()],
            kind: BinKind::Interval,
        };
    }

    let bin_count = config.bin_count;
    let width = (max - min) / bin_count as f64;
    let edge = |i: usize| {
        if i == bin_count {
            max
        } else {
            min + width * i as f64
        }
    };

    let labels = (0..bin_count)
        .map(|i| {
            let close = if i + 1 == bin_count { ']' } else { ')' };
            format!("[{}, {}{}", format_edge(edge(i)), format_edge(edge(i + 1)), close)
        })
        .collect();

    let bin_vector = values
        .iter()
        .map(|v| (((v - min) / width).floor() as usize).min(bin_count - 1))
        .collect();

    FeatureBinning {
        feature_name: name.to_string(),
        labels,
        bin_vector,
        kind: BinKind::Interval,
    }
}

fn format_edge(value: f64) -> String {
    let rounded = format!("{:.2}", value);
    rounded
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn numeric_feature(values: &[f64]) -> Feature {
        Feature::new("age", FeatureValues::Numeric(values.to_vec()))
    }

    #[test]
    fn test_default_config() {
        let config = BinningConfig::default();
        assert_eq!(config.bin_count, 5);
        assert_eq!(config.categorical_threshold, 5);
    }

    #[test]
    fn test_categorical_sorted_labels() {
        let feature = Feature::new(
            "race",
            FeatureValues::Categorical(
                ["white", "black", "asian", "black"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
        );
        let binning = FeatureBinning::build(&feature, &BinningConfig::default()).unwrap();

        assert_eq!(binning.labels, vec!["asian", "black", "white"]);
        assert_eq!(binning.bin_vector, vec![2, 1, 0, 1]);
        assert_eq!(binning.kind, BinKind::Categorical);
        assert_eq!(binning.group_counts(), vec![1, 2, 1]);
    }

    #[test]
    fn test_few_distinct_numbers_are_categorical() {
        let feature = numeric_feature(&[1.0, 0.0, 1.0, 0.5]);
        let binning = FeatureBinning::build(&feature, &BinningConfig::default()).unwrap();

        assert_eq!(binning.labels, vec!["0", "0.5", "1"]);
        assert_eq!(binning.bin_vector, vec![2, 0, 2, 1]);
        assert_eq!(binning.kind, BinKind::Categorical);
    }

    #[test]
    fn test_equal_width_intervals() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0];
        let config = BinningConfig::with_bin_count(4);
        let binning = FeatureBinning::build(&numeric_feature(&values), &config).unwrap();

        assert_eq!(
            binning.labels,
            vec!["[0, 2.5)", "[2.5, 5)", "[5, 7.5)", "[7.5, 10]"]
        );
        assert_eq!(binning.bin_vector, vec![0, 0, 0, 1, 1, 2, 2, 2, 3, 3]);
        assert_eq!(binning.kind, BinKind::Interval);
        assert_eq!(binning.group_counts(), vec![3, 2, 3, 2]);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(7)]
    fn test_every_row_gets_a_bin(#[case] bin_count: usize) {
        let values: Vec<f64> = (0..50).map(|i| (i as f64 * 0.37).sin() * 100.0).collect();
        let config = BinningConfig {
            bin_count,
            categorical_threshold: 0,
        };
        let binning = FeatureBinning::build(&numeric_feature(&values), &config).unwrap();

        assert_eq!(binning.group_count(), bin_count);
        assert_eq!(binning.bin_vector.len(), values.len());
        assert!(binning.bin_vector.iter().all(|&b| b < bin_count));
        assert_eq!(binning.group_counts().iter().sum::<usize>(), values.len());
    }

    #[test]
    fn test_constant_column_single_bin() {
        let config = BinningConfig {
            bin_count: 5,
            categorical_threshold: 0,
        };
        let binning = FeatureBinning::build(&numeric_feature(&[3.0, 3.0, 3.0]), &config).unwrap();

        assert_eq!(binning.labels, vec!["[3, 3]"]);
        assert_eq!(binning.bin_vector, vec![0, 0, 0]);
    }

    #[test]
    fn test_invalid_bin_count() {
        let config = BinningConfig::with_bin_count(0);
        assert!(matches!(
            FeatureBinning::build(&numeric_feature(&[1.0]), &config),
            Err(DataError::InvalidConfig(_))
        ));
    }

    #[rstest]
    #[case(2.5, "2.5")]
    #[case(10.0, "10")]
    #[case(1.0 / 3.0, "0.33")]
    #[case(-4.127, "-4.13")]
    fn test_format_edge(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_edge(value), expected);
    }
}
