//! Metric values.
//!
//! A [`MetricValue`] is the result of evaluating one metric for one
//! (feature binning, model) pair. It is also the wire format exchanged with a
//! scoring service:
//!
//! ```json
//! { "global": 0.8, "bins": [0.7, null, 0.9] }
//! ```
//!
//! Either field may be absent. A `null` bin means the group had no score.
//!
//! JSON has no `NaN`, so a `NaN` global or bin is written as `null` and reads
//! back as `None`. Disparities treat both alike, but a saved value no longer
//! tells "scored as `NaN`" apart from "not scored".

use crate::parity::{ParityMode, disparity};
use serde::{Deserialize, Serialize};

/// Score of a metric over a whole cohort and per group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Aggregate over the whole cohort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<f64>,

    /// One entry per group, aligned with the bin indices of the binning used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bins: Option<Vec<Option<f64>>>,
}

impl MetricValue {
    /// Create a metric value from its parts.
    pub const fn new(global: Option<f64>, bins: Option<Vec<Option<f64>>>) -> Self {
        Self { global, bins }
    }

    /// Create a value that only carries a cohort-wide aggregate.
    pub const fn global_only(global: f64) -> Self {
        Self {
            global: Some(global),
            bins: None,
        }
    }

    /// Create a value with a fully populated per-group breakdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use fairlens_metrics::MetricValue;
    ///
    /// let value = MetricValue::with_bins(Some(0.8), vec![0.7, 0.9]);
    /// assert_eq!(value.group_count(), 2);
    /// ```
    pub fn with_bins(global: Option<f64>, bins: Vec<f64>) -> Self {
        Self {
            global,
            bins: Some(bins.into_iter().map(Some).collect()),
        }
    }

    /// Number of groups in the breakdown (zero when there is none).
    pub fn group_count(&self) -> usize {
        self.bins.as_ref().map_or(0, Vec::len)
    }

    /// Group scores that are present and not `NaN`.
    pub fn valid_bins(&self) -> impl Iterator<Item = f64> + '_ {
        self.bins
            .iter()
            .flatten()
            .filter_map(|b| *b)
            .filter(|v| !v.is_nan())
    }

    /// Disparity across the groups of this value.
    ///
    /// Returns `NaN` when there is no per-group breakdown.
    pub fn disparity(&self, mode: ParityMode) -> f64 {
        self.bins
            .as_deref()
            .map_or(f64::NAN, |bins| disparity(bins, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_global_only_has_no_disparity() {
        let value = MetricValue::global_only(0.8);
        assert_eq!(value.group_count(), 0);
        assert!(value.disparity(ParityMode::Difference).is_nan());
        assert!(value.disparity(ParityMode::Ratio).is_nan());
    }

    #[test]
    fn test_valid_bins_skips_missing_and_nan() {
        let value = MetricValue::new(None, Some(vec![Some(0.1), Some(f64::NAN), None, Some(0.5)]));
        let valid: Vec<f64> = value.valid_bins().collect();
        assert_eq!(valid, vec![0.1, 0.5]);
        assert_relative_eq!(value.disparity(ParityMode::Difference), 0.4);
    }

    #[test]
    fn test_wire_format() {
        let value: MetricValue =
            serde_json::from_str(r#"{"global": 0.8, "bins": [0.7, null, 0.9]}"#).unwrap();
        assert_eq!(value.global, Some(0.8));
        assert_eq!(value.bins, Some(vec![Some(0.7), None, Some(0.9)]));

        let empty: MetricValue = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, MetricValue::default());
        assert_eq!(serde_json::to_string(&empty).unwrap(), "{}");

        let json = serde_json::to_string(&MetricValue::global_only(0.5)).unwrap();
        assert_eq!(json, r#"{"global":0.5}"#);
    }
}
