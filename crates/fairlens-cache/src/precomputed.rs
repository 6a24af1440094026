//! Precomputed metric grids.
//!
//! When every metric has been scored ahead of time the cache runs without a
//! fetcher and is seeded from a grid indexed
//! `[feature_index][model_index] -> {metric_key -> MetricValue}`. The JSON form
//! is the bare nested array:
//!
//! ```json
//! [[{"accuracy_score": {"global": 0.8, "bins": [0.7, 0.9]}}]]
//! ```

use crate::error::{CacheError, Result};
use fairlens_metrics::MetricValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Metric values for one (feature, model) cell, keyed by metric.
pub type MetricMap = HashMap<String, MetricValue>;

/// A `features x models` grid of metric values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrecomputedMetrics {
    grid: Vec<Vec<MetricMap>>,
}

impl PrecomputedMetrics {
    /// Wrap an existing grid.
    pub const fn new(grid: Vec<Vec<MetricMap>>) -> Self {
        Self { grid }
    }

    /// Create a grid of empty cells.
    pub fn empty(feature_count: usize, model_count: usize) -> Self {
        Self {
            grid: (0..feature_count)
                .map(|_| vec![MetricMap::new(); model_count])
                .collect(),
        }
    }

    /// Number of feature rows.
    pub const fn feature_count(&self) -> usize {
        self.grid.len()
    }

    /// Number of models, taken from the first row.
    pub fn model_count(&self) -> usize {
        self.grid.first().map_or(0, Vec::len)
    }

    /// Check that every row has the same number of models.
    pub fn validate(&self) -> Result<()> {
        let expected = self.model_count();
        for (feature_index, row) in self.grid.iter().enumerate() {
            if row.len() != expected {
                return Err(CacheError::InvalidPrecomputed(format!(
                    "feature {} has {} models, expected {}",
                    feature_index,
                    row.len(),
                    expected
                )));
            }
        }
        Ok(())
    }

    /// Look up a single value.
    pub fn get(
        &self,
        feature_index: usize,
        model_index: usize,
        metric_key: &str,
    ) -> Option<&MetricValue> {
        self.grid.get(feature_index)?.get(model_index)?.get(metric_key)
    }

    /// Store a value, replacing any previous one.
    pub fn insert(
        &mut self,
        feature_index: usize,
        model_index: usize,
        metric_key: impl Into<String>,
        value: MetricValue,
    ) -> Result<()> {
        let feature_count = self.grid.len();
        let row = self
            .grid
            .get_mut(feature_index)
            .ok_or(CacheError::IndexOutOfRange {
                axis: "feature",
                index: feature_index,
                size: feature_count,
            })?;
        let model_count = row.len();
        let cell = row.get_mut(model_index).ok_or(CacheError::IndexOutOfRange {
            axis: "model",
            index: model_index,
            size: model_count,
        })?;
        cell.insert(metric_key.into(), value);
        Ok(())
    }

    /// Total number of stored values.
    pub fn len(&self) -> usize {
        self.grid.iter().flatten().map(HashMap::len).sum()
    }

    /// Whether no value is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into the raw grid.
    pub fn into_grid(self) -> Vec<Vec<MetricMap>> {
        self.grid
    }

    /// Parse from JSON and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let metrics: Self = serde_json::from_str(json)?;
        metrics.validate()?;
        Ok(metrics)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and validate a grid from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Write the grid to a JSON file.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
