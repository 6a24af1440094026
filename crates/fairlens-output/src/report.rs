//! Fairness assessment reports.
//!
//! A report covers one sensitive feature: the chosen performance metric of
//! every model overall and per group, and one fairness score per model.
//! Missing scores render as `—`.

use chrono::{DateTime, Utc};
use fairlens_metrics::ParityMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder for a score that could not be computed.
const MISSING: &str = "—";

const MODEL_WIDTH: usize = 20;
const VALUE_WIDTH: usize = 12;

/// Serializes `NaN` as `null` and reads `null` back as `NaN`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{:.4}", v),
        _ => MISSING.to_string(),
    }
}

/// Scores of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRow {
    /// Model name.
    pub model: String,

    /// Performance over the whole cohort.
    pub performance_global: Option<f64>,

    /// Performance per group, aligned with the report's bin labels.
    pub performance_bins: Vec<Option<f64>>,

    /// Disparity score, `NaN` when not computable.
    #[serde(with = "nan_as_null")]
    pub fairness: f64,
}

impl ModelRow {
    /// Create a model row.
    pub fn new(
        model: impl Into<String>,
        performance_global: Option<f64>,
        performance_bins: Vec<Option<f64>>,
        fairness: f64,
    ) -> Self {
        Self {
            model: model.into(),
            performance_global,
            performance_bins,
            fairness,
        }
    }
}

/// Fairness assessment of every model over one sensitive feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    /// Dataset name.
    pub dataset: String,

    /// Sensitive feature the groups come from.
    pub feature: String,

    /// Group labels.
    pub bin_labels: Vec<String>,

    /// Performance metric key.
    pub performance_metric: String,

    /// Fairness metric key.
    pub fairness_metric: String,

    /// One row per model.
    pub models: Vec<ModelRow>,

    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
}

impl AssessmentReport {
    /// Create a report stamped with the current time.
    ///
    /// # Arguments
    ///
    /// * `dataset` - Dataset name
    /// * `feature` - Sensitive feature name
    /// * `bin_labels` - Group labels of the feature's binning
    /// * `performance_metric` - Performance metric key
    /// * `fairness_metric` - Fairness metric key
    /// * `models` - One row per model
    pub fn new(
        dataset: impl Into<String>,
        feature: impl Into<String>,
        bin_labels: Vec<String>,
        performance_metric: impl Into<String>,
        fairness_metric: impl Into<String>,
        models: Vec<ModelRow>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            feature: feature.into(),
            bin_labels,
            performance_metric: performance_metric.into(),
            fairness_metric: fairness_metric.into(),
            models,
            generated_at: Utc::now(),
        }
    }

    /// Models ordered from most to least fair. `NaN` scores sort last.
    ///
    /// Lower is fairer for differences, higher is fairer for ratios.
    pub fn ranked_by_fairness(&self, mode: ParityMode) -> Vec<&ModelRow> {
        let mut ranked: Vec<&ModelRow> = self.models.iter().collect();
        ranked.sort_by(|a, b| match (a.fairness.is_nan(), b.fairness.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => match mode {
                ParityMode::Difference => a.fairness.total_cmp(&b.fairness),
                ParityMode::Ratio => b.fairness.total_cmp(&a.fairness),
            },
        });
        ranked
    }

    /// The fairest model, if any has a fairness score.
    pub fn best_by_fairness(&self, mode: ParityMode) -> Option<&ModelRow> {
        self.ranked_by_fairness(mode)
            .into_iter()
            .next()
            .filter(|row| !row.fairness.is_nan())
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let columns = self.bin_labels.len() + 2;
        let width = MODEL_WIDTH + columns * (VALUE_WIDTH + 1);
        let mut output = String::new();

        output.push_str(&format!("\nFairness Assessment: {}\n", self.dataset));
        output.push_str(&format!(
            "Feature: {} ({} groups)\n",
            self.feature,
            self.bin_labels.len()
        ));
        output.push_str(&format!(
            "Performance: {}   Fairness: {}\n",
            self.performance_metric, self.fairness_metric
        ));
        output.push_str(&"=".repeat(width));
        output.push('\n');

        output.push_str(&format!("{:<MODEL_WIDTH$}", "Model"));
        output.push_str(&format!(" {:>VALUE_WIDTH$}", "Overall"));
        for label in &self.bin_labels {
            output.push_str(&format!(" {:>VALUE_WIDTH$}", label));
        }
        output.push_str(&format!(" {:>VALUE_WIDTH$}\n", "Fairness"));
        output.push_str(&"-".repeat(width));
        output.push('\n');

        for row in &self.models {
            output.push_str(&format!("{:<MODEL_WIDTH$}", row.model));
            output.push_str(&format!(
                " {:>VALUE_WIDTH$}",
                format_value(row.performance_global)
            ));
            for value in &row.performance_bins {
                output.push_str(&format!(" {:>VALUE_WIDTH$}", format_value(*value)));
            }
            output.push_str(&format!(
                " {:>VALUE_WIDTH$}\n",
                format_value(Some(row.fairness))
            ));
        }

        output.push_str(&"=".repeat(width));
        output.push('\n');
        output.push_str(&format!(
            "Generated: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        output
    }

    /// Format as Markdown table for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Fairness Assessment: {}\n\n", self.dataset));
        output.push_str(&format!("**Feature:** {}\n\n", self.feature));
        output.push_str(&format!(
            "**Performance metric:** {}\n\n",
            self.performance_metric
        ));
        output.push_str(&format!("**Fairness metric:** {}\n\n", self.fairness_metric));

        output.push_str("| Model | Overall |");
        for label in &self.bin_labels {
            output.push_str(&format!(" {} |", label));
        }
        output.push_str(" Fairness |\n");
        output.push_str("|-------|---------|");
        for _ in &self.bin_labels {
            output.push_str("------|");
        }
        output.push_str("----------|\n");

        for row in &self.models {
            output.push_str(&format!(
                "| {} | {} |",
                row.model,
                format_value(row.performance_global)
            ));
            for value in &row.performance_bins {
                output.push_str(&format!(" {} |", format_value(*value)));
            }
            output.push_str(&format!(" {} |\n", format_value(Some(row.fairness))));
        }

        output
    }
}

impl fmt::Display for AssessmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ascii_table())
    }
}
