//! In-memory cohort: labels, model predictions and sensitive features.

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Describes which columns of a delimited file hold what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Column with the true labels
    pub label_column: String,

    /// One column of predictions per model, in model order
    pub prediction_columns: Vec<String>,

    /// Sensitive feature columns; `None` takes every remaining column
    pub feature_columns: Option<Vec<String>>,

    /// Field delimiter
    pub delimiter: u8,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            label_column: "label".to_string(),
            prediction_columns: Vec::new(),
            feature_columns: None,
            delimiter: b',',
        }
    }
}

impl DatasetConfig {
    /// Configuration for a label column and the given prediction columns.
    pub fn new<I, S>(label_column: impl Into<String>, prediction_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label_column: label_column.into(),
            prediction_columns: prediction_columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Restrict the sensitive features to the named columns.
    pub fn with_features<I, S>(mut self, feature_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_columns = Some(feature_columns.into_iter().map(Into::into).collect());
        self
    }

    /// Use a different field delimiter.
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.prediction_columns.is_empty() {
            return Err(DataError::InvalidConfig(
                "at least one prediction column is required".to_string(),
            ));
        }
        if self.prediction_columns.contains(&self.label_column) {
            return Err(DataError::InvalidConfig(format!(
                "column {} is both label and prediction",
                self.label_column
            )));
        }
        Ok(())
    }
}

/// Values of one sensitive feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum FeatureValues {
    /// Every cell parsed as a finite number
    Numeric(Vec<f64>),
    /// Anything else, kept verbatim
    Categorical(Vec<String>),
}

impl FeatureValues {
    /// Infer the column type: numeric iff every cell parses as a finite `f64`.
    pub fn infer(cells: Vec<String>) -> Self {
        let parsed: Option<Vec<f64>> = cells
            .iter()
            .map(|cell| cell.parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect();
        match parsed {
            Some(values) => Self::Numeric(values),
            None => Self::Categorical(cells),
        }
    }

    /// Number of rows.
    pub const fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Categorical(values) => values.len(),
        }
    }

    /// Whether the column has no rows.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the column is numeric.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }
}

/// A named sensitive feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Column name
    pub name: String,
    /// Column values
    pub values: FeatureValues,
}

impl Feature {
    /// Create a feature.
    pub fn new(name: impl Into<String>, values: FeatureValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Predictions of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPredictions {
    /// Model name, usually the column name
    pub name: String,
    /// One prediction per row
    pub values: Vec<f64>,
}

impl ModelPredictions {
    /// Create a model's predictions.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Labels, predictions and sensitive features of a cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    name: String,
    labels: Vec<f64>,
    models: Vec<ModelPredictions>,
    features: Vec<Feature>,
}

impl Dataset {
    /// Create a dataset from in-memory columns.
    ///
    /// Fails if there are no rows, no models, no features, or if any column
    /// length differs from the number of labels.
    pub fn new(
        name: impl Into<String>,
        labels: Vec<f64>,
        models: Vec<ModelPredictions>,
        features: Vec<Feature>,
    ) -> Result<Self> {
        let dataset = Self {
            name: name.into(),
            labels,
            models,
            features,
        };
        dataset.validate()?;
        Ok(dataset)
    }

    fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(DataError::Empty(self.name.clone()));
        }
        if self.models.is_empty() {
            return Err(DataError::InvalidConfig("dataset has no models".to_string()));
        }
        if self.features.is_empty() {
            return Err(DataError::InvalidConfig(
                "dataset has no sensitive features".to_string(),
            ));
        }

        let expected = self.labels.len();
        let columns = self
            .models
            .iter()
            .map(|m| (&m.name, m.values.len()))
            .chain(self.features.iter().map(|f| (&f.name, f.values.len())));
        for (column, actual) in columns {
            if actual != expected {
                return Err(DataError::LengthMismatch {
                    column: column.clone(),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Read a delimited file. The dataset is named after the file stem.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, config: &DatasetConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut dataset = Self::from_reader(file, config)?;
        if let Some(stem) = path.file_stem() {
            dataset.name = stem.to_string_lossy().into_owned();
        }
        Ok(dataset)
    }

    /// Read delimited data with a header row.
    pub fn from_reader<R: Read>(reader: R, config: &DatasetConfig) -> Result<Self> {
        config.validate()?;

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(config.delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in csv_reader.records() {
            let record = record?;
            for (column, cell) in columns.iter_mut().zip(record.iter()) {
                column.push(cell.to_string());
            }
        }

        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DataError::MissingColumn(name.to_string()))
        };

        let label_index = position(&config.label_column)?;
        let labels = parse_numeric(&config.label_column, &columns[label_index])?;

        let mut models = Vec::with_capacity(config.prediction_columns.len());
        for name in &config.prediction_columns {
            let index = position(name)?;
            models.push(ModelPredictions::new(
                name.clone(),
                parse_numeric(name, &columns[index])?,
            ));
        }

        let feature_names: Vec<String> = match &config.feature_columns {
            Some(names) => names.clone(),
            None => {
                let reserved: HashSet<&str> = std::iter::once(config.label_column.as_str())
                    .chain(config.prediction_columns.iter().map(String::as_str))
                    .collect();
                headers
                    .iter()
                    .filter(|h| !reserved.contains(h.as_str()))
                    .cloned()
                    .collect()
            }
        };

        let mut features = Vec::with_capacity(feature_names.len());
        for name in feature_names {
            let index = position(&name)?;
            let values = FeatureValues::infer(std::mem::take(&mut columns[index]));
            debug!(feature = %name, numeric = values.is_numeric(), "inferred feature type");
            features.push(Feature::new(name, values));
        }

        let dataset = Self::new("dataset", labels, models, features)?;
        info!(
            rows = dataset.row_count(),
            models = dataset.model_count(),
            features = dataset.feature_count(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Dataset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the dataset.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of rows.
    pub const fn row_count(&self) -> usize {
        self.labels.len()
    }

    /// Number of models.
    pub const fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Number of sensitive features.
    pub const fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// True labels.
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// All models.
    pub fn models(&self) -> &[ModelPredictions] {
        &self.models
    }

    /// Predictions of one model.
    pub fn predictions(&self, model_index: usize) -> Option<&[f64]> {
        self.models.get(model_index).map(|m| m.values.as_slice())
    }

    /// Model names in model order.
    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    /// All sensitive features.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Index of a feature by name.
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }
}

fn parse_numeric(column: &str, cells: &[String]) -> Result<Vec<f64>> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            cell.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DataError::NonNumeric {
                    column: column.to_string(),
                    row,
                    value: cell.clone(),
                })
        })
        .collect()
}
