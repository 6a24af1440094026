//! Report export.
//!
//! JSON exports serialize the report as is. CSV exports flatten it into one
//! `model,group,metric,value` row per score, with the group `overall` for
//! cohort-wide scores and an empty value where a score is missing.

use crate::report::AssessmentReport;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Group name used for cohort-wide scores in CSV exports.
const OVERALL: &str = "overall";

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// One flattened score.
#[derive(Debug, Serialize)]
struct ScoreRecord<'a> {
    model: &'a str,
    group: &'a str,
    metric: &'a str,
    value: Option<f64>,
}

impl AssessmentReport {
    fn to_records(&self) -> Vec<ScoreRecord<'_>> {
        let mut records = Vec::new();

        for row in &self.models {
            records.push(ScoreRecord {
                model: &row.model,
                group: OVERALL,
                metric: &self.performance_metric,
                value: row.performance_global,
            });

            for (label, value) in self.bin_labels.iter().zip(&row.performance_bins) {
                records.push(ScoreRecord {
                    model: &row.model,
                    group: label,
                    metric: &self.performance_metric,
                    value: *value,
                });
            }

            records.push(ScoreRecord {
                model: &row.model,
                group: OVERALL,
                metric: &self.fairness_metric,
                value: (!row.fairness.is_nan()).then_some(row.fairness),
            });
        }

        records
    }
}

fn write_csv<'a, I>(records: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = ScoreRecord<'a>>,
{
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    wtr.write_record(["model", "group", "metric", "value"])?;
    for record in records {
        wtr.serialize(record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for AssessmentReport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => write_csv(self.to_records()),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for Vec<AssessmentReport> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => write_csv(self.iter().flat_map(AssessmentReport::to_records)),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ModelRow;
    use rstest::rstest;

    fn sample_report() -> AssessmentReport {
        AssessmentReport::new(
            "cohort",
            "sex",
            vec!["female".to_string(), "male".to_string()],
            "selection_rate",
            "demographic_parity_ratio",
            vec![ModelRow::new(
                "logistic",
                Some(0.5),
                vec![Some(0.4), None],
                f64::NAN,
            )],
        )
    }

    #[test]
    fn test_csv_rows() {
        let csv = sample_report().export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "model,group,metric,value",
                "logistic,overall,selection_rate,0.5",
                "logistic,female,selection_rate,0.4",
                "logistic,male,selection_rate,",
                "logistic,overall,demographic_parity_ratio,",
            ]
        );
    }

    #[test]
    fn test_json_export() {
        let json = sample_report()
            .export_to_string(ExportFormat::Json)
            .unwrap();
        assert!(json.contains("\"feature\":\"sex\""));
        assert!(json.contains("\"fairness\":null"));

        let pretty = sample_report()
            .export_to_string(ExportFormat::PrettyJson)
            .unwrap();
        assert!(pretty.contains("  ")); // Indentation indicates pretty format
    }

    #[test]
    fn test_multiple_reports_share_one_header() {
        let reports = vec![sample_report(), sample_report()];
        let csv = reports.export_to_string(ExportFormat::Csv).unwrap();
        assert_eq!(csv.matches("model,group,metric,value").count(), 1);
        assert_eq!(csv.lines().count(), 9);
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("JSON", ExportFormat::Json)]
    #[case("pretty-json", ExportFormat::PrettyJson)]
    fn test_parse_format(#[case] input: &str, #[case] expected: ExportFormat) {
        assert_eq!(input.parse::<ExportFormat>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_format() {
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(ExportError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }
}
