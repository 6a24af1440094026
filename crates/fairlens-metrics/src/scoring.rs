//! Group scoring.
//!
//! Scores a [`PerformanceMetric`] on label and prediction vectors, either over
//! all rows or split by a bin vector that assigns each row to a group.
//!
//! Classification metrics treat values `>= 0.5` as the positive class.
//! Scores that are undefined for the given rows (empty input, zero
//! denominator) are `None`.

use crate::error::{MetricError, Result};
use crate::registry::PerformanceMetric;
use crate::value::MetricValue;

/// Threshold at or above which a value counts as the positive class.
const POSITIVE_THRESHOLD: f64 = 0.5;

/// Smallest bound on group indices, whatever the row count.
///
/// Binnings may have more groups than rows, e.g. ten interval bins over six
/// rows, so the bound is the larger of this and the row count.
pub const MIN_GROUP_LIMIT: usize = 1024;

/// Binary confusion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Confusion {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

impl Confusion {
    fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a f64, &'a f64)>,
    {
        let mut counts = Self::default();
        for (truth, pred) in rows {
            match (*truth >= POSITIVE_THRESHOLD, *pred >= POSITIVE_THRESHOLD) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        counts
    }

    const fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

impl PerformanceMetric {
    /// Score the metric over paired labels and predictions.
    ///
    /// Both slices must have the same length; extra elements of the longer
    /// one are ignored. Use [`score`] for a length-checked entry point.
    pub fn evaluate(&self, y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
        let rows = || y_true.iter().zip(y_pred.iter());
        let n = y_true.len().min(y_pred.len());
        if n == 0 {
            return None;
        }

        match self {
            Self::Accuracy => {
                let c = Confusion::from_rows(rows());
                ratio(c.tp + c.tn, c.total())
            }
            Self::BalancedAccuracy => {
                let c = Confusion::from_rows(rows());
                let tpr = ratio(c.tp, c.tp + c.fn_);
                let tnr = ratio(c.tn, c.tn + c.fp);
                mean(tpr.into_iter().chain(tnr))
            }
            Self::Precision => {
                let c = Confusion::from_rows(rows());
                ratio(c.tp, c.tp + c.fp)
            }
            Self::Recall => {
                let c = Confusion::from_rows(rows());
                ratio(c.tp, c.tp + c.fn_)
            }
            Self::F1 => {
                let c = Confusion::from_rows(rows());
                ratio(2 * c.tp, 2 * c.tp + c.fp + c.fn_)
            }
            Self::SelectionRate => {
                let c = Confusion::from_rows(rows());
                ratio(c.tp + c.fp, c.total())
            }
            Self::FalsePositiveRate => {
                let c = Confusion::from_rows(rows());
                ratio(c.fp, c.fp + c.tn)
            }
            Self::FalseNegativeRate => {
                let c = Confusion::from_rows(rows());
                ratio(c.fn_, c.fn_ + c.tp)
            }
            Self::ErrorRate => {
                let c = Confusion::from_rows(rows());
                ratio(c.fp + c.fn_, c.total())
            }
            Self::Overprediction => {
                let c = Confusion::from_rows(rows());
                ratio(c.fp, c.total())
            }
            Self::Underprediction => {
                let c = Confusion::from_rows(rows());
                ratio(c.fn_, c.total())
            }
            Self::MeanAbsoluteError => mean(rows().map(|(t, p)| (p - t).abs())),
            Self::MeanSquaredError => mean(rows().map(|(t, p)| (p - t).powi(2))),
            Self::RootMeanSquaredError => {
                mean(rows().map(|(t, p)| (p - t).powi(2))).map(f64::sqrt)
            }
            Self::R2 => {
                let y_mean = mean(y_true.iter().take(n).copied())?;
                let ss_tot: f64 = y_true.iter().take(n).map(|t| (t - y_mean).powi(2)).sum();
                let ss_res: f64 = rows().map(|(t, p)| (t - p).powi(2)).sum();
                (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot)
            }
            Self::Average => mean(y_pred.iter().take(n).copied()),
            Self::MeanOverprediction => mean(rows().map(|(t, p)| (p - t).max(0.0))),
            Self::MeanUnderprediction => mean(rows().map(|(t, p)| (t - p).max(0.0))),
        }
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(MetricError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// Score a metric by key over all rows.
///
/// # Examples
///
/// ```
/// use fairlens_metrics::score;
///
/// let y_true = [1.0, 0.0, 1.0, 0.0];
/// let y_pred = [1.0, 0.0, 0.0, 0.0];
/// assert_eq!(score("accuracy_score", &y_true, &y_pred).unwrap(), Some(0.75));
/// ```
pub fn score(key: &str, y_true: &[f64], y_pred: &[f64]) -> Result<Option<f64>> {
    let metric = PerformanceMetric::from_key(key)
        .ok_or_else(|| MetricError::UnknownMetric(key.to_string()))?;
    check_len("predictions", y_true.len(), y_pred.len())?;
    Ok(metric.evaluate(y_true, y_pred))
}

/// Score a metric over all rows and per group.
///
/// `bin_vector[i]` is the group of row `i`. The result has one bin per group
/// index from `0` to the largest index present; a group with no rows, or whose
/// score is undefined, is `None`.
///
/// Group indices must be below the larger of the row count and
/// [`MIN_GROUP_LIMIT`]; a larger index is a [`MetricError::InvalidBin`].
pub fn score_by_group(
    key: &str,
    y_true: &[f64],
    y_pred: &[f64],
    bin_vector: &[usize],
) -> Result<MetricValue> {
    let metric = PerformanceMetric::from_key(key)
        .ok_or_else(|| MetricError::UnknownMetric(key.to_string()))?;
    check_len("predictions", y_true.len(), y_pred.len())?;
    check_len("bin vector", y_true.len(), bin_vector.len())?;

    let limit = y_true.len().max(MIN_GROUP_LIMIT);
    for (row, &bin) in bin_vector.iter().enumerate() {
        if bin >= limit {
            return Err(MetricError::InvalidBin { row, bin, limit });
        }
    }

    let group_count = match bin_vector.iter().max() {
        Some(&max) => max.checked_add(1).unwrap_or(limit),
        None => 0,
    };
    let mut group_true: Vec<Vec<f64>> = vec![Vec::new(); group_count];
    let mut group_pred: Vec<Vec<f64>> = vec![Vec::new(); group_count];
    for ((&bin, &t), &p) in bin_vector.iter().zip(y_true).zip(y_pred) {
        group_true[bin].push(t);
        group_pred[bin].push(p);
    }

    let bins = group_true
        .iter()
        .zip(&group_pred)
        .map(|(t, p)| metric.evaluate(t, p))
        .collect();

    Ok(MetricValue::new(metric.evaluate(y_true, y_pred), Some(bins)))
}
