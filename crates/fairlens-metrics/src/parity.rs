//! Parity modes and disparity arithmetic.
//!
//! A disparity reduces a per-group breakdown to one number:
//!
//! - `Difference`: max - min over the groups (0 is perfect parity)
//! - `Ratio`: min / max over the groups (1 is perfect parity)
//!
//! Missing and `NaN` group scores are dropped before the reduction so that a
//! single failed group does not poison the result. Degenerate inputs (no
//! valid group, or a ratio whose max is zero) give `NaN` rather than an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How group scores are reduced to a disparity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityMode {
    /// Largest minus smallest group score
    Difference,
    /// Smallest divided by largest group score
    Ratio,
}

impl ParityMode {
    /// Lowercase name of the mode.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Difference => "difference",
            Self::Ratio => "ratio",
        }
    }

    /// Fold several disparities into the worst one.
    ///
    /// `Difference` keeps the largest gap and `Ratio` the smallest ratio. The
    /// result is `NaN` when `values` is empty or any input is `NaN`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fairlens_metrics::ParityMode;
    ///
    /// assert_eq!(ParityMode::Difference.combine([0.1, 0.3]), 0.3);
    /// assert_eq!(ParityMode::Ratio.combine([0.9, 0.6]), 0.6);
    /// assert!(ParityMode::Ratio.combine([0.9, f64::NAN]).is_nan());
    /// ```
    pub fn combine<I>(self, values: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let mut worst: Option<f64> = None;
        for v in values {
            if v.is_nan() {
                return f64::NAN;
            }
            worst = Some(match (self, worst) {
                (_, None) => v,
                (Self::Difference, Some(w)) => w.max(v),
                (Self::Ratio, Some(w)) => w.min(v),
            });
        }
        worst.unwrap_or(f64::NAN)
    }
}

impl fmt::Display for ParityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "difference" => Ok(Self::Difference),
            "ratio" => Ok(Self::Ratio),
            other => Err(format!("Invalid parity mode: {}", other)),
        }
    }
}

/// Disparity of a per-group breakdown.
///
/// # Examples
///
/// ```
/// use fairlens_metrics::{ParityMode, disparity};
///
/// let bins = [Some(0.2), Some(0.5), Some(0.8)];
/// assert!((disparity(&bins, ParityMode::Difference) - 0.6).abs() < 1e-12);
/// assert!((disparity(&bins, ParityMode::Ratio) - 0.25).abs() < 1e-12);
/// assert!(disparity(&[Some(0.0), Some(0.0)], ParityMode::Ratio).is_nan());
/// ```
pub fn disparity(bins: &[Option<f64>], mode: ParityMode) -> f64 {
    let mut valid = bins.iter().filter_map(|b| *b).filter(|v| !v.is_nan());

    let Some(first) = valid.next() else {
        return f64::NAN;
    };
    let (min, max) = valid.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

    match mode {
        ParityMode::Difference => max - min,
        ParityMode::Ratio if max == 0.0 => f64::NAN,
        ParityMode::Ratio => min / max,
    }
}
