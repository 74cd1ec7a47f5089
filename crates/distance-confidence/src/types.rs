//! Interval and result types

use crate::bootstrap::BootstrapDiagnostics;
use distance_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A confidence interval with lower and upper bounds
///
/// Bounds are NaN when no bootstrap replicate was usable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    /// The point estimate the interval belongs to
    pub estimate: f64,
    /// Confidence level (e.g., 0.95 for 95% CI)
    pub confidence_level: f64,
}

impl ConfidenceInterval {
    pub fn new(lower: f64, upper: f64, estimate: f64, confidence_level: f64) -> Self {
        Self {
            lower,
            upper,
            estimate,
            confidence_level,
        }
    }

    /// Interval with NaN bounds around a valid point estimate
    pub fn unavailable(estimate: f64, confidence_level: f64) -> Self {
        Self::new(f64::NAN, f64::NAN, estimate, confidence_level)
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Both bounds are finite numbers
    pub fn is_available(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn overlaps(&self, other: &ConfidenceInterval) -> bool {
        self.lower <= other.upper && other.lower <= self.upper
    }
}

impl fmt::Display for ConfidenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1}% CI: [{:.4}, {:.4}], estimate: {:.4}",
            self.confidence_level * 100.0,
            self.lower,
            self.upper,
            self.estimate
        )
    }
}

/// Confidence level in the open interval (0, 1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidenceLevel(f64);

impl ConfidenceLevel {
    pub fn new(level: f64) -> Result<Self> {
        if level > 0.0 && level < 1.0 {
            Ok(Self(level))
        } else {
            Err(Error::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {level}"
            )))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// 1 - level
    pub fn alpha(&self) -> f64 {
        1.0 - self.0
    }

    /// Tail probability of a two-sided interval
    pub fn tail_probability(&self) -> f64 {
        self.alpha() / 2.0
    }

    pub const NINETY: Self = Self(0.90);
    pub const NINETY_FIVE: Self = Self(0.95);
    pub const NINETY_NINE: Self = Self(0.99);
}

impl TryFrom<f64> for ConfidenceLevel {
    type Error = Error;

    fn try_from(level: f64) -> Result<Self> {
        Self::new(level)
    }
}

impl From<ConfidenceLevel> for f64 {
    fn from(level: ConfidenceLevel) -> f64 {
        level.0
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}

/// Abundance for a whole survey, with its bootstrap interval when requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbundanceEstimate {
    /// Point estimate on the original data
    pub estimate: f64,
    /// Effective strip width (lines) or effective radius (points)
    pub effective_width: f64,
    /// Detections inside the truncation window
    pub n_detections: usize,
    pub average_group_size: f64,
    /// Total transect length (lines) or number of points
    pub survey_effort: f64,
    pub area: f64,
    pub interval: Option<ConfidenceInterval>,
    /// One entry per requested replicate, `None` where the replicate was lost
    pub bootstrap: Vec<Option<f64>>,
    pub diagnostics: BootstrapDiagnostics,
    pub per_unit: Option<BTreeMap<String, f64>>,
}

impl AbundanceEstimate {
    /// Replicates that produced a value
    pub fn valid_replicates(&self) -> Vec<f64> {
        self.bootstrap.iter().flatten().copied().collect()
    }
}
