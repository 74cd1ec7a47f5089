//! Survey data model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Survey design type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyGeometry {
    /// Line transects: perpendicular distances, effort is total length
    Line,
    /// Point transects: radial distances, effort is number of points
    Point,
}

impl SurveyGeometry {
    pub fn is_point(&self) -> bool {
        matches!(self, Self::Point)
    }
}

impl fmt::Display for SurveyGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line => write!(f, "line"),
            Self::Point => write!(f, "point"),
        }
    }
}

/// A single detected group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Site (transect or point) on which the group was detected
    pub site_id: String,
    /// Number of individuals in the group
    pub group_size: f64,
    /// Perpendicular (line) or radial (point) distance
    pub distance: f64,
    /// Named covariate values used by the detection function formula
    #[serde(default)]
    pub covariates: BTreeMap<String, f64>,
}

impl DetectionRecord {
    pub fn new(site_id: impl Into<String>, group_size: f64, distance: f64) -> Self {
        Self {
            site_id: site_id.into(),
            group_size,
            distance,
            covariates: BTreeMap::new(),
        }
    }

    /// Attach a covariate value
    pub fn with_covariate(mut self, name: impl Into<String>, value: f64) -> Self {
        self.covariates.insert(name.into(), value);
        self
    }

    /// Whether the distance lies inside `[w_lo, w_hi]` (both ends inclusive)
    #[inline]
    pub fn within(&self, w_lo: f64, w_hi: f64) -> bool {
        w_lo <= self.distance && self.distance <= w_hi
    }
}

/// One surveyed unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub site_id: String,
    /// Transect length; required for line surveys, ignored for points
    #[serde(default)]
    pub length: Option<f64>,
}

impl SiteRecord {
    /// A line transect of the given length
    pub fn line(site_id: impl Into<String>, length: f64) -> Self {
        Self {
            site_id: site_id.into(),
            length: Some(length),
        }
    }

    /// A point transect
    pub fn point(site_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            length: None,
        }
    }
}

/// One target in a double-observer trial
///
/// Each row records which of the two observers saw the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleObserverRecord {
    pub observer1: bool,
    pub observer2: bool,
}

impl DoubleObserverRecord {
    pub fn new(observer1: bool, observer2: bool) -> Self {
        Self {
            observer1,
            observer2,
        }
    }
}
