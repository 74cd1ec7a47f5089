//! Per-sample abundance estimator
//!
//! Converts a fitted detection function, a detection set and a site set into
//! one abundance (or density, with `area = 1`) value. Two regimes:
//!
//! - **Closed form** when detection probability does not depend on
//!   covariates: `N = s̄ · n · A / (2 · esw · L)` for lines and
//!   `N = s̄ · n · A / (π · ρ² · K)` for points.
//! - **Covariate general** otherwise: a Horvitz-Thompson sum
//!   `S = Σ s_i / c_i` where `c_i` is the normalizing constant of row `i`,
//!   scaled by `A / (2L)` for lines and `A / (π · ρ · n)` for points.

use distance_core::{
    validate_survey, DetectionFunction, DetectionRecord, Error, Result, SiteRecord, SurveyGeometry,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, instrument, warn};

/// Survey effort entering the area factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SurveyEffort {
    /// Total transect length (line surveys)
    TotalLength(f64),
    /// Number of surveyed points (point surveys)
    Points(usize),
}

impl SurveyEffort {
    /// Effort of a site set under the given geometry
    pub fn of(sites: &[SiteRecord], geometry: SurveyGeometry) -> Result<Self> {
        match geometry {
            SurveyGeometry::Point => Ok(Self::Points(sites.len())),
            SurveyGeometry::Line => {
                let mut total = 0.0;
                for (row, site) in sites.iter().enumerate() {
                    total += site.length.ok_or_else(|| Error::missing_value("length", row))?;
                }
                Ok(Self::TotalLength(total))
            }
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Self::TotalLength(length) => *length,
            Self::Points(count) => *count as f64,
        }
    }
}

/// Result of one estimator evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleEstimate {
    /// Abundance in `area` (density when `area = 1`)
    pub estimate: f64,
    /// Detections inside the truncation window
    pub n_detections: usize,
    pub average_group_size: f64,
    /// Effective strip width or effective radius
    pub effective_width: f64,
    pub effort: SurveyEffort,
    /// Rows left out of the covariate-general sum because their normalizing
    /// constant could not be computed
    pub skipped_rows: usize,
}

/// Detections with `w_lo <= distance <= w_hi`, paired with their row index
pub fn truncate(
    detections: &[DetectionRecord],
    w_lo: f64,
    w_hi: f64,
) -> Vec<(usize, &DetectionRecord)> {
    detections
        .iter()
        .enumerate()
        .filter(|(_, d)| d.within(w_lo, w_hi))
        .collect()
}

/// Estimate abundance from one detection/site set
///
/// The survey is validated against the model's geometry and formula first,
/// so unknown sites and missing values are reported before any computation.
/// Inputs are not modified. The effective width always comes from `model`.
pub fn estimate<M>(
    model: &M,
    detections: &[DetectionRecord],
    sites: &[SiteRecord],
    area: f64,
) -> Result<SampleEstimate>
where
    M: DetectionFunction + ?Sized,
{
    validate_survey(detections, sites, model.geometry(), model.formula())?;
    estimate_unchecked(model, detections, sites, area)
}

/// [`estimate`] without input validation
///
/// For surveys already validated, and for bootstrap replicates whose site
/// table repeats ids drawn more than once.
#[instrument(skip_all, fields(n_detections = detections.len(), n_sites = sites.len(), area))]
pub fn estimate_unchecked<M>(
    model: &M,
    detections: &[DetectionRecord],
    sites: &[SiteRecord],
    area: f64,
) -> Result<SampleEstimate>
where
    M: DetectionFunction + ?Sized,
{
    if !(area > 0.0 && area.is_finite()) {
        return Err(Error::InvalidParameter(format!(
            "area must be positive and finite, got {area}"
        )));
    }

    let (w_lo, w_hi) = model.truncation();
    let kept = truncate(detections, w_lo, w_hi);
    let n = kept.len();
    let total_group: f64 = kept.iter().map(|(_, d)| d.group_size).sum();
    let average_group_size = if n > 0 { total_group / n as f64 } else { 0.0 };

    let geometry = model.geometry();
    let effort = SurveyEffort::of(sites, geometry)?;
    let effective_width = model.effective_width()?;
    if !(effective_width > 0.0 && effective_width.is_finite()) {
        return Err(Error::Computation(format!(
            "effective width must be positive and finite, got {effective_width}"
        )));
    }

    let mut skipped_rows = 0;
    let estimate = if n == 0 {
        0.0
    } else if model.has_covariates() {
        let mut sum = 0.0;
        for &(row, det) in &kept {
            let design = model.covariate_row(det, row)?;
            match model.normalizing_constant(det.distance, &design) {
                Ok(c) => sum += det.group_size / c,
                Err(e) => {
                    warn!(
                        row,
                        distance = det.distance,
                        error = %e,
                        "skipping detection in abundance sum"
                    );
                    skipped_rows += 1;
                }
            }
        }
        let area_factor = match effort {
            SurveyEffort::Points(_) => PI * effective_width * n as f64,
            SurveyEffort::TotalLength(length) => 2.0 * length,
        };
        sum * area / area_factor
    } else {
        let denominator = match effort {
            SurveyEffort::Points(count) => PI * effective_width * effective_width * count as f64,
            SurveyEffort::TotalLength(length) => 2.0 * effective_width * length,
        };
        average_group_size * n as f64 * area / denominator
    };

    debug!(
        estimate,
        n,
        average_group_size,
        effective_width,
        skipped_rows,
        covariates = model.has_covariates(),
        "abundance estimate"
    );

    Ok(SampleEstimate {
        estimate,
        n_detections: n,
        average_group_size,
        effective_width,
        effort,
        skipped_rows,
    })
}
