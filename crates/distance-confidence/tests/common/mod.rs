//! Shared fixtures for integration tests

#![allow(dead_code)]

pub use approx::assert_relative_eq;

use distance_core::{
    CovariateFormula, DetectionFunction, DetectionFunctionFitter, DetectionRecord, FitConfig,
    FitRequest, Result, SiteRecord, SurveyGeometry,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Detection function with a fixed effective width
#[derive(Debug, Clone)]
pub struct FixedWidthModel {
    pub config: FitConfig,
    pub formula: CovariateFormula,
    pub width: f64,
    pub converged: bool,
}

impl FixedWidthModel {
    pub fn line(width: f64, w_hi: f64) -> Self {
        Self {
            config: FitConfig::new("halfnorm", w_hi, SurveyGeometry::Line),
            formula: CovariateFormula::intercept_only(),
            width,
            converged: true,
        }
    }
}

impl DetectionFunction for FixedWidthModel {
    fn config(&self) -> &FitConfig {
        &self.config
    }

    fn formula(&self) -> &CovariateFormula {
        &self.formula
    }

    fn parameters(&self) -> &[f64] {
        &[]
    }

    fn converged(&self) -> bool {
        self.converged
    }

    fn effective_strip_width(&self) -> Result<f64> {
        Ok(self.width)
    }

    fn effective_radius(&self) -> Result<f64> {
        Ok(self.width)
    }

    fn normalizing_constant(&self, _distance: f64, _covariate_row: &[f64]) -> Result<f64> {
        Ok(self.width)
    }
}

/// Fitter returning fixed-width models; the first `non_converged` calls
/// report non-convergence
#[derive(Debug, Default)]
pub struct ScriptedFitter {
    pub width: f64,
    pub non_converged: usize,
    calls: AtomicUsize,
}

impl ScriptedFitter {
    pub fn new(width: f64, non_converged: usize) -> Self {
        Self {
            width,
            non_converged,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DetectionFunctionFitter for ScriptedFitter {
    type Model = FixedWidthModel;

    fn fit(&self, request: &FitRequest<'_>) -> Result<FixedWidthModel> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FixedWidthModel {
            config: request.config.clone(),
            formula: request.formula.clone(),
            width: self.width,
            converged: call >= self.non_converged,
        })
    }
}

/// 10 transects of length 100, five pairs seen on each
pub fn balanced_survey() -> (Vec<SiteRecord>, Vec<DetectionRecord>) {
    let sites = (0..10).map(|i| SiteRecord::line(format!("T{i}"), 100.0)).collect();
    let detections = (0..50)
        .map(|i| DetectionRecord::new(format!("T{}", i % 10), 2.0, (i % 7) as f64 * 5.0))
        .collect();
    (sites, detections)
}

/// Transects of uneven length and encounter rate
pub fn uneven_survey() -> (Vec<SiteRecord>, Vec<DetectionRecord>) {
    let lengths = [80.0, 120.0, 95.0, 150.0, 60.0, 110.0, 130.0, 70.0];
    let sites = lengths
        .iter()
        .enumerate()
        .map(|(i, &len)| SiteRecord::line(format!("U{i}"), len))
        .collect();
    let detections = (0..40)
        .filter(|i| i % 8 != 3)
        .map(|i| {
            DetectionRecord::new(
                format!("U{}", (i * i) % 8),
                1.0 + (i % 3) as f64,
                ((i * 7) % 45) as f64,
            )
        })
        .collect();
    (sites, detections)
}
