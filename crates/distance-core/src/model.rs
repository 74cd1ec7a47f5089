//! Fitted detection functions
//!
//! [`DetectionFunction`] is the read-only view of a fitted model that the
//! abundance estimator and the bootstrap consume. [`DetectionFunctionModel`]
//! is the registry-backed implementation: it holds a snapshot of the fit
//! (parameters, configuration, convergence) and derives effective strip
//! width, effective radius and per-row normalizing constants from the
//! resolved likelihood.

use crate::formula::CovariateFormula;
use crate::integration::{integrate, normalizing_constant, NormalizingSpec};
use crate::likelihood::{DensityArgs, ExpansionSeries, Likelihood, LikelihoodRegistry};
use crate::{DetectionRecord, DoubleObserverRecord, Error, Result, SurveyGeometry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Value of the detection function at the scaling distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GxScale {
    /// Known detection probability at `x0` (1 for perfect detection on the line)
    Value(f64),
    /// Double-observer trial from which `g(x0)` is estimated
    DoubleObserver(Vec<DoubleObserverRecord>),
}

impl GxScale {
    /// Resolve to a probability
    ///
    /// For a double-observer table this is the fraction of targets seen by
    /// observer 2 that observer 1 also saw.
    pub fn resolve(&self) -> Result<f64> {
        let g = match self {
            Self::Value(g) => *g,
            Self::DoubleObserver(table) => {
                let seen_by_2 = table.iter().filter(|r| r.observer2).count();
                if seen_by_2 == 0 {
                    return Err(Error::InvalidParameter(
                        "double-observer table has no observer-2 detections".to_string(),
                    ));
                }
                let seen_by_both = table.iter().filter(|r| r.observer1 && r.observer2).count();
                seen_by_both as f64 / seen_by_2 as f64
            }
        };
        if g > 0.0 && g <= 1.0 {
            Ok(g)
        } else {
            Err(Error::InvalidParameter(format!(
                "g(x0) must be in (0, 1], got {g}"
            )))
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Self::DoubleObserver(_))
    }
}

/// Distance at which the detection function is anchored, and its value there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingReference {
    pub x0: f64,
    pub g0: GxScale,
}

impl Default for ScalingReference {
    fn default() -> Self {
        Self {
            x0: 0.0,
            g0: GxScale::Value(1.0),
        }
    }
}

/// Everything needed to re-issue an equivalent fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub likelihood: String,
    pub w_lo: f64,
    pub w_hi: f64,
    pub expansions: usize,
    pub series: ExpansionSeries,
    pub scaling: ScalingReference,
    pub geometry: SurveyGeometry,
}

impl FitConfig {
    pub fn new(likelihood: impl Into<String>, w_hi: f64, geometry: SurveyGeometry) -> Self {
        Self {
            likelihood: likelihood.into(),
            w_lo: 0.0,
            w_hi,
            expansions: 0,
            series: ExpansionSeries::default(),
            scaling: ScalingReference::default(),
            geometry,
        }
    }

    pub fn with_lower_bound(mut self, w_lo: f64) -> Self {
        self.w_lo = w_lo;
        self
    }

    pub fn with_expansions(mut self, expansions: usize, series: ExpansionSeries) -> Self {
        self.expansions = expansions;
        self.series = series;
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingReference) -> Self {
        self.scaling = scaling;
        self
    }

    /// Check bounds, expansion count and scaling distance
    pub fn validate(&self) -> Result<()> {
        if !(self.w_lo >= 0.0 && self.w_lo < self.w_hi && self.w_hi.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "truncation bounds [{}, {}] are not a valid range",
                self.w_lo, self.w_hi
            )));
        }
        if !(self.w_lo..=self.w_hi).contains(&self.scaling.x0) {
            return Err(Error::InvalidParameter(format!(
                "scaling distance {} lies outside [{}, {}]",
                self.scaling.x0, self.w_lo, self.w_hi
            )));
        }
        self.series.validate(self.expansions)
    }
}

/// Read-only view of a fitted detection function
pub trait DetectionFunction: Send + Sync {
    /// Configuration the model was fitted with
    fn config(&self) -> &FitConfig;

    /// Covariate formula of the scale parameter
    fn formula(&self) -> &CovariateFormula;

    fn parameters(&self) -> &[f64];

    /// Whether the optimizer reported convergence
    fn converged(&self) -> bool;

    /// Effective strip width (line surveys)
    fn effective_strip_width(&self) -> Result<f64>;

    /// Effective detection radius (point surveys)
    fn effective_radius(&self) -> Result<f64>;

    /// Area under the unscaled detection function for one design row
    fn normalizing_constant(&self, distance: f64, covariate_row: &[f64]) -> Result<f64>;

    fn has_covariates(&self) -> bool {
        self.formula().has_covariates()
    }

    fn geometry(&self) -> SurveyGeometry {
        self.config().geometry
    }

    fn truncation(&self) -> (f64, f64) {
        (self.config().w_lo, self.config().w_hi)
    }

    /// Strip width or radius, by geometry
    fn effective_width(&self) -> Result<f64> {
        match self.geometry() {
            SurveyGeometry::Line => self.effective_strip_width(),
            SurveyGeometry::Point => self.effective_radius(),
        }
    }

    /// Design row for one detection
    fn covariate_row(&self, detection: &DetectionRecord, row: usize) -> Result<Vec<f64>> {
        self.formula().design_row(detection, row)
    }
}

/// Registry-backed fitted detection function
#[derive(Clone)]
pub struct DetectionFunctionModel {
    config: FitConfig,
    formula: CovariateFormula,
    parameters: Vec<f64>,
    converged: bool,
    likelihood: Arc<dyn Likelihood>,
    reference_row: Vec<f64>,
    g0: f64,
}

impl DetectionFunctionModel {
    pub fn builder(config: FitConfig, parameters: Vec<f64>) -> DetectionFunctionModelBuilder {
        DetectionFunctionModelBuilder {
            config,
            parameters,
            formula: CovariateFormula::intercept_only(),
            converged: true,
            reference_row: None,
        }
    }

    /// Resolved `g(x0)`
    pub fn g0(&self) -> f64 {
        self.g0
    }

    /// Design row at which the single effective width is reported
    pub fn reference_row(&self) -> &[f64] {
        &self.reference_row
    }

    pub fn likelihood(&self) -> &Arc<dyn Likelihood> {
        &self.likelihood
    }

    fn rows(&self) -> Option<Vec<Vec<f64>>> {
        self.formula
            .has_covariates()
            .then(|| vec![self.reference_row.clone()])
    }

    /// Detection function at the reference row, scaled so `g(x0) = g0`
    pub fn detection_probability(&self, distances: &[f64]) -> Result<Vec<f64>> {
        let rows = self.rows();
        let density = |xs: &[f64]| {
            self.likelihood.density(&DensityArgs {
                parameters: &self.parameters,
                distances: xs,
                covariates: rows.as_deref(),
                geometry: self.config.geometry,
                w_lo: self.config.w_lo,
                w_hi: self.config.w_hi,
                series: self.config.series,
                expansions: self.config.expansions,
                scale: false,
            })
        };
        let anchor = density(&[self.config.scaling.x0])?
            .first()
            .copied()
            .ok_or_else(|| {
                Error::Computation(format!(
                    "likelihood `{}` returned no value at the scaling distance",
                    self.likelihood.name()
                ))
            })?;
        if !(anchor > 0.0 && anchor.is_finite()) {
            return Err(Error::Computation(format!(
                "detection function is {anchor} at the scaling distance {}",
                self.config.scaling.x0
            )));
        }
        let factor = self.g0 / anchor;
        Ok(density(distances)?.into_iter().map(|g| g * factor).collect())
    }

    fn scaled_integral(&self, weight_by_distance: bool) -> Result<f64> {
        let value = integrate(
            |xs: &[f64]| {
                let mut ys = self.detection_probability(xs)?;
                if weight_by_distance {
                    for (y, &x) in ys.iter_mut().zip(xs) {
                        *y *= x;
                    }
                }
                Ok(ys)
            },
            self.config.w_lo,
            self.config.w_hi,
        )?;
        if value > 0.0 {
            Ok(value)
        } else {
            Err(Error::Computation(format!(
                "detection function integrates to {value} over [{}, {}]",
                self.config.w_lo, self.config.w_hi
            )))
        }
    }
}

impl DetectionFunction for DetectionFunctionModel {
    fn config(&self) -> &FitConfig {
        &self.config
    }

    fn formula(&self) -> &CovariateFormula {
        &self.formula
    }

    fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    fn converged(&self) -> bool {
        self.converged
    }

    fn effective_strip_width(&self) -> Result<f64> {
        self.scaled_integral(false)
    }

    fn effective_radius(&self) -> Result<f64> {
        Ok((2.0 * self.scaled_integral(true)?).sqrt())
    }

    fn normalizing_constant(&self, distance: f64, covariate_row: &[f64]) -> Result<f64> {
        let covariate_row: &[f64] = if self.formula.has_covariates() {
            covariate_row
        } else {
            &[]
        };
        let spec = NormalizingSpec {
            likelihood: self.likelihood.as_ref(),
            parameters: &self.parameters,
            w_lo: self.config.w_lo,
            w_hi: self.config.w_hi,
            expansions: self.config.expansions,
            series: self.config.series,
            geometry: self.config.geometry,
        };
        normalizing_constant(&spec, distance, covariate_row)
    }
}

impl fmt::Debug for DetectionFunctionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionFunctionModel")
            .field("likelihood", &self.config.likelihood)
            .field("formula", &self.formula.to_string())
            .field("parameters", &self.parameters)
            .field("geometry", &self.config.geometry)
            .field("w_lo", &self.config.w_lo)
            .field("w_hi", &self.config.w_hi)
            .field("converged", &self.converged)
            .finish()
    }
}

/// Builder for [`DetectionFunctionModel`]
#[derive(Debug, Clone)]
pub struct DetectionFunctionModelBuilder {
    config: FitConfig,
    parameters: Vec<f64>,
    formula: CovariateFormula,
    converged: bool,
    reference_row: Option<Vec<f64>>,
}

impl DetectionFunctionModelBuilder {
    pub fn formula(mut self, formula: CovariateFormula) -> Self {
        self.formula = formula;
        self
    }

    pub fn converged(mut self, converged: bool) -> Self {
        self.converged = converged;
        self
    }

    /// Use the column means of the design built from `detections` as the
    /// reference row
    pub fn reference_detections(mut self, detections: &[DetectionRecord]) -> Result<Self> {
        self.reference_row = Some(self.formula.mean_row(detections)?);
        Ok(self)
    }

    pub fn reference_row(mut self, row: Vec<f64>) -> Self {
        self.reference_row = Some(row);
        self
    }

    /// Resolve the likelihood and check the parameter layout
    pub fn build(self, registry: &LikelihoodRegistry) -> Result<DetectionFunctionModel> {
        self.config.validate()?;
        let likelihood = registry.get(&self.config.likelihood)?;
        let g0 = self.config.scaling.g0.resolve()?;

        let reference_row = match self.reference_row {
            Some(row) => row,
            None => {
                let mut row = vec![0.0; self.formula.n_columns()];
                row[0] = 1.0;
                row
            }
        };
        if reference_row.len() != self.formula.n_columns() {
            return Err(Error::InvalidParameter(format!(
                "reference row has {} columns, formula `{}` has {}",
                reference_row.len(),
                self.formula,
                self.formula.n_columns()
            )));
        }

        let model = DetectionFunctionModel {
            config: self.config,
            formula: self.formula,
            parameters: self.parameters,
            converged: self.converged,
            likelihood,
            reference_row,
            g0,
        };
        // Surfaces parameter-count mismatches at construction time
        model.detection_probability(&[model.config.scaling.x0])?;
        Ok(model)
    }
}
