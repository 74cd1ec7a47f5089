//! High-level API for abundance estimation
//!
//! [`estimate_abundance`] validates the survey, computes the point
//! estimate, runs the bootstrap when a confidence level is requested and
//! adds the per-site breakdown when asked for.

use crate::bootstrap::{AbundanceBootstrap, BootstrapDiagnostics};
use crate::{AbundanceEstimate, ConfidenceLevel};
use distance_abundance::{estimate_unchecked, per_unit_estimates};
use distance_core::{
    validate_survey, DetectionFunction, DetectionFunctionFitter, DetectionRecord, Error, Result,
    SiteRecord,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Default number of bootstrap resamples
pub const DEFAULT_RESAMPLES: usize = 500;

/// Default confidence level for intervals
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Options for [`estimate_abundance`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbundanceOptions {
    /// Area the abundance refers to; `1` gives a density
    pub area: f64,
    /// Interval level; `None` skips the bootstrap
    pub confidence_level: Option<f64>,
    pub n_bootstrap: usize,
    /// Also report one estimate per site
    pub by_unit: bool,
    /// Bootstrap seed; drawn from the thread RNG when absent
    pub seed: Option<u64>,
    /// Run bootstrap iterations on the rayon pool (requires the `parallel`
    /// feature)
    pub parallel: bool,
}

impl Default for AbundanceOptions {
    fn default() -> Self {
        Self {
            area: 1.0,
            confidence_level: Some(DEFAULT_CONFIDENCE_LEVEL),
            n_bootstrap: DEFAULT_RESAMPLES,
            by_unit: false,
            seed: None,
            parallel: false,
        }
    }
}

impl AbundanceOptions {
    pub fn with_area(mut self, area: f64) -> Self {
        self.area = area;
        self
    }

    pub fn with_confidence_level(mut self, level: Option<f64>) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn with_bootstrap(mut self, n_bootstrap: usize) -> Self {
        self.n_bootstrap = n_bootstrap;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn by_unit(mut self, by_unit: bool) -> Self {
        self.by_unit = by_unit;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Bootstrap engine configured from these options, or `None` when no
    /// interval is requested
    pub fn bootstrap(&self) -> Result<Option<AbundanceBootstrap>> {
        let Some(level) = self.confidence_level else {
            return Ok(None);
        };
        if self.n_bootstrap == 0 {
            return Err(Error::InvalidParameter(
                "n_bootstrap must be positive when a confidence level is set".to_string(),
            ));
        }
        let mut bootstrap = AbundanceBootstrap::default()
            .with_resamples(self.n_bootstrap)
            .with_confidence_level(ConfidenceLevel::new(level)?)
            .with_parallel(self.parallel);
        if let Some(seed) = self.seed {
            bootstrap = bootstrap.with_seed(seed);
        }
        Ok(Some(bootstrap))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.area > 0.0 && self.area.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "area must be positive and finite, got {}",
                self.area
            )));
        }
        self.bootstrap().map(|_| ())
    }
}

/// Estimate abundance with an optional bootstrap interval
///
/// Input errors are reported before any computation. The detection function
/// is never refitted on the original data; `fitter` is only called on
/// bootstrap replicates.
///
/// # Example
/// ```rust
/// use distance_confidence::{estimate_abundance, AbundanceOptions};
/// use distance_core::{
///     fn_fitter, DetectionFunctionModel, DetectionRecord, FitConfig, FitRequest,
///     LikelihoodRegistry, SiteRecord, SurveyGeometry,
/// };
///
/// let registry = LikelihoodRegistry::with_builtins();
/// let config = FitConfig::new("halfnorm", 30.0, SurveyGeometry::Line);
/// let model = DetectionFunctionModel::builder(config, vec![10.0]).build(&registry).unwrap();
///
/// let sites = vec![SiteRecord::line("A", 200.0), SiteRecord::line("B", 300.0)];
/// let detections = vec![
///     DetectionRecord::new("A", 1.0, 2.0),
///     DetectionRecord::new("A", 2.0, 8.5),
///     DetectionRecord::new("B", 1.0, 14.0),
/// ];
///
/// // Stand-in for a maximum-likelihood fitter: reuse the original parameters
/// let fitter = fn_fitter(|request: &FitRequest<'_>| {
///     DetectionFunctionModel::builder(request.config.clone(), vec![10.0]).build(&registry)
/// });
///
/// let options = AbundanceOptions::default().with_bootstrap(50).with_seed(7);
/// let result = estimate_abundance(&model, &detections, &sites, &fitter, &options).unwrap();
/// assert_eq!(result.bootstrap.len(), 50);
/// assert!(result.interval.is_some());
/// ```
#[instrument(
    skip_all,
    fields(
        n_detections = detections.len(),
        n_sites = sites.len(),
        area = options.area,
        n_bootstrap = options.n_bootstrap
    )
)]
pub fn estimate_abundance<D, F>(
    model: &D,
    detections: &[DetectionRecord],
    sites: &[SiteRecord],
    fitter: &F,
    options: &AbundanceOptions,
) -> Result<AbundanceEstimate>
where
    D: DetectionFunction + ?Sized,
    F: DetectionFunctionFitter,
{
    options.validate()?;
    validate_survey(detections, sites, model.geometry(), model.formula())?;

    let mut result = match options.bootstrap()? {
        Some(bootstrap) => bootstrap.run(model, detections, sites, options.area, fitter)?,
        None => {
            debug!("no confidence level requested, skipping bootstrap");
            let theta0 = estimate_unchecked(model, detections, sites, options.area)?;
            AbundanceEstimate {
                estimate: theta0.estimate,
                effective_width: theta0.effective_width,
                n_detections: theta0.n_detections,
                average_group_size: theta0.average_group_size,
                survey_effort: theta0.effort.value(),
                area: options.area,
                interval: None,
                bootstrap: Vec::new(),
                diagnostics: BootstrapDiagnostics::default(),
                per_unit: None,
            }
        }
    };

    if options.by_unit {
        result.per_unit = Some(per_unit_estimates(model, detections, sites, options.area)?);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = AbundanceOptions::default();
        assert_eq!(options.area, 1.0);
        assert_eq!(options.confidence_level, Some(0.95));
        assert_eq!(options.n_bootstrap, 500);
        assert!(!options.by_unit);
        assert!(options.seed.is_none());
        assert!(!options.parallel);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_options() {
        assert!(AbundanceOptions::default().with_area(0.0).validate().is_err());
        assert!(AbundanceOptions::default().with_area(f64::INFINITY).validate().is_err());
        assert!(AbundanceOptions::default()
            .with_confidence_level(Some(1.0))
            .validate()
            .is_err());
        assert!(AbundanceOptions::default().with_bootstrap(0).validate().is_err());
        // Zero resamples are fine when no interval is requested
        assert!(AbundanceOptions::default()
            .with_confidence_level(None)
            .with_bootstrap(0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_bootstrap_from_options() {
        let bootstrap = AbundanceOptions::default()
            .with_bootstrap(20)
            .with_confidence_level(Some(0.9))
            .bootstrap()
            .unwrap()
            .unwrap();
        assert_eq!(bootstrap.n_resamples(), 20);
        assert_eq!(bootstrap.confidence_level().value(), 0.9);
    }
}
