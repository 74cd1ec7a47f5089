//! Nonparametric bootstrap of the abundance estimate
//!
//! Each iteration resamples sites, asks the external fitter for a new
//! detection function on the replicate, and re-runs the abundance
//! estimator with the refit model. Replicates that cannot be used are kept
//! as `None` in the distribution and counted by cause in
//! [`BootstrapDiagnostics`]; the interval is computed from the rest.

use crate::api::DEFAULT_RESAMPLES;
use crate::bias_corrected::{BiasCorrectedPercentile, BootstrapMethod};
use crate::resample::resample;
use crate::{AbundanceEstimate, ConfidenceLevel};
use distance_abundance::{estimate, estimate_unchecked};
use distance_core::{
    DetectionFunction, DetectionFunctionFitter, DetectionRecord, Error, Result, SiteRecord,
};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Why replicates were left out of the interval
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapDiagnostics {
    /// Iterations requested
    pub requested: usize,
    /// Refits the fitter reported as not converged
    pub non_converged: usize,
    /// Refits that failed, or whose replicate estimate failed
    pub fit_errors: usize,
    /// Refits whose effective width was non-finite or beyond the truncation
    /// distance, or whose replicate estimate was non-finite
    pub out_of_range: usize,
}

impl BootstrapDiagnostics {
    /// Replicates excluded from the interval
    pub fn missing(&self) -> usize {
        self.non_converged + self.fit_errors + self.out_of_range
    }

    /// Replicates that produced a value
    pub fn valid(&self) -> usize {
        self.requested.saturating_sub(self.missing())
    }

    fn record(&mut self, outcome: &Replicate) {
        match outcome {
            Replicate::Value(_) => {}
            Replicate::NonConverged => self.non_converged += 1,
            Replicate::FitError => self.fit_errors += 1,
            Replicate::OutOfRange => self.out_of_range += 1,
        }
    }
}

/// Outcome of one bootstrap iteration
#[derive(Debug, Clone, Copy, PartialEq)]
enum Replicate {
    Value(f64),
    NonConverged,
    FitError,
    OutOfRange,
}

impl Replicate {
    fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }
}

/// Bootstrap engine for abundance estimates
///
/// Iteration `i` draws from its own `StdRng` seeded with `seed + i`, so the
/// distribution for a given seed does not depend on execution order.
#[derive(Debug, Clone)]
pub struct AbundanceBootstrap<M = BiasCorrectedPercentile> {
    method: M,
    n_resamples: usize,
    confidence_level: ConfidenceLevel,
    seed: Option<u64>,
    parallel: bool,
}

impl Default for AbundanceBootstrap {
    fn default() -> Self {
        Self::new(BiasCorrectedPercentile)
    }
}

impl<M: BootstrapMethod> AbundanceBootstrap<M> {
    pub fn new(method: M) -> Self {
        Self {
            method,
            n_resamples: DEFAULT_RESAMPLES,
            confidence_level: ConfidenceLevel::NINETY_FIVE,
            seed: None,
            parallel: false,
        }
    }

    /// Set the number of bootstrap resamples
    pub fn with_resamples(mut self, n_resamples: usize) -> Self {
        self.n_resamples = n_resamples;
        self
    }

    pub fn with_confidence_level(mut self, confidence_level: ConfidenceLevel) -> Self {
        self.confidence_level = confidence_level;
        self
    }

    /// Set random seed for reproducibility
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Spread iterations over the rayon pool (requires the `parallel` feature)
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn n_resamples(&self) -> usize {
        self.n_resamples
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        self.confidence_level
    }

    pub fn method(&self) -> &M {
        &self.method
    }

    /// Point estimate, bootstrap distribution and interval
    ///
    /// Inputs are assumed validated. Failures of the point estimate are
    /// returned; failures inside an iteration only mark that replicate
    /// missing.
    #[instrument(
        skip(self, model, detections, sites, fitter),
        fields(n_resamples = self.n_resamples, method = self.method.name())
    )]
    pub fn run<D, F>(
        &self,
        model: &D,
        detections: &[DetectionRecord],
        sites: &[SiteRecord],
        area: f64,
        fitter: &F,
    ) -> Result<AbundanceEstimate>
    where
        D: DetectionFunction + ?Sized,
        F: DetectionFunctionFitter,
    {
        if self.n_resamples == 0 {
            return Err(Error::InvalidParameter(
                "number of bootstrap resamples must be positive".to_string(),
            ));
        }

        let theta0 = estimate(model, detections, sites, area)?;
        let seed = self.seed.unwrap_or_else(|| thread_rng().gen());
        debug!(seed, theta0 = theta0.estimate, "starting bootstrap");

        let outcomes = self.execute_batch(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            replicate(i, model, detections, sites, area, fitter, &mut rng)
        });

        let mut diagnostics = BootstrapDiagnostics {
            requested: self.n_resamples,
            ..Default::default()
        };
        for outcome in &outcomes {
            diagnostics.record(outcome);
        }
        let bootstrap: Vec<Option<f64>> = outcomes.iter().map(Replicate::value).collect();
        let valid: Vec<f64> = bootstrap.iter().flatten().copied().collect();

        if valid.is_empty() {
            warn!(requested = diagnostics.requested, "no usable bootstrap replicates");
        }
        info!(
            requested = diagnostics.requested,
            valid = valid.len(),
            missing = diagnostics.missing(),
            non_converged = diagnostics.non_converged,
            fit_errors = diagnostics.fit_errors,
            out_of_range = diagnostics.out_of_range,
            "bootstrap finished"
        );

        let interval = self
            .method
            .calculate_interval(&valid, theta0.estimate, self.confidence_level)?;

        Ok(AbundanceEstimate {
            estimate: theta0.estimate,
            effective_width: theta0.effective_width,
            n_detections: theta0.n_detections,
            average_group_size: theta0.average_group_size,
            survey_effort: theta0.effort.value(),
            area,
            interval: Some(interval),
            bootstrap,
            diagnostics,
            per_unit: None,
        })
    }

    fn execute_batch<T, G>(&self, f: G) -> Vec<T>
    where
        G: Fn(usize) -> T + Sync + Send,
        T: Send,
    {
        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                use rayon::prelude::*;
                return (0..self.n_resamples).into_par_iter().map(f).collect();
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            if self.parallel {
                debug!("`parallel` feature disabled; running the bootstrap sequentially");
            }
        }
        (0..self.n_resamples).map(f).collect()
    }
}

/// One resample, refit and re-estimate
fn replicate<D, F, R>(
    iteration: usize,
    model: &D,
    detections: &[DetectionRecord],
    sites: &[SiteRecord],
    area: f64,
    fitter: &F,
    rng: &mut R,
) -> Replicate
where
    D: DetectionFunction + ?Sized,
    F: DetectionFunctionFitter,
    R: Rng + ?Sized,
{
    let config = model.config();
    let sample = resample(sites, detections, &config.scaling, rng);
    let config = sample.fit_config(config);

    let refit = match fitter.fit(&sample.fit_request(model.formula(), &config)) {
        Ok(refit) => refit,
        Err(e) => {
            debug!(iteration, error = %e, "refit failed");
            return Replicate::FitError;
        }
    };
    if !refit.converged() {
        debug!(iteration, "refit did not converge");
        return Replicate::NonConverged;
    }

    let (_, w_hi) = model.truncation();
    match refit.effective_width() {
        Ok(width) if width.is_finite() && width <= w_hi => {}
        Ok(width) => {
            debug!(iteration, width, w_hi, "refit effective width out of range");
            return Replicate::OutOfRange;
        }
        Err(e) => {
            debug!(iteration, error = %e, "refit effective width failed");
            return Replicate::FitError;
        }
    }

    match estimate_unchecked(&refit, &sample.detections, &sample.sites, area) {
        Ok(result) if result.estimate.is_finite() => Replicate::Value(result.estimate),
        Ok(result) => {
            debug!(iteration, estimate = result.estimate, "replicate estimate not finite");
            Replicate::OutOfRange
        }
        Err(e) => {
            debug!(iteration, error = %e, "replicate estimate failed");
            Replicate::FitError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use distance_core::{
        fn_fitter, CovariateFormula, DetectionFunctionModel, FitConfig, LikelihoodRegistry,
        SurveyGeometry,
    };

    fn survey() -> (Vec<SiteRecord>, Vec<DetectionRecord>) {
        let sites = (0..6).map(|i| SiteRecord::line(format!("T{i}"), 100.0)).collect();
        let detections = (0..30)
            .map(|i| {
                DetectionRecord::new(
                    format!("T{}", i % 6),
                    1.0 + (i % 2) as f64,
                    (i % 10) as f64 * 2.0,
                )
            })
            .collect();
        (sites, detections)
    }

    fn model() -> DetectionFunctionModel {
        let config = FitConfig::new("halfnorm", 40.0, SurveyGeometry::Line);
        DetectionFunctionModel::builder(config, vec![10.0])
            .build(&LikelihoodRegistry::with_builtins())
            .unwrap()
    }

    #[test]
    fn test_diagnostics_accounting() {
        let mut d = BootstrapDiagnostics {
            requested: 10,
            ..Default::default()
        };
        for outcome in [
            Replicate::Value(1.0),
            Replicate::NonConverged,
            Replicate::FitError,
            Replicate::FitError,
            Replicate::OutOfRange,
        ] {
            d.record(&outcome);
        }
        assert_eq!(d.non_converged, 1);
        assert_eq!(d.fit_errors, 2);
        assert_eq!(d.out_of_range, 1);
        assert_eq!(d.missing(), 4);
        assert_eq!(d.valid(), 6);
    }

    #[test]
    fn test_refit_with_same_model_is_reproducible() {
        let (sites, detections) = survey();
        let original = model();
        let fitter = fn_fitter(|_req: &distance_core::FitRequest<'_>| Ok(model()));

        let bootstrap = AbundanceBootstrap::default().with_resamples(25).with_seed(42);
        let a = bootstrap.run(&original, &detections, &sites, 1.0, &fitter).unwrap();
        let b = bootstrap.run(&original, &detections, &sites, 1.0, &fitter).unwrap();

        assert_eq!(a.bootstrap, b.bootstrap);
        assert_eq!(a.bootstrap.len(), 25);
        assert_eq!(a.diagnostics.missing(), 0);
        let interval = a.interval.unwrap();
        assert!(interval.lower <= interval.upper);
        assert!(interval.is_available());
    }

    #[test]
    fn test_fit_errors_are_counted() {
        let (sites, detections) = survey();
        let fitter = fn_fitter(
            |_req: &distance_core::FitRequest<'_>| -> Result<DetectionFunctionModel> {
                Err(Error::Fit("optimizer failed".to_string()))
            },
        );

        let result = AbundanceBootstrap::default()
            .with_resamples(8)
            .with_seed(1)
            .run(&model(), &detections, &sites, 1.0, &fitter)
            .unwrap();

        assert_eq!(result.diagnostics.fit_errors, 8);
        assert!(result.bootstrap.iter().all(Option::is_none));
        let interval = result.interval.unwrap();
        assert!(interval.lower.is_nan() && interval.upper.is_nan());
        assert!(result.estimate.is_finite() && result.estimate > 0.0);
    }

    #[test]
    fn test_wide_refits_are_out_of_range() {
        let (sites, detections) = survey();
        // A flat key over [0, 40] has an ESW of 40, doubled it exceeds w_hi
        let fitter = fn_fitter(|req: &distance_core::FitRequest<'_>| {
            DetectionFunctionModel::builder(req.config.clone(), vec![1.0e9])
                .build(&LikelihoodRegistry::with_builtins())
                .map(|m| WidenedModel { inner: m })
        });

        let result = AbundanceBootstrap::default()
            .with_resamples(5)
            .with_seed(9)
            .run(&model(), &detections, &sites, 1.0, &fitter)
            .unwrap();
        assert_eq!(result.diagnostics.out_of_range, 5);
    }

    /// Reports twice the width of the wrapped model
    struct WidenedModel {
        inner: DetectionFunctionModel,
    }

    impl DetectionFunction for WidenedModel {
        fn config(&self) -> &FitConfig {
            self.inner.config()
        }
        fn formula(&self) -> &CovariateFormula {
            self.inner.formula()
        }
        fn parameters(&self) -> &[f64] {
            self.inner.parameters()
        }
        fn converged(&self) -> bool {
            true
        }
        fn effective_strip_width(&self) -> Result<f64> {
            Ok(2.0 * self.inner.effective_strip_width()?)
        }
        fn effective_radius(&self) -> Result<f64> {
            Ok(2.0 * self.inner.effective_radius()?)
        }
        fn normalizing_constant(&self, distance: f64, row: &[f64]) -> Result<f64> {
            self.inner.normalizing_constant(distance, row)
        }
    }

    #[test]
    fn test_zero_resamples_rejected() {
        let (sites, detections) = survey();
        let fitter = fn_fitter(|_req: &distance_core::FitRequest<'_>| Ok(model()));
        let result = AbundanceBootstrap::default()
            .with_resamples(0)
            .run(&model(), &detections, &sites, 1.0, &fitter);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_batch_runs_on_rayon_pool() {
        let bootstrap = AbundanceBootstrap::default().with_resamples(32);
        let sequential = bootstrap.execute_batch(|i| (i, rayon::current_thread_index()));
        assert!(sequential.iter().all(|(_, worker)| worker.is_none()));

        let parallel = bootstrap
            .with_parallel(true)
            .execute_batch(|i| (i, rayon::current_thread_index()));
        assert!(parallel.iter().all(|(_, worker)| worker.is_some()));
        // Output order follows the iteration index
        assert!(parallel.iter().enumerate().all(|(i, (j, _))| i == *j));
    }

    #[test]
    fn test_replicates_estimate_on_repeated_sites() {
        // Two sites drawn with replacement repeat an id in almost every
        // replicate; those replicates must still produce values
        let sites = vec![SiteRecord::line("A", 100.0), SiteRecord::line("B", 100.0)];
        let detections: Vec<DetectionRecord> = (0..8)
            .map(|i| DetectionRecord::new(if i % 2 == 0 { "A" } else { "B" }, 1.0, i as f64))
            .collect();
        let fitter = fn_fitter(|_req: &distance_core::FitRequest<'_>| Ok(model()));

        let result = AbundanceBootstrap::default()
            .with_resamples(20)
            .with_seed(2)
            .run(&model(), &detections, &sites, 1.0, &fitter)
            .unwrap();
        assert_eq!(result.diagnostics.missing(), 0);
        assert_eq!(result.valid_replicates().len(), 20);
    }
}
