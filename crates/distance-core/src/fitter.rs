//! Contract with the external detection-function estimator
//!
//! The bootstrap never fits a detection function itself. It hands a
//! [`FitRequest`] describing the resampled data and the original fit
//! configuration to a [`DetectionFunctionFitter`] and reads back whatever
//! model the fitter produces.

use crate::formula::CovariateFormula;
use crate::model::{DetectionFunction, FitConfig};
use crate::{DetectionRecord, Result};

/// Inputs for one fit
#[derive(Debug, Clone, Copy)]
pub struct FitRequest<'a> {
    pub formula: &'a CovariateFormula,
    pub detections: &'a [DetectionRecord],
    pub config: &'a FitConfig,
}

impl<'a> FitRequest<'a> {
    pub fn new(
        formula: &'a CovariateFormula,
        detections: &'a [DetectionRecord],
        config: &'a FitConfig,
    ) -> Self {
        Self {
            formula,
            detections,
            config,
        }
    }

    /// Distances inside the truncation window
    pub fn truncated_distances(&self) -> Vec<f64> {
        self.detections
            .iter()
            .filter(|d| d.within(self.config.w_lo, self.config.w_hi))
            .map(|d| d.distance)
            .collect()
    }
}

/// Maximum-likelihood fitter for detection functions
///
/// Implementations must be shareable across threads: the bootstrap may call
/// `fit` from several workers at once.
pub trait DetectionFunctionFitter: Send + Sync {
    type Model: DetectionFunction;

    fn fit(&self, request: &FitRequest<'_>) -> Result<Self::Model>;
}

/// Fitter that wraps a closure
#[derive(Clone)]
pub struct FnFitter<F> {
    fit_fn: F,
}

impl<F> FnFitter<F> {
    pub fn new(fit_fn: F) -> Self {
        Self { fit_fn }
    }
}

impl<F, M> DetectionFunctionFitter for FnFitter<F>
where
    F: Fn(&FitRequest<'_>) -> Result<M> + Send + Sync,
    M: DetectionFunction,
{
    type Model = M;

    fn fit(&self, request: &FitRequest<'_>) -> Result<M> {
        (self.fit_fn)(request)
    }
}

/// Create a fitter from a closure
pub fn fn_fitter<F, M>(fit_fn: F) -> FnFitter<F>
where
    F: Fn(&FitRequest<'_>) -> Result<M> + Send + Sync,
    M: DetectionFunction,
{
    FnFitter::new(fit_fn)
}
