//! Bootstrap interval methods
//!
//! [`BiasCorrectedPercentile`] shifts the percentile interval by the median
//! bias of the bootstrap distribution relative to the point estimate:
//!
//! ```text
//! p      = (#{θ* > θ̂} + ½ · #{θ* = θ̂}) / R
//! z0     = Φ⁻¹(1 − p)
//! zα     = Φ⁻¹(1 − (1 − level) / 2)
//! p_low  = Φ(2·z0 − zα)
//! p_high = Φ(2·z0 + zα)
//! ```
//!
//! The bounds are the type-7 empirical quantiles of the replicates at
//! `p_low` and `p_high`. There is no acceleration term.

use crate::{ConfidenceInterval, ConfidenceLevel};
use distance_core::math::distributions::normal;
use distance_core::math::quantile_sorted;
use distance_core::Result;
use tracing::{debug, instrument};

/// Method for turning a bootstrap distribution into an interval
pub trait BootstrapMethod: Send + Sync {
    /// Interval from the usable replicates
    ///
    /// An empty replicate set yields NaN bounds, not an error.
    fn calculate_interval(
        &self,
        bootstrap_estimates: &[f64],
        original_estimate: f64,
        confidence_level: ConfidenceLevel,
    ) -> Result<ConfidenceInterval>;

    fn name(&self) -> &'static str;
}

/// Bias-correction terms of one bootstrap distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasCorrection {
    /// Share of replicates above the point estimate, ties counted as half
    pub p: f64,
    pub z0: f64,
    /// Adjusted lower percentile
    pub p_low: f64,
    /// Adjusted upper percentile
    pub p_high: f64,
}

/// Bias-correction terms, or `None` when there are no replicates
pub fn bias_correction(
    bootstrap_estimates: &[f64],
    original_estimate: f64,
    confidence_level: ConfidenceLevel,
) -> Option<BiasCorrection> {
    if bootstrap_estimates.is_empty() {
        return None;
    }

    // Ties count one half; without ties this is the strictly-greater share
    let above = bootstrap_estimates
        .iter()
        .filter(|&&v| v > original_estimate)
        .count();
    let ties = bootstrap_estimates.iter().filter(|&&v| v == original_estimate).count();
    let p = (above as f64 + 0.5 * ties as f64) / bootstrap_estimates.len() as f64;

    let z0 = normal::quantile(1.0 - p);
    let z_alpha = normal::quantile(1.0 - confidence_level.tail_probability());

    Some(BiasCorrection {
        p,
        z0,
        p_low: normal::cdf(2.0 * z0 - z_alpha),
        p_high: normal::cdf(2.0 * z0 + z_alpha),
    })
}

/// Bias-corrected percentile interval
#[derive(Debug, Clone, Copy, Default)]
pub struct BiasCorrectedPercentile;

impl BootstrapMethod for BiasCorrectedPercentile {
    #[instrument(skip(self, bootstrap_estimates), fields(n_estimates = bootstrap_estimates.len()))]
    fn calculate_interval(
        &self,
        bootstrap_estimates: &[f64],
        original_estimate: f64,
        confidence_level: ConfidenceLevel,
    ) -> Result<ConfidenceInterval> {
        let Some(bc) =
            bias_correction(bootstrap_estimates, original_estimate, confidence_level)
        else {
            return Ok(ConfidenceInterval::unavailable(
                original_estimate,
                confidence_level.value(),
            ));
        };
        debug!(p = bc.p, z0 = bc.z0, p_low = bc.p_low, p_high = bc.p_high, "bias correction");

        let mut sorted = bootstrap_estimates.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Ok(ConfidenceInterval::new(
            quantile_sorted(&sorted, bc.p_low),
            quantile_sorted(&sorted, bc.p_high),
            original_estimate,
            confidence_level.value(),
        ))
    }

    fn name(&self) -> &'static str {
        "Bias-Corrected Percentile"
    }
}
