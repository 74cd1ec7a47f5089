//! Detection-function likelihoods and the registry that resolves them by name
//!
//! A likelihood is a pair of capabilities: evaluating the detection function
//! (optionally normalized to a density) at a set of distances, and proposing
//! start values and box bounds for the optimizer that fits it. Likelihoods
//! are registered under a name once, at startup, and looked up by that name
//! everywhere else; an unregistered name is an [`Error::UnknownLikelihood`].

mod builtin;
mod expansion;

pub use builtin::{HalfNormal, HazardRate, NegativeExponential};
pub use expansion::ExpansionSeries;

use crate::{Error, Result, SurveyGeometry};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Arguments for a density evaluation
#[derive(Debug, Clone, Copy)]
pub struct DensityArgs<'a> {
    /// Key parameters followed by expansion coefficients
    pub parameters: &'a [f64],
    pub distances: &'a [f64],
    /// Design rows for the scale parameter: either a single row applied to
    /// every distance, or one row per distance. `None` means the first
    /// parameter is the scale itself.
    pub covariates: Option<&'a [Vec<f64>]>,
    pub geometry: SurveyGeometry,
    pub w_lo: f64,
    pub w_hi: f64,
    pub series: ExpansionSeries,
    pub expansions: usize,
    /// Normalize so the function integrates to one over `[w_lo, w_hi]`
    pub scale: bool,
}

impl<'a> DensityArgs<'a> {
    /// Design row that applies to distance `i`
    pub fn covariate_row(&self, i: usize) -> Option<&'a [f64]> {
        self.covariates.map(|rows| {
            if rows.len() == 1 {
                rows[0].as_slice()
            } else {
                rows[i].as_slice()
            }
        })
    }

    /// Number of linear-predictor coefficients for the scale parameter
    pub fn n_scale_coefficients(&self) -> usize {
        self.covariates
            .and_then(|rows| rows.first())
            .map(|row| row.len())
            .unwrap_or(1)
    }

    pub(crate) fn check_shape(&self, n_key: usize) -> Result<()> {
        if let Some(rows) = self.covariates {
            if rows.len() != 1 && rows.len() != self.distances.len() {
                return Err(Error::InvalidParameter(format!(
                    "expected 1 or {} covariate rows, got {}",
                    self.distances.len(),
                    rows.len()
                )));
            }
            let width = self.n_scale_coefficients();
            if rows.iter().any(|row| row.len() != width) {
                return Err(Error::InvalidParameter(
                    "covariate rows have differing widths".to_string(),
                ));
            }
        }
        self.series.validate(self.expansions)?;
        let expected = n_key + self.expansions;
        if self.parameters.len() != expected {
            return Err(Error::InvalidParameter(format!(
                "expected {expected} parameters ({n_key} key + {} expansion), got {}",
                self.expansions,
                self.parameters.len()
            )));
        }
        if !(self.w_lo >= 0.0 && self.w_lo < self.w_hi && self.w_hi.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "truncation bounds [{}, {}] are not a valid range",
                self.w_lo, self.w_hi
            )));
        }
        Ok(())
    }
}

/// Arguments for start-value generation
#[derive(Debug, Clone, Copy)]
pub struct StartArgs<'a> {
    pub distances: &'a [f64],
    /// Columns of the covariate design including the intercept
    pub design_columns: usize,
    pub expansions: usize,
    pub w_lo: f64,
    pub w_hi: f64,
}

/// Start values and box bounds for an optimizer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartValues {
    pub start: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub names: Vec<String>,
}

impl StartValues {
    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    /// Append `expansions` unbounded expansion coefficients starting at zero
    pub(crate) fn push_expansions(&mut self, expansions: usize) {
        for j in 1..=expansions {
            self.start.push(0.0);
            self.lower.push(f64::NEG_INFINITY);
            self.upper.push(f64::INFINITY);
            self.names.push(format!("a{j}"));
        }
    }
}

/// A detection-function likelihood
pub trait Likelihood: Send + Sync {
    /// Registry name
    fn name(&self) -> &str;

    /// Evaluate the detection function (or density when `args.scale`) at
    /// every distance in `args.distances`
    fn density(&self, args: &DensityArgs<'_>) -> Result<Vec<f64>>;

    /// Start values, bounds and parameter names for fitting
    fn start_values(&self, args: &StartArgs<'_>) -> Result<StartValues>;
}

/// Likelihood assembled from a pair of closures
pub struct FnLikelihood<D, S> {
    name: String,
    density_fn: D,
    start_fn: S,
}

impl<D, S> FnLikelihood<D, S>
where
    D: Fn(&DensityArgs<'_>) -> Result<Vec<f64>> + Send + Sync,
    S: Fn(&StartArgs<'_>) -> Result<StartValues> + Send + Sync,
{
    pub fn new(name: impl Into<String>, density_fn: D, start_fn: S) -> Self {
        Self {
            name: name.into(),
            density_fn,
            start_fn,
        }
    }
}

impl<D, S> Likelihood for FnLikelihood<D, S>
where
    D: Fn(&DensityArgs<'_>) -> Result<Vec<f64>> + Send + Sync,
    S: Fn(&StartArgs<'_>) -> Result<StartValues> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn density(&self, args: &DensityArgs<'_>) -> Result<Vec<f64>> {
        (self.density_fn)(args)
    }

    fn start_values(&self, args: &StartArgs<'_>) -> Result<StartValues> {
        (self.start_fn)(args)
    }
}

/// Name → likelihood mapping
#[derive(Clone, Default)]
pub struct LikelihoodRegistry {
    entries: HashMap<String, Arc<dyn Likelihood>>,
}

impl LikelihoodRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `halfnorm`, `hazrate` and `negexp`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HalfNormal));
        registry.register(Arc::new(HazardRate));
        registry.register(Arc::new(NegativeExponential));
        registry
    }

    /// Register a likelihood under its own name, returning any entry it replaced
    pub fn register(&mut self, likelihood: Arc<dyn Likelihood>) -> Option<Arc<dyn Likelihood>> {
        self.entries
            .insert(likelihood.name().to_string(), likelihood)
    }

    /// Register a likelihood from a density closure and a start-value closure
    pub fn register_fn<D, S>(
        &mut self,
        name: impl Into<String>,
        density_fn: D,
        start_fn: S,
    ) -> Option<Arc<dyn Likelihood>>
    where
        D: Fn(&DensityArgs<'_>) -> Result<Vec<f64>> + Send + Sync + 'static,
        S: Fn(&StartArgs<'_>) -> Result<StartValues> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnLikelihood::new(name, density_fn, start_fn)))
    }

    /// Resolve a likelihood by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Likelihood>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownLikelihood(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for LikelihoodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LikelihoodRegistry")
            .field("names", &self.names())
            .finish()
    }
}
