//! Numerical integration over the truncation range
//!
//! Adaptive Gauss-Legendre quadrature: a 64-node rule is applied to an
//! interval and to its two halves; the interval is accepted when the two
//! agree to a relative tolerance, otherwise each half is refined
//! recursively. Integrands are evaluated on whole node vectors so a
//! likelihood can be called once per panel.

use crate::likelihood::{DensityArgs, ExpansionSeries, Likelihood};
use crate::{Error, Result, SurveyGeometry};
use std::sync::OnceLock;

/// Nodes per panel
pub const QUADRATURE_ORDER: usize = 64;

/// Relative agreement required between a panel and its two halves
pub const RELATIVE_TOLERANCE: f64 = 1e-10;

/// Maximum number of bisections along any path
pub const MAX_DEPTH: usize = 12;

/// Gauss-Legendre nodes and weights on `[-1, 1]`
#[derive(Debug, Clone)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    /// Compute an `n`-point rule
    ///
    /// Roots of `P_n` are found by Newton iteration from the Chebyshev
    /// initial guess; weights come from `P'_n` at each root. Only half the
    /// roots are computed, the rest follow by symmetry.
    pub fn new(n: usize) -> Self {
        let mut nodes = vec![0.0f64; n];
        let mut weights = vec![0.0f64; n];

        if n == 0 {
            return Self { nodes, weights };
        }
        if n == 1 {
            weights[0] = 2.0;
            return Self { nodes, weights };
        }

        let nf = n as f64;
        let m = n.div_ceil(2);

        for i in 0..m {
            let mut x = ((std::f64::consts::PI * (i as f64 + 0.75)) / (nf + 0.5)).cos();
            let mut dp = 1.0;

            for _ in 0..100 {
                let (p_n, p_prev) = legendre_pair(n, x);
                dp = nf * (x * p_n - p_prev) / (x * x - 1.0);
                let dx = p_n / dp;
                x -= dx;
                if dx.abs() < 1e-15 {
                    let (p_n, p_prev) = legendre_pair(n, x);
                    dp = nf * (x * p_n - p_prev) / (x * x - 1.0);
                    break;
                }
            }

            let w = 2.0 / ((1.0 - x * x) * dp * dp);
            nodes[i] = -x;
            nodes[n - 1 - i] = x;
            weights[i] = w;
            weights[n - 1 - i] = w;
        }

        Self { nodes, weights }
    }

    /// Shared 64-point rule
    pub fn standard() -> &'static Self {
        static RULE: OnceLock<GaussLegendre> = OnceLock::new();
        RULE.get_or_init(|| Self::new(QUADRATURE_ORDER))
    }

    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    /// Apply the rule once on `[a, b]`
    pub fn panel<F>(&self, f: &F, a: f64, b: f64) -> Result<f64>
    where
        F: Fn(&[f64]) -> Result<Vec<f64>>,
    {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (a + b);
        let xs: Vec<f64> = self.nodes.iter().map(|&t| mid + half * t).collect();
        let ys = f(&xs)?;
        if ys.len() != xs.len() {
            return Err(Error::NumericIntegration(format!(
                "integrand returned {} values for {} nodes",
                ys.len(),
                xs.len()
            )));
        }
        let sum: f64 = ys.iter().zip(&self.weights).map(|(y, w)| y * w).sum();
        let value = sum * half;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::NumericIntegration(format!(
                "integrand is not finite on [{a}, {b}]"
            )))
        }
    }

    /// Adaptive integral of `f` over `[a, b]`
    pub fn integrate<F>(&self, f: F, a: f64, b: f64) -> Result<f64>
    where
        F: Fn(&[f64]) -> Result<Vec<f64>>,
    {
        if !(a.is_finite() && b.is_finite()) || b < a {
            return Err(Error::NumericIntegration(format!(
                "invalid integration range [{a}, {b}]"
            )));
        }
        if a == b {
            return Ok(0.0);
        }
        let whole = self.panel(&f, a, b)?;
        self.refine(&f, a, b, whole, MAX_DEPTH)
    }

    fn refine<F>(&self, f: &F, a: f64, b: f64, whole: f64, depth: usize) -> Result<f64>
    where
        F: Fn(&[f64]) -> Result<Vec<f64>>,
    {
        let mid = 0.5 * (a + b);
        let left = self.panel(f, a, mid)?;
        let right = self.panel(f, mid, b)?;
        let refined = left + right;

        let diff = (refined - whole).abs();
        if diff <= RELATIVE_TOLERANCE * refined.abs() || diff <= f64::EPSILON * (b - a) {
            return Ok(refined);
        }
        if depth == 0 {
            return Err(Error::NumericIntegration(format!(
                "quadrature did not converge on [{a}, {b}] (difference {diff:e})"
            )));
        }
        Ok(self.refine(f, a, mid, left, depth - 1)? + self.refine(f, mid, b, right, depth - 1)?)
    }
}

/// Evaluate `P_n(x)` and `P_{n-1}(x)` by the three-term recurrence
fn legendre_pair(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0f64;
    let mut p1 = x;
    for j in 2..=n {
        let jf = j as f64;
        let p2 = ((2.0 * jf - 1.0) * x * p1 - (jf - 1.0) * p0) / jf;
        p0 = p1;
        p1 = p2;
    }
    (p1, p0)
}

/// Adaptive integral of `f` over `[a, b]` with the standard rule
pub fn integrate<F>(f: F, a: f64, b: f64) -> Result<f64>
where
    F: Fn(&[f64]) -> Result<Vec<f64>>,
{
    GaussLegendre::standard().integrate(f, a, b)
}

/// Fixed part of a normalizing-constant computation
#[derive(Clone, Copy)]
pub struct NormalizingSpec<'a> {
    pub likelihood: &'a dyn Likelihood,
    pub parameters: &'a [f64],
    pub w_lo: f64,
    pub w_hi: f64,
    pub expansions: usize,
    pub series: ExpansionSeries,
    pub geometry: SurveyGeometry,
}

/// Area under the unscaled detection function over `[w_lo, w_hi]` for one
/// design row (`x·g(x)` for point surveys)
///
/// `distance` is the observation the constant is computed for; it is only
/// used to label failures. An empty `covariate_row` means the first
/// parameter is the scale itself.
pub fn normalizing_constant(
    spec: &NormalizingSpec<'_>,
    distance: f64,
    covariate_row: &[f64],
) -> Result<f64> {
    let rows = (!covariate_row.is_empty()).then(|| vec![covariate_row.to_vec()]);
    let point = spec.geometry.is_point();

    let value = integrate(
        |xs: &[f64]| {
            let mut ys = spec.likelihood.density(&DensityArgs {
                parameters: spec.parameters,
                distances: xs,
                covariates: rows.as_deref(),
                geometry: spec.geometry,
                w_lo: spec.w_lo,
                w_hi: spec.w_hi,
                series: spec.series,
                expansions: spec.expansions,
                scale: false,
            })?;
            if point {
                for (y, &x) in ys.iter_mut().zip(xs) {
                    *y *= x;
                }
            }
            Ok(ys)
        },
        spec.w_lo,
        spec.w_hi,
    )
    .map_err(|e| match e {
        Error::NumericIntegration(msg) => Error::NumericIntegration(format!(
            "{} at distance {distance}: {msg}",
            spec.likelihood.name()
        )),
        other => other,
    })?;

    if value > 0.0 {
        Ok(value)
    } else {
        Err(Error::NumericIntegration(format!(
            "{} normalizing constant at distance {distance} is not positive ({value})",
            spec.likelihood.name()
        )))
    }
}
