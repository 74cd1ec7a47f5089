//! Built-in key functions: half-normal, hazard-rate and negative exponential
//!
//! All three share the same parameter layout:
//! `[scale coefficients.., shape parameters.., expansion coefficients..]`.
//! Without covariate rows there is exactly one scale coefficient and it is
//! the scale itself. With covariate rows the scale is `exp(row · β)`.

use super::{DensityArgs, Likelihood, StartArgs, StartValues};
use crate::integration::integrate;
use crate::math::mean;
use crate::{Error, Result};
use std::collections::HashMap;

/// `g(x) = exp(-x² / 2σ²)`
#[derive(Debug, Clone, Copy, Default)]
pub struct HalfNormal;

/// `g(x) = 1 - exp(-(x/σ)^(-k))`
#[derive(Debug, Clone, Copy, Default)]
pub struct HazardRate;

/// `g(x) = exp(-βx)`
#[derive(Debug, Clone, Copy, Default)]
pub struct NegativeExponential;

impl Likelihood for HalfNormal {
    fn name(&self) -> &str {
        "halfnorm"
    }

    fn density(&self, args: &DensityArgs<'_>) -> Result<Vec<f64>> {
        evaluate(args, 0, |x, sigma, _| (-(x * x) / (2.0 * sigma * sigma)).exp())
    }

    fn start_values(&self, args: &StartArgs<'_>) -> Result<StartValues> {
        let sigma = root_mean_square(args.distances).unwrap_or(args.w_hi / 2.0);
        let mut values = scale_start(sigma, args.design_columns, "sigma");
        values.push_expansions(args.expansions);
        Ok(values)
    }
}

impl Likelihood for HazardRate {
    fn name(&self) -> &str {
        "hazrate"
    }

    fn density(&self, args: &DensityArgs<'_>) -> Result<Vec<f64>> {
        evaluate(args, 1, |x, sigma, shape| {
            let k = shape[0];
            1.0 - (-(x / sigma).powf(-k)).exp()
        })
    }

    fn start_values(&self, args: &StartArgs<'_>) -> Result<StartValues> {
        let mut values = scale_start(0.2 * args.w_hi, args.design_columns, "sigma");
        values.start.push(1.5);
        values.lower.push(0.01);
        values.upper.push(100.0);
        values.names.push("k".to_string());
        values.push_expansions(args.expansions);
        Ok(values)
    }
}

impl Likelihood for NegativeExponential {
    fn name(&self) -> &str {
        "negexp"
    }

    fn density(&self, args: &DensityArgs<'_>) -> Result<Vec<f64>> {
        evaluate(args, 0, |x, beta, _| (-beta * x).exp())
    }

    fn start_values(&self, args: &StartArgs<'_>) -> Result<StartValues> {
        let mean = mean(args.distances);
        let beta = if mean > 0.0 { 1.0 / mean } else { 1.0 / args.w_hi };
        let mut values = scale_start(beta, args.design_columns, "beta");
        values.push_expansions(args.expansions);
        Ok(values)
    }
}

fn root_mean_square(distances: &[f64]) -> Option<f64> {
    if distances.is_empty() {
        return None;
    }
    let rms = (distances.iter().map(|d| d * d).sum::<f64>() / distances.len() as f64).sqrt();
    (rms > 0.0).then_some(rms)
}

/// Start values for the scale coefficients
fn scale_start(scale: f64, design_columns: usize, name: &str) -> StartValues {
    if design_columns > 1 {
        let mut start = vec![0.0; design_columns];
        start[0] = scale.ln();
        StartValues {
            start,
            lower: vec![f64::NEG_INFINITY; design_columns],
            upper: vec![f64::INFINITY; design_columns],
            names: (0..design_columns).map(|i| format!("b{i}")).collect(),
        }
    } else {
        StartValues {
            start: vec![scale],
            lower: vec![0.0],
            upper: vec![f64::INFINITY],
            names: vec![name.to_string()],
        }
    }
}

/// Shared evaluation for keys of the form `key(x, scale, shape)`
fn evaluate<K>(args: &DensityArgs<'_>, n_shape: usize, key: K) -> Result<Vec<f64>>
where
    K: Fn(f64, f64, &[f64]) -> f64,
{
    let q = args.n_scale_coefficients();
    args.check_shape(q + n_shape)?;

    let (scale_coef, rest) = args.parameters.split_at(q);
    let (shape, expansion) = rest.split_at(n_shape);

    let scale_for = |row: Option<&[f64]>| -> Result<f64> {
        let scale = match row {
            Some(row) => row
                .iter()
                .zip(scale_coef)
                .map(|(x, b)| x * b)
                .sum::<f64>()
                .exp(),
            None => scale_coef[0],
        };
        if scale > 0.0 && scale.is_finite() {
            Ok(scale)
        } else {
            Err(Error::InvalidParameter(format!(
                "scale parameter must be positive and finite, got {scale}"
            )))
        }
    };

    let key_at = |x: f64, scale: f64| -> f64 {
        key(x, scale, shape) * args.series.adjustment(x / args.w_hi, expansion)
    };

    let mut values = Vec::with_capacity(args.distances.len());
    for (i, &x) in args.distances.iter().enumerate() {
        let scale = scale_for(args.covariate_row(i))?;
        values.push(key_at(x, scale));
    }

    if !args.scale {
        return Ok(values);
    }

    // Normalize per distinct design row
    let point = args.geometry.is_point();
    let mut areas: HashMap<Vec<u64>, f64> = HashMap::new();
    for (i, (value, &x)) in values.iter_mut().zip(args.distances).enumerate() {
        let row = args.covariate_row(i);
        let row_key: Vec<u64> = row
            .map(|r| r.iter().map(|v| v.to_bits()).collect())
            .unwrap_or_default();
        let area = match areas.get(&row_key) {
            Some(&area) => area,
            None => {
                let scale = scale_for(row)?;
                let area = integrate(
                    |xs: &[f64]| {
                        Ok(xs
                            .iter()
                            .map(|&t| {
                                let g = key_at(t, scale);
                                if point {
                                    t * g
                                } else {
                                    g
                                }
                            })
                            .collect())
                    },
                    args.w_lo,
                    args.w_hi,
                )?;
                if !(area > 0.0 && area.is_finite()) {
                    return Err(Error::NumericIntegration(format!(
                        "{} density has non-positive area {area} over [{}, {}]",
                        if point { "point" } else { "line" },
                        args.w_lo,
                        args.w_hi
                    )));
                }
                areas.insert(row_key, area);
                area
            }
        };
        if point {
            *value *= x;
        }
        *value /= area;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::likelihood::ExpansionSeries;
    use crate::SurveyGeometry;
    use approx::assert_relative_eq;

    fn args<'a>(parameters: &'a [f64], distances: &'a [f64], scale: bool) -> DensityArgs<'a> {
        DensityArgs {
            parameters,
            distances,
            covariates: None,
            geometry: SurveyGeometry::Line,
            w_lo: 0.0,
            w_hi: 100.0,
            series: ExpansionSeries::Cosine,
            expansions: 0,
            scale,
        }
    }

    #[test]
    fn test_halfnormal_key() {
        let values = HalfNormal.density(&args(&[10.0], &[0.0, 10.0, 20.0], false)).unwrap();
        assert_relative_eq!(values[0], 1.0);
        assert_relative_eq!(values[1], (-0.5f64).exp(), epsilon = 1e-15);
        assert_relative_eq!(values[2], (-2.0f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_halfnormal_scaled_density() {
        // sigma = 10 on [0, 100]: area = sigma * sqrt(pi / 2) to many digits
        let values = HalfNormal.density(&args(&[10.0], &[0.0], true)).unwrap();
        let area = 10.0 * (std::f64::consts::PI / 2.0).sqrt();
        assert_relative_eq!(values[0], 1.0 / area, epsilon = 1e-10);
    }

    #[test]
    fn test_covariate_log_link() {
        let rows = vec![vec![1.0, 2.0]];
        let mut a = args(&[1.0, 0.5], &[5.0], false);
        a.covariates = Some(&rows);
        let values = HalfNormal.density(&a).unwrap();
        let sigma = (1.0f64 + 2.0 * 0.5).exp();
        assert_relative_eq!(values[0], (-25.0 / (2.0 * sigma * sigma)).exp(), epsilon = 1e-14);
    }

    #[test]
    fn test_hazard_rate_key() {
        let values = HazardRate.density(&args(&[10.0, 2.0], &[0.0, 10.0], false)).unwrap();
        assert_eq!(values[0], 1.0);
        assert_relative_eq!(values[1], 1.0 - (-1.0f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_negexp_key() {
        let values = NegativeExponential
            .density(&args(&[0.1], &[0.0, 10.0], false))
            .unwrap();
        assert_eq!(values[0], 1.0);
        assert_relative_eq!(values[1], (-1.0f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_parameter_count_checked() {
        assert!(HalfNormal.density(&args(&[10.0, 1.0], &[0.0], false)).is_err());
        assert!(HazardRate.density(&args(&[10.0], &[0.0], false)).is_err());
        assert!(HalfNormal.density(&args(&[-1.0], &[0.0], false)).is_err());
    }

    #[test]
    fn test_start_values_layout() {
        let distances = [3.0, 4.0];
        let start = HalfNormal
            .start_values(&StartArgs {
                distances: &distances,
                design_columns: 1,
                expansions: 2,
                w_lo: 0.0,
                w_hi: 10.0,
            })
            .unwrap();
        assert_eq!(start.names, vec!["sigma", "a1", "a2"]);
        assert_relative_eq!(start.start[0], 12.5f64.sqrt(), epsilon = 1e-15);

        let start = HazardRate
            .start_values(&StartArgs {
                distances: &distances,
                design_columns: 2,
                expansions: 0,
                w_lo: 0.0,
                w_hi: 10.0,
            })
            .unwrap();
        assert_eq!(start.names, vec!["b0", "b1", "k"]);
        assert_relative_eq!(start.start[0], 2.0f64.ln(), epsilon = 1e-15);
    }
}
