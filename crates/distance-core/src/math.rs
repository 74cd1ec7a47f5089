//! Mathematical utilities shared by the estimator and the bootstrap
//!
//! Standard normal CDF/quantile for the bias-corrected interval and the
//! empirical quantile used to read the interval off the bootstrap
//! distribution.

/// Distribution-related mathematical functions
pub mod distributions {
    /// Standard normal distribution utilities
    pub mod normal {
        use statrs::function::erf::{erfc, erfc_inv};
        use std::f64::consts::SQRT_2;

        /// CDF of the standard normal distribution, `Φ(x)`
        ///
        /// Defined on the extended real line: `Φ(-∞) = 0`, `Φ(+∞) = 1`.
        pub fn cdf(x: f64) -> f64 {
            if x == f64::INFINITY {
                return 1.0;
            }
            if x == f64::NEG_INFINITY {
                return 0.0;
            }
            0.5 * erfc(-x / SQRT_2)
        }

        /// Quantile function of the standard normal distribution, `Φ⁻¹(p)`
        ///
        /// Returns `-∞` for `p <= 0` and `+∞` for `p >= 1`.
        pub fn quantile(p: f64) -> f64 {
            if p <= 0.0 {
                return f64::NEG_INFINITY;
            }
            if p >= 1.0 {
                return f64::INFINITY;
            }
            -SQRT_2 * erfc_inv(2.0 * p)
        }
    }
}

/// Empirical quantile of sorted data (linear interpolation between order
/// statistics, the "type 7" definition)
///
/// `p` is clamped to `[0, 1]`. Returns NaN for empty input.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() || p.is_nan() {
        return f64::NAN;
    }
    let p = p.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + frac * (sorted[hi] - sorted[lo])
    }
}

/// Arithmetic mean; NaN for empty input
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::distributions::normal;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_cdf() {
        assert_relative_eq!(normal::cdf(0.0), 0.5, epsilon = 1e-15);
        assert_relative_eq!(normal::cdf(1.959963984540054), 0.975, epsilon = 1e-12);
        assert_eq!(normal::cdf(f64::INFINITY), 1.0);
        assert_eq!(normal::cdf(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_normal_quantile() {
        assert_relative_eq!(normal::quantile(0.5), 0.0, epsilon = 1e-12);
        assert_relative_eq!(normal::quantile(0.975), 1.959963984540054, epsilon = 1e-9);
        assert_relative_eq!(normal::quantile(0.025), -1.959963984540054, epsilon = 1e-9);
        assert_eq!(normal::quantile(0.0), f64::NEG_INFINITY);
        assert_eq!(normal::quantile(1.0), f64::INFINITY);
    }

    #[test]
    fn test_quantile_roundtrip() {
        for &p in &[0.01, 0.1, 0.3, 0.77, 0.99] {
            assert_relative_eq!(normal::cdf(normal::quantile(p)), p, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_quantile_sorted() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&data, 0.0), 1.0);
        assert_eq!(quantile_sorted(&data, 1.0), 5.0);
        assert_eq!(quantile_sorted(&data, 0.5), 3.0);
        assert_relative_eq!(quantile_sorted(&data, 0.1), 1.4, epsilon = 1e-12);
        assert_eq!(quantile_sorted(&[7.0], 0.3), 7.0);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[2.0, 4.0]), 3.0);
        assert!(mean(&[]).is_nan());
    }

    proptest::proptest! {
        #[test]
        fn prop_quantile_within_data_and_monotone(
            mut data in proptest::collection::vec(-1.0e6f64..1.0e6, 1..200),
            p in 0.0f64..=1.0,
            q in 0.0f64..=1.0,
        ) {
            data.sort_by(|a, b| a.total_cmp(b));
            let (lo, hi) = if p <= q { (p, q) } else { (q, p) };
            let a = quantile_sorted(&data, lo);
            let b = quantile_sorted(&data, hi);
            // one-ulp slack for the interpolation
            let slack = 1e-6;
            proptest::prop_assert!(a >= data[0] - slack && b <= data[data.len() - 1] + slack);
            proptest::prop_assert!(a <= b + slack);
        }
    }
}
