//! Series expansions that adjust the shape of a key detection function
//!
//! An expansion multiplies the key function by `1 + Σ a_j h_j(u)` where
//! `u = x / w_hi` and `a_j` are the expansion coefficients that follow the
//! key parameters in the parameter vector.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionSeries {
    /// `cos(2πu), cos(3πu), ...`
    #[default]
    Cosine,
    /// Even Hermite polynomials `H_4, H_6, H_8, H_10`
    Hermite,
    /// Even powers `u^4, u^6, u^8, u^10`
    Simple,
}

impl ExpansionSeries {
    /// Largest number of terms the series supports
    pub fn max_terms(&self) -> Option<usize> {
        match self {
            Self::Cosine => None,
            Self::Hermite | Self::Simple => Some(4),
        }
    }

    /// Check that `expansions` terms are available
    pub fn validate(&self, expansions: usize) -> Result<()> {
        match self.max_terms() {
            Some(max) if expansions > max => Err(Error::InvalidParameter(format!(
                "{self} series supports at most {max} expansion terms, got {expansions}"
            ))),
            _ => Ok(()),
        }
    }

    /// Value of the `j`-th term (1-based) at scaled distance `u`
    pub fn term(&self, j: usize, u: f64) -> f64 {
        match self {
            Self::Cosine => ((j + 1) as f64 * std::f64::consts::PI * u).cos(),
            Self::Hermite => {
                let u2 = u * u;
                match j {
                    1 => u2 * u2 - 6.0 * u2 + 3.0,
                    2 => u2.powi(3) - 15.0 * u2 * u2 + 45.0 * u2 - 15.0,
                    3 => u2.powi(4) - 28.0 * u2.powi(3) + 210.0 * u2 * u2 - 420.0 * u2 + 105.0,
                    _ => {
                        u2.powi(5) - 45.0 * u2.powi(4) + 630.0 * u2.powi(3) - 3150.0 * u2 * u2
                            + 4725.0 * u2
                            - 945.0
                    }
                }
            }
            Self::Simple => u.powi(2 * (j as i32 + 1)),
        }
    }

    /// Multiplicative adjustment `1 + Σ a_j h_j(u)`
    pub fn adjustment(&self, u: f64, coefficients: &[f64]) -> f64 {
        coefficients
            .iter()
            .enumerate()
            .fold(1.0, |acc, (i, &a)| acc + a * self.term(i + 1, u))
    }
}

impl fmt::Display for ExpansionSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cosine => "cosine",
            Self::Hermite => "hermite",
            Self::Simple => "simple",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ExpansionSeries {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "hermite" => Ok(Self::Hermite),
            "simple" => Ok(Self::Simple),
            other => Err(Error::InvalidParameter(format!(
                "unknown expansion series `{other}`"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_coefficients_is_identity() {
        for series in [ExpansionSeries::Cosine, ExpansionSeries::Hermite, ExpansionSeries::Simple] {
            assert_eq!(series.adjustment(0.37, &[]), 1.0);
        }
    }

    #[test]
    fn test_hermite_values_at_zero() {
        let s = ExpansionSeries::Hermite;
        assert_eq!(s.term(1, 0.0), 3.0);
        assert_eq!(s.term(2, 0.0), -15.0);
        assert_eq!(s.term(3, 0.0), 105.0);
        assert_eq!(s.term(4, 0.0), -945.0);
    }

    #[test]
    fn test_cosine_and_simple_terms() {
        assert_relative_eq!(ExpansionSeries::Cosine.term(1, 0.5), -1.0, epsilon = 1e-12);
        assert_relative_eq!(ExpansionSeries::Simple.term(1, 0.5), 0.0625, epsilon = 1e-15);
        assert_relative_eq!(
            ExpansionSeries::Simple.adjustment(0.5, &[2.0]),
            1.125,
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_term_limits() {
        assert!(ExpansionSeries::Cosine.validate(10).is_ok());
        assert!(ExpansionSeries::Hermite.validate(4).is_ok());
        assert!(ExpansionSeries::Simple.validate(5).is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!("Cosine".parse::<ExpansionSeries>().unwrap(), ExpansionSeries::Cosine);
        assert_eq!("hermite".parse::<ExpansionSeries>().unwrap(), ExpansionSeries::Hermite);
        assert!("legendre".parse::<ExpansionSeries>().is_err());
    }
}
