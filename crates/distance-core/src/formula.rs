//! Covariate formula for the detection function scale parameter
//!
//! A formula names the covariates entering the linear predictor of the scale
//! parameter. The design row of a detection is always `[1, x_1, ..., x_q]`;
//! an intercept-only formula has no covariates and yields `[1]`.

use crate::{DetectionRecord, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovariateFormula {
    covariates: Vec<String>,
}

impl CovariateFormula {
    /// `distance ~ 1`
    pub fn intercept_only() -> Self {
        Self::default()
    }

    /// `distance ~ 1 + name_1 + ... + name_q`
    pub fn with_covariates<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            covariates: names.into_iter().map(Into::into).collect(),
        }
    }

    /// True when the formula has terms beyond the intercept
    pub fn has_covariates(&self) -> bool {
        !self.covariates.is_empty()
    }

    pub fn covariate_names(&self) -> &[String] {
        &self.covariates
    }

    /// Number of design columns including the intercept
    pub fn n_columns(&self) -> usize {
        self.covariates.len() + 1
    }

    /// Design row `[1, x_1, ..., x_q]` for one detection
    pub fn design_row(&self, detection: &DetectionRecord, row: usize) -> Result<Vec<f64>> {
        let mut design = Vec::with_capacity(self.n_columns());
        design.push(1.0);
        for name in &self.covariates {
            let value = detection.covariates.get(name).copied().ok_or_else(|| {
                Error::invalid_value("covariates", row, format!("has no value for `{name}`"))
            })?;
            if !value.is_finite() {
                return Err(Error::invalid_value(
                    "covariates",
                    row,
                    format!("has a non-finite value for `{name}`"),
                ));
            }
            design.push(value);
        }
        Ok(design)
    }

    /// Column means of the design matrix built from `detections`
    ///
    /// Used as the reference row at which a covariate model reports a single
    /// effective width. Returns the intercept row for an empty slice.
    pub fn mean_row(&self, detections: &[DetectionRecord]) -> Result<Vec<f64>> {
        let mut sums = vec![0.0; self.n_columns()];
        sums[0] = 1.0;
        if detections.is_empty() || !self.has_covariates() {
            return Ok(sums);
        }

        for (row, det) in detections.iter().enumerate() {
            let design = self.design_row(det, row)?;
            for (acc, value) in sums.iter_mut().zip(design.iter()).skip(1) {
                *acc += value;
            }
        }
        let n = detections.len() as f64;
        for acc in sums.iter_mut().skip(1) {
            *acc /= n;
        }
        Ok(sums)
    }
}

impl fmt::Display for CovariateFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "distance ~ 1")?;
        for name in &self.covariates {
            write!(f, " + {name}")?;
        }
        Ok(())
    }
}
