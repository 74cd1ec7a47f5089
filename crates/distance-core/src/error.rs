//! Error types for distance-sampling analysis
//!
//! Provides a unified error type for all distance-stats crates.

use thiserror::Error;

/// Core error type for distance-sampling operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required field has no usable value
    #[error("Missing value: field `{field}` is missing in row {row}")]
    MissingValue { field: &'static str, row: usize },

    /// A field is present but violates its contract (sign, range, ...)
    #[error("Invalid value: field `{field}` in row {row} {reason}")]
    InvalidValue {
        field: &'static str,
        row: usize,
        reason: String,
    },

    /// A detection references a site that is not part of the survey
    #[error("Unknown site: detection row {row} references site `{site_id}` not in the site table")]
    UnknownSite { site_id: String, row: usize },

    /// The site table lists the same site more than once
    #[error("Duplicate site: `{site_id}` appears more than once in the site table")]
    DuplicateSite { site_id: String },

    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Likelihood name not present in the registry
    #[error("Unknown likelihood: `{0}` is not registered")]
    UnknownLikelihood(String),

    /// Quadrature failed to converge or produced a non-positive area
    #[error("Numeric integration error: {0}")]
    NumericIntegration(String),

    /// Detection function fit failed
    #[error("Fit error: {0}")]
    Fit(String),

    /// Numerical computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Other errors, typically raised by an external collaborator
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for a missing field
    pub fn missing_value(field: &'static str, row: usize) -> Self {
        Self::MissingValue { field, row }
    }

    /// Create an error for a field that is present but invalid
    pub fn invalid_value(field: &'static str, row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            row,
            reason: reason.into(),
        }
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::Computation(format!("{context} contains NaN or infinite values"))
    }

    /// Whether this error is an input-contract violation
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingValue { .. }
                | Self::InvalidValue { .. }
                | Self::UnknownSite { .. }
                | Self::DuplicateSite { .. }
        )
    }
}
