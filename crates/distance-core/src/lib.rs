//! Core types and numerics for distance-sampling abundance estimation
//!
//! This crate provides the pieces shared by the estimator and the bootstrap:
//!
//! - **Data model**: detections, sites, survey geometry
//! - **Likelihood registry**: detection-function likelihoods resolved by name
//! - **Integration**: adaptive Gauss-Legendre quadrature and the per-row
//!   normalizing constant used by the covariate-general estimator
//! - **Models**: the [`DetectionFunction`] view of a fitted model and the
//!   [`DetectionFunctionFitter`] contract with the external estimator
//! - **Validation**: input-contract checks that run before any computation
//!
//! # Example
//!
//! ```rust
//! use distance_core::{
//!     DetectionFunction, DetectionFunctionModel, FitConfig, LikelihoodRegistry, SurveyGeometry,
//! };
//!
//! let registry = LikelihoodRegistry::with_builtins();
//! let model = DetectionFunctionModel::builder(
//!     FitConfig::new("halfnorm", 100.0, SurveyGeometry::Line),
//!     vec![20.0],
//! )
//! .build(&registry)
//! .unwrap();
//!
//! let esw = model.effective_strip_width().unwrap();
//! assert!((esw - 20.0 * (std::f64::consts::PI / 2.0).sqrt()).abs() < 1e-8);
//! ```

pub mod error;
pub mod fitter;
pub mod formula;
pub mod integration;
pub mod likelihood;
pub mod math;
pub mod model;
pub mod types;
pub mod validation;

// Re-export core types
pub use error::{Error, Result};

pub use fitter::{fn_fitter, DetectionFunctionFitter, FitRequest, FnFitter};
pub use formula::CovariateFormula;
pub use integration::{integrate, normalizing_constant, GaussLegendre, NormalizingSpec};
pub use likelihood::{
    DensityArgs, ExpansionSeries, FnLikelihood, HalfNormal, HazardRate, Likelihood,
    LikelihoodRegistry, NegativeExponential, StartArgs, StartValues,
};
pub use model::{
    DetectionFunction, DetectionFunctionModel, DetectionFunctionModelBuilder, FitConfig, GxScale,
    ScalingReference,
};
pub use types::{DetectionRecord, DoubleObserverRecord, SiteRecord, SurveyGeometry};
pub use validation::validate_survey;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CovariateFormula, DetectionFunction, DetectionFunctionFitter, DetectionFunctionModel,
        DetectionRecord, Error, ExpansionSeries, FitConfig, FitRequest, LikelihoodRegistry,
        Result, SiteRecord, SurveyGeometry,
    };
}
