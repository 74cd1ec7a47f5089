//! Distance-sampling abundance estimation
//!
//! Umbrella crate over the workspace:
//!
//! - [`distance_core`]: survey data model, likelihood registry, quadrature
//!   and the detection-function contracts
//! - [`distance_abundance`]: closed-form and covariate-general abundance
//!   estimators
//! - [`distance_confidence`]: site bootstrap with bias-corrected percentile
//!   intervals
//!
//! # Example
//!
//! ```rust
//! use distance_stats::prelude::*;
//!
//! let registry = LikelihoodRegistry::with_builtins();
//! let model = DetectionFunctionModel::builder(
//!     FitConfig::new("halfnorm", 25.0, SurveyGeometry::Line),
//!     vec![8.0],
//! )
//! .build(&registry)
//! .unwrap();
//!
//! let sites = vec![SiteRecord::line("north", 1200.0), SiteRecord::line("south", 800.0)];
//! let detections = vec![
//!     DetectionRecord::new("north", 3.0, 1.2),
//!     DetectionRecord::new("north", 1.0, 6.0),
//!     DetectionRecord::new("south", 2.0, 9.4),
//! ];
//!
//! let fitter = fn_fitter(|request: &FitRequest<'_>| {
//!     DetectionFunctionModel::builder(request.config.clone(), vec![8.0]).build(&registry)
//! });
//!
//! let options = AbundanceOptions::default().with_confidence_level(None);
//! let result = estimate_abundance(&model, &detections, &sites, &fitter, &options).unwrap();
//! assert_eq!(result.n_detections, 3);
//! ```

pub use distance_abundance;
pub use distance_confidence;
pub use distance_core;

pub use distance_abundance::{estimate, per_unit_estimates, SampleEstimate, SurveyEffort};
pub use distance_confidence::{
    estimate_abundance, AbundanceBootstrap, AbundanceEstimate, AbundanceOptions,
    BootstrapDiagnostics, ConfidenceInterval, ConfidenceLevel,
};
pub use distance_core::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use distance_abundance::{estimate, per_unit_estimates, SampleEstimate};
    pub use distance_confidence::{
        estimate_abundance, AbundanceBootstrap, AbundanceEstimate, AbundanceOptions,
        ConfidenceInterval,
    };
    pub use distance_core::prelude::*;
    pub use distance_core::fn_fitter;
}
