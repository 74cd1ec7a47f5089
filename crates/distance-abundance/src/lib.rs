//! Abundance estimators for distance-sampling surveys
//!
//! Given a fitted detection function, this crate turns a set of detections
//! and the sites they were recorded at into an abundance or density value:
//!
//! - [`estimate`]: one value for the whole survey, closed form when the
//!   detection function has no covariates, Horvitz-Thompson otherwise
//! - [`per_unit_estimates`]: one value per site
//!
//! # Example
//!
//! ```rust
//! use distance_abundance::estimate;
//! use distance_core::{
//!     DetectionFunctionModel, DetectionRecord, FitConfig, LikelihoodRegistry, SiteRecord,
//!     SurveyGeometry,
//! };
//!
//! let model = DetectionFunctionModel::builder(
//!     FitConfig::new("halfnorm", 40.0, SurveyGeometry::Line),
//!     vec![12.0],
//! )
//! .build(&LikelihoodRegistry::with_builtins())
//! .unwrap();
//!
//! let sites = vec![SiteRecord::line("T1", 500.0), SiteRecord::line("T2", 500.0)];
//! let detections = vec![
//!     DetectionRecord::new("T1", 1.0, 4.0),
//!     DetectionRecord::new("T1", 3.0, 11.5),
//!     DetectionRecord::new("T2", 2.0, 0.0),
//! ];
//!
//! let result = estimate(&model, &detections, &sites, 1.0e6).unwrap();
//! assert_eq!(result.n_detections, 3);
//! assert!(result.estimate > 0.0);
//! ```

pub mod estimator;
pub mod per_unit;

pub use estimator::{estimate, estimate_unchecked, truncate, SampleEstimate, SurveyEffort};
pub use per_unit::per_unit_estimates;
