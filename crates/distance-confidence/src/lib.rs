//! Bootstrap confidence intervals for distance-sampling abundance
//!
//! This crate wraps the abundance estimator in a nonparametric bootstrap
//! over survey sites:
//!
//! - **Resampling**: sites drawn with replacement, detections expanded by
//!   site multiplicity, double-observer tables resampled alongside
//! - **Refitting**: each replicate is handed to an external
//!   [`DetectionFunctionFitter`](distance_core::DetectionFunctionFitter)
//! - **Intervals**: bias-corrected percentile intervals from the usable
//!   replicates, with lost replicates counted by cause
//!
//! # Example
//!
//! ```rust
//! use distance_confidence::{estimate_abundance, AbundanceOptions};
//! use distance_core::{
//!     fn_fitter, DetectionFunctionModel, DetectionRecord, FitConfig, FitRequest,
//!     LikelihoodRegistry, SiteRecord, SurveyGeometry,
//! };
//!
//! let registry = LikelihoodRegistry::with_builtins();
//! let model = DetectionFunctionModel::builder(
//!     FitConfig::new("hazrate", 50.0, SurveyGeometry::Line),
//!     vec![12.0, 2.0],
//! )
//! .build(&registry)
//! .unwrap();
//!
//! let sites: Vec<SiteRecord> = (0..5).map(|i| SiteRecord::line(format!("T{i}"), 250.0)).collect();
//! let detections: Vec<DetectionRecord> = (0..20)
//!     .map(|i| DetectionRecord::new(format!("T{}", i % 5), 1.0, 2.0 * i as f64))
//!     .collect();
//!
//! let fitter = fn_fitter(|request: &FitRequest<'_>| {
//!     DetectionFunctionModel::builder(request.config.clone(), vec![12.0, 2.0]).build(&registry)
//! });
//!
//! let options = AbundanceOptions::default()
//!     .with_area(1.0e6)
//!     .with_bootstrap(40)
//!     .with_seed(2024)
//!     .by_unit(true);
//! let result = estimate_abundance(&model, &detections, &sites, &fitter, &options).unwrap();
//!
//! let ci = result.interval.unwrap();
//! assert!(ci.lower <= ci.upper);
//! assert_eq!(result.per_unit.unwrap().len(), 5);
//! ```

pub mod api;
mod bias_corrected;
mod bootstrap;
pub mod resample;
mod types;

// Re-exports
pub use api::{estimate_abundance, AbundanceOptions, DEFAULT_CONFIDENCE_LEVEL, DEFAULT_RESAMPLES};
pub use bias_corrected::{bias_correction, BiasCorrectedPercentile, BiasCorrection, BootstrapMethod};
pub use bootstrap::{AbundanceBootstrap, BootstrapDiagnostics};
pub use resample::{resample, Resample};
pub use types::{AbundanceEstimate, ConfidenceInterval, ConfidenceLevel};
