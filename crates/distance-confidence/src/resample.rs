//! Nonparametric resampling of survey sites
//!
//! One replicate draws `|sites|` sites with replacement. Every detection
//! recorded at a site drawn `m` times appears `m` times in the replicate;
//! sites not drawn contribute nothing. A double-observer table used to
//! estimate `g(x0)` is resampled independently row by row.

use distance_core::{
    CovariateFormula, DetectionRecord, FitConfig, FitRequest, GxScale, ScalingReference,
    SiteRecord,
};
use rand::Rng;
use std::collections::BTreeMap;

/// One bootstrap replicate of the survey
#[derive(Debug, Clone, PartialEq)]
pub struct Resample {
    /// Drawn sites in draw order, repeated sites included
    pub sites: Vec<SiteRecord>,
    pub detections: Vec<DetectionRecord>,
    /// Times each original site id was drawn (zero for sites not drawn)
    pub multiplicities: BTreeMap<String, usize>,
    pub scaling: ScalingReference,
}

impl Resample {
    /// Configuration for refitting on this replicate
    ///
    /// Everything but the scaling reference is carried over unchanged.
    pub fn fit_config(&self, original: &FitConfig) -> FitConfig {
        original.clone().with_scaling(self.scaling.clone())
    }

    /// Fit request against the original formula and a rebuilt configuration
    pub fn fit_request<'a>(
        &'a self,
        formula: &'a CovariateFormula,
        config: &'a FitConfig,
    ) -> FitRequest<'a> {
        FitRequest::new(formula, &self.detections, config)
    }
}

/// Draw one replicate
pub fn resample<R>(
    sites: &[SiteRecord],
    detections: &[DetectionRecord],
    scaling: &ScalingReference,
    rng: &mut R,
) -> Resample
where
    R: Rng + ?Sized,
{
    let mut multiplicities: BTreeMap<String, usize> =
        sites.iter().map(|s| (s.site_id.clone(), 0)).collect();

    let drawn: Vec<SiteRecord> = if sites.is_empty() {
        Vec::new()
    } else {
        (0..sites.len())
            .map(|_| sites[rng.gen_range(0..sites.len())].clone())
            .collect()
    };
    for site in &drawn {
        *multiplicities.entry(site.site_id.clone()).or_default() += 1;
    }

    let mut expanded = Vec::with_capacity(detections.len());
    for detection in detections {
        let m = multiplicities.get(&detection.site_id).copied().unwrap_or(0);
        expanded.extend(std::iter::repeat(detection).take(m).cloned());
    }

    let g0 = match &scaling.g0 {
        GxScale::DoubleObserver(table) if !table.is_empty() => GxScale::DoubleObserver(
            (0..table.len())
                .map(|_| table[rng.gen_range(0..table.len())])
                .collect(),
        ),
        other => other.clone(),
    };

    Resample {
        sites: drawn,
        detections: expanded,
        multiplicities,
        scaling: ScalingReference { x0: scaling.x0, g0 },
    }
}
