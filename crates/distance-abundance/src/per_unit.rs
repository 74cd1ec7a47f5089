//! Per-site abundance breakdown

use crate::estimator::estimate_unchecked;
use distance_core::{validate_survey, DetectionFunction, DetectionRecord, Result, SiteRecord};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// One abundance value per site, keyed by site id
///
/// Each site is estimated on its own detections and its own effort with the
/// original model. A site whose truncated group sizes sum to zero gets
/// exactly `0.0`. The values need not average to the global estimate.
#[instrument(skip_all, fields(n_sites = sites.len()))]
pub fn per_unit_estimates<M>(
    model: &M,
    detections: &[DetectionRecord],
    sites: &[SiteRecord],
    area: f64,
) -> Result<BTreeMap<String, f64>>
where
    M: DetectionFunction + ?Sized,
{
    validate_survey(detections, sites, model.geometry(), model.formula())?;

    let (w_lo, w_hi) = model.truncation();
    let mut by_site: BTreeMap<&str, Vec<DetectionRecord>> = BTreeMap::new();
    for detection in detections {
        by_site
            .entry(detection.site_id.as_str())
            .or_default()
            .push(detection.clone());
    }

    let mut values = BTreeMap::new();
    for site in sites {
        let site_detections = by_site
            .get(site.site_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let group_total: f64 = site_detections
            .iter()
            .filter(|d| d.within(w_lo, w_hi))
            .map(|d| d.group_size)
            .sum();

        let value = if group_total == 0.0 {
            0.0
        } else {
            estimate_unchecked(model, site_detections, std::slice::from_ref(site), area)?.estimate
        };
        debug!(site = %site.site_id, value, "per-unit estimate");
        values.insert(site.site_id.clone(), value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use distance_core::{DetectionFunctionModel, FitConfig, LikelihoodRegistry, SurveyGeometry};

    fn model() -> DetectionFunctionModel {
        let config = FitConfig::new("halfnorm", 50.0, SurveyGeometry::Line);
        DetectionFunctionModel::builder(config, vec![10.0])
            .build(&LikelihoodRegistry::with_builtins())
            .unwrap()
    }

    #[test]
    fn test_empty_and_truncated_sites_are_zero() {
        let model = model();
        let sites = vec![
            SiteRecord::line("A", 100.0),
            SiteRecord::line("B", 100.0),
            SiteRecord::line("C", 100.0),
        ];
        let detections = vec![
            DetectionRecord::new("A", 2.0, 5.0),
            DetectionRecord::new("A", 1.0, 12.0),
            // only beyond the truncation distance
            DetectionRecord::new("B", 3.0, 80.0),
        ];

        let values = per_unit_estimates(&model, &detections, &sites, 1.0).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values["B"], 0.0);
        assert_eq!(values["C"], 0.0);

        let esw = model.effective_strip_width().unwrap();
        assert_relative_eq!(values["A"], 3.0 / (2.0 * esw * 100.0), max_relative = 1e-12);
    }

    #[test]
    fn test_each_site_uses_its_own_effort() {
        let model = model();
        let sites = vec![SiteRecord::line("A", 100.0), SiteRecord::line("B", 400.0)];
        let detections = vec![
            DetectionRecord::new("A", 1.0, 3.0),
            DetectionRecord::new("B", 1.0, 3.0),
        ];

        let values = per_unit_estimates(&model, &detections, &sites, 1.0).unwrap();
        assert_relative_eq!(values["A"], 4.0 * values["B"], max_relative = 1e-12);
    }
}
