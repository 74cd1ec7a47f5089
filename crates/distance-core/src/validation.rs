//! Input-contract checks run before any computation
//!
//! Every violation is fatal and names the offending field and row.

use crate::formula::CovariateFormula;
use crate::{DetectionRecord, Error, Result, SiteRecord, SurveyGeometry};
use std::collections::HashSet;
use tracing::debug;

/// Validate the site table and the detections against it
pub fn validate_survey(
    detections: &[DetectionRecord],
    sites: &[SiteRecord],
    geometry: SurveyGeometry,
    formula: &CovariateFormula,
) -> Result<()> {
    let site_ids = validate_sites(sites, geometry)?;
    validate_detections(detections, &site_ids, formula)?;
    debug!(
        n_sites = sites.len(),
        n_detections = detections.len(),
        "survey inputs validated"
    );
    Ok(())
}

/// Validate the site table, returning the set of site ids
pub fn validate_sites(sites: &[SiteRecord], geometry: SurveyGeometry) -> Result<HashSet<&str>> {
    if sites.is_empty() {
        return Err(Error::InvalidParameter("site table is empty".to_string()));
    }

    let mut ids = HashSet::with_capacity(sites.len());
    for (row, site) in sites.iter().enumerate() {
        if site.site_id.trim().is_empty() {
            return Err(Error::missing_value("site_id", row));
        }
        if !ids.insert(site.site_id.as_str()) {
            return Err(Error::DuplicateSite {
                site_id: site.site_id.clone(),
            });
        }
        if geometry == SurveyGeometry::Line {
            match site.length {
                None => return Err(Error::missing_value("length", row)),
                Some(len) if len.is_nan() => return Err(Error::missing_value("length", row)),
                Some(len) if !(len > 0.0 && len.is_finite()) => {
                    return Err(Error::invalid_value(
                        "length",
                        row,
                        format!("must be positive and finite, got {len}"),
                    ))
                }
                Some(_) => {}
            }
        }
    }
    Ok(ids)
}

/// Validate detections against a set of known site ids
pub fn validate_detections(
    detections: &[DetectionRecord],
    site_ids: &HashSet<&str>,
    formula: &CovariateFormula,
) -> Result<()> {
    for (row, det) in detections.iter().enumerate() {
        if det.site_id.trim().is_empty() {
            return Err(Error::missing_value("site_id", row));
        }
        if det.distance.is_nan() {
            return Err(Error::missing_value("distance", row));
        }
        if !(det.distance >= 0.0 && det.distance.is_finite()) {
            return Err(Error::invalid_value(
                "distance",
                row,
                format!("must be non-negative and finite, got {}", det.distance),
            ));
        }
        if det.group_size.is_nan() {
            return Err(Error::missing_value("group_size", row));
        }
        if !(det.group_size > 0.0 && det.group_size.is_finite()) {
            return Err(Error::invalid_value(
                "group_size",
                row,
                format!("must be positive and finite, got {}", det.group_size),
            ));
        }
        formula.design_row(det, row)?;
        if !site_ids.contains(det.site_id.as_str()) {
            return Err(Error::UnknownSite {
                site_id: det.site_id.clone(),
                row,
            });
        }
    }
    Ok(())
}
