use serde::Serialize;

use super::Subset;
use crate::error::{FilterError, FilterResult};
use crate::models::Feature;

/// One (row, feature) pair in long format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetRow {
    pub country: String,
    pub year: i32,
    pub feature: Feature,
    /// Display name, maps back to `feature` through [`Feature::from_display_name`]
    pub label: &'static str,
    pub value: Option<f64>,
}

/// Melt a subset to one row per original row and feature.
///
/// Output is feature-major: all rows for the first feature, then the next.
/// Every feature must be part of the subset.
pub fn reshape_for_facets(subset: &Subset, features: &[Feature]) -> FilterResult<Vec<FacetRow>> {
    if let Some(missing) = features.iter().find(|f| !subset.has_feature(**f)) {
        return Err(FilterError::FeatureNotSelected(missing.key().to_string()));
    }

    let mut out = Vec::with_capacity(subset.len() * features.len());
    for &feature in features {
        for row in &subset.rows {
            out.push(FacetRow {
                country: row.country.clone(),
                year: row.year,
                feature,
                label: feature.display_name(),
                value: row.value(feature),
            });
        }
    }
    Ok(out)
}
