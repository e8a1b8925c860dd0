//! Read-only views over the canonical table.
//!
//! Every view is a pure function of the table and a [`Selection`]; nothing
//! is cached between calls. An empty subset flows through every view and
//! yields empty output.
//!
//! ```text
//! CanonicalTable ──filter──▶ Subset ──┬──▶ aggregate_by_country
//!                                     ├──▶ time_series
//!                                     ├──▶ reshape_for_facets
//!                                     └──▶ map_frames
//! ```

pub mod aggregate;
pub mod facets;
pub mod filter;
pub mod map;

pub use aggregate::{aggregate_by_country, time_series, CountryAverage, TimePoint};
pub use facets::{reshape_for_facets, FacetRow};
pub use filter::filter;
pub use map::{map_frames, MapFrame, MapPoint};

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::FilterResult;
use crate::models::{CanonicalTable, Feature, YearRange, IDENTIFIER_COLUMNS};

// =============================================================================
// Selection
// =============================================================================

/// Current control state: countries, features, year range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    /// Empty means every country
    pub countries: Vec<String>,
    pub features: Vec<Feature>,
    pub years: YearRange,
}

impl Selection {
    /// Build from comma-separated request parameters.
    ///
    /// Missing features default to the seven contributing factors; missing
    /// years default to the table's full span.
    pub fn parse(
        table: &CanonicalTable,
        countries: Option<&str>,
        features: Option<&str>,
        years: Option<&str>,
    ) -> FilterResult<Self> {
        let countries = countries
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let features = match features.filter(|s| !s.trim().is_empty()) {
            Some(raw) => Feature::parse_list(raw)?,
            None => Feature::FACTORS.to_vec(),
        };

        let years = match years.filter(|s| !s.trim().is_empty()) {
            Some(raw) => YearRange::parse(raw)?,
            None => table.year_bounds().unwrap_or(YearRange::new(0, 0)),
        };

        Ok(Self {
            countries,
            features,
            years,
        })
    }

    pub fn apply(&self, table: &CanonicalTable) -> Subset {
        filter(table, &self.countries, &self.features, self.years)
    }
}

// =============================================================================
// Subset
// =============================================================================

/// Rows kept by [`filter`], projected to the requested features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subset {
    /// Requested features, deduplicated, in request order
    pub features: Vec<Feature>,
    pub rows: Vec<SubsetRow>,
}

/// One projected row. `happiness_score` is always present as an
/// identifier, so `values` never repeats it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsetRow {
    pub country: String,
    pub year: i32,
    pub happiness_score: f64,
    pub country_code: Option<String>,
    #[serde(flatten)]
    pub values: BTreeMap<Feature, Option<f64>>,
}

impl SubsetRow {
    pub fn value(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::HappinessScore => Some(self.happiness_score),
            other => self.values.get(&other).copied().flatten(),
        }
    }
}

impl Subset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        feature == Feature::HappinessScore || self.features.contains(&feature)
    }

    /// Column names: the four identifiers, then the requested features.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = IDENTIFIER_COLUMNS.to_vec();
        columns.extend(
            self.features
                .iter()
                .filter(|f| **f != Feature::HappinessScore)
                .map(|f| f.key()),
        );
        columns
    }
}

// =============================================================================
// Feature catalog
// =============================================================================

/// Key, display label and factor flag of a feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureInfo {
    pub key: &'static str,
    pub label: &'static str,
    pub factor: bool,
}

/// All selectable features, in display order.
pub fn feature_catalog() -> Vec<FeatureInfo> {
    Feature::ALL
        .iter()
        .map(|&f| FeatureInfo {
            key: f.key(),
            label: f.display_name(),
            factor: f.is_factor(),
        })
        .collect()
}
