use std::collections::{BTreeMap, HashSet};

use super::{Subset, SubsetRow};
use crate::models::{CanonicalTable, Feature, YearRange};

/// Rows whose country is selected (all when `countries` is empty) and whose
/// year lies in `years`, projected to `features` plus the identifiers.
///
/// Row order follows the table.
pub fn filter(table: &CanonicalTable, countries: &[String], features: &[Feature], years: YearRange) -> Subset {
    let wanted: HashSet<&str> = countries.iter().map(String::as_str).collect();

    let mut selected: Vec<Feature> = Vec::with_capacity(features.len());
    for &feature in features {
        if !selected.contains(&feature) {
            selected.push(feature);
        }
    }

    let rows = table
        .records()
        .iter()
        .filter(|r| wanted.is_empty() || wanted.contains(r.country.as_str()))
        .filter(|r| years.contains(r.year))
        .map(|r| SubsetRow {
            country: r.country.clone(),
            year: r.year,
            happiness_score: r.happiness_score,
            country_code: r.country_code.clone(),
            values: selected
                .iter()
                .filter(|&&f| f != Feature::HappinessScore)
                .map(|&f| (f, r.value(f)))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect();

    Subset {
        features: selected,
        rows,
    }
}
