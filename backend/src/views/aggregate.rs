//! Per-country averages and the year-ordered time series.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{Subset, SubsetRow};
use crate::error::{FilterError, FilterResult};
use crate::models::Feature;

/// Mean of every numeric column for one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryAverage {
    pub country: String,
    pub happiness_score: f64,
    /// Rows averaged
    pub rows: usize,
    /// `None` when every row of the country is null for that feature
    #[serde(flatten)]
    pub values: BTreeMap<Feature, Option<f64>>,
}

/// One row per country, sorted ascending by mean happiness score.
///
/// Nulls are skipped. `year` is an identifier and is not averaged.
pub fn aggregate_by_country(subset: &Subset) -> Vec<CountryAverage> {
    let mut groups: BTreeMap<&str, Vec<&SubsetRow>> = BTreeMap::new();
    for row in &subset.rows {
        groups.entry(row.country.as_str()).or_default().push(row);
    }

    let mut averages: Vec<CountryAverage> = groups
        .into_iter()
        .map(|(country, rows)| {
            let score = mean(rows.iter().map(|r| Some(r.happiness_score))).unwrap_or(0.0);
            let values = subset
                .features
                .iter()
                .filter(|&&f| f != Feature::HappinessScore)
                .map(|&f| (f, mean(rows.iter().map(|r| r.value(f)))))
                .collect();
            CountryAverage {
                country: country.to_string(),
                happiness_score: score,
                rows: rows.len(),
                values,
            }
        })
        .collect();

    averages.sort_by(|a, b| {
        a.happiness_score
            .total_cmp(&b.happiness_score)
            .then_with(|| a.country.cmp(&b.country))
    });
    averages
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values.flatten().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// A subset row with its year as a calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    /// 1 January of `row.year`
    pub date: NaiveDate,
    #[serde(flatten)]
    pub row: SubsetRow,
}

/// Rows ordered by year (then country), unaggregated.
pub fn time_series(subset: &Subset) -> FilterResult<Vec<TimePoint>> {
    let mut points = subset
        .rows
        .iter()
        .map(|row| {
            let date = NaiveDate::from_ymd_opt(row.year, 1, 1).ok_or(FilterError::InvalidYear(row.year))?;
            Ok(TimePoint {
                date,
                row: row.clone(),
            })
        })
        .collect::<FilterResult<Vec<_>>>()?;

    points.sort_by(|a, b| {
        a.row
            .year
            .cmp(&b.row.year)
            .then_with(|| a.row.country.cmp(&b.row.country))
    });
    Ok(points)
}
