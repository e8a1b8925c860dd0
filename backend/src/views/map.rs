use serde::Serialize;
use std::collections::BTreeMap;

use super::Subset;

/// A country on the choropleth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub country: String,
    pub country_code: Option<String>,
    pub happiness_score: f64,
}

/// All points of one animation frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFrame {
    pub year: i32,
    pub points: Vec<MapPoint>,
}

/// Group a subset by year, ascending; points within a frame by country.
pub fn map_frames(subset: &Subset) -> Vec<MapFrame> {
    let mut frames: BTreeMap<i32, Vec<MapPoint>> = BTreeMap::new();
    for row in &subset.rows {
        frames.entry(row.year).or_default().push(MapPoint {
            country: row.country.clone(),
            country_code: row.country_code.clone(),
            happiness_score: row.happiness_score,
        });
    }

    frames
        .into_iter()
        .map(|(year, mut points)| {
            points.sort_by(|a, b| a.country.cmp(&b.country));
            MapFrame { year, points }
        })
        .collect()
}
