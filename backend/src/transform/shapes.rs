//! Per-year schema tables.
//!
//! Each supported release belongs to one of three historical header
//! shapes. A [`YearSchema`] is plain configuration data: which normalized
//! headers to rename, which year-specific columns to drop, and where
//! `dystopia_residual` comes from. Built-in tables cover 2015–2019; other
//! years can be supplied as JSON through the [`crate::registry`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns every reconciled yearly table carries, in this order.
pub const RECONCILED_COLUMNS: [&str; 12] = [
    "country",
    "region",
    "happiness_rank",
    "happiness_score",
    "gdp_per_capita",
    "family",
    "health_life_expectancy",
    "freedom",
    "perceptions_of_corruption",
    "generosity",
    "dystopia_residual",
    "year",
];

/// Years with built-in schema tables.
pub const SUPPORTED_YEARS: [i32; 5] = [2015, 2016, 2017, 2018, 2019];

/// Historical header layout of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaShape {
    /// 2015–2016: parenthesised headers, region column, error/interval columns.
    Early,
    /// 2017: dotted headers, whisker bounds, no region.
    Middle,
    /// 2018–2019: renamed metrics, no region, no dystopia residual.
    Late,
}

impl SchemaShape {
    /// Shape of a built-in year.
    pub fn for_year(year: i32) -> Option<Self> {
        match year {
            2015 | 2016 => Some(SchemaShape::Early),
            2017 => Some(SchemaShape::Middle),
            2018 | 2019 => Some(SchemaShape::Late),
            _ => None,
        }
    }

    /// Normalized raw header → canonical column.
    pub fn renames(self) -> BTreeMap<String, String> {
        let pairs: &[(&str, &str)] = match self {
            SchemaShape::Early => &[
                ("economy_gdp_per_capita", "gdp_per_capita"),
                ("trust_government_corruption", "perceptions_of_corruption"),
            ],
            SchemaShape::Middle => &[
                ("economy__gdp_per_capita_", "gdp_per_capita"),
                ("health__life_expectancy_", "health_life_expectancy"),
                ("trust__government_corruption_", "perceptions_of_corruption"),
            ],
            SchemaShape::Late => &[
                ("overall_rank", "happiness_rank"),
                ("score", "happiness_score"),
                ("healthy_life_expectancy", "health_life_expectancy"),
                ("country_or_region", "country"),
                ("social_support", "family"),
                ("freedom_to_make_life_choices", "freedom"),
            ],
        };
        pairs
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect()
    }

    /// Year-specific columns expected in the source and discarded on purpose.
    pub fn dropped_columns(self) -> Vec<String> {
        let cols: &[&str] = match self {
            SchemaShape::Early => &[
                "standard_error",
                "lower_confidence_interval",
                "upper_confidence_interval",
            ],
            SchemaShape::Middle => &["whisker_low", "whisker_high"],
            SchemaShape::Late => &[],
        };
        cols.iter().map(|c| c.to_string()).collect()
    }

    pub fn dystopia_source(self) -> DystopiaSource {
        match self {
            SchemaShape::Early | SchemaShape::Middle => DystopiaSource::Native,
            SchemaShape::Late => DystopiaSource::Auxiliary,
        }
    }
}

/// Where a year's `dystopia_residual` values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DystopiaSource {
    /// A column of the raw table.
    Native,
    /// A separate two-column (country, value) lookup file.
    Auxiliary,
}

/// Reconciliation rules for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSchema {
    pub year: i32,

    pub shape: SchemaShape,

    /// Normalized header → canonical column
    #[serde(default)]
    pub renames: BTreeMap<String, String>,

    /// Columns known to be year-specific and discarded without warning
    #[serde(default)]
    pub drop: Vec<String>,

    pub dystopia: DystopiaSource,
}

impl YearSchema {
    /// Built-in schema for one of [`SUPPORTED_YEARS`].
    pub fn builtin(year: i32) -> Option<Self> {
        SchemaShape::for_year(year).map(|shape| Self::from_shape(year, shape))
    }

    /// Schema using a shape's stock tables for an arbitrary year.
    pub fn from_shape(year: i32, shape: SchemaShape) -> Self {
        Self {
            year,
            shape,
            renames: shape.renames(),
            drop: shape.dropped_columns(),
            dystopia: shape.dystopia_source(),
        }
    }

    /// Parse a schema from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Canonical name for a normalized header (identity when not renamed).
    pub fn rename<'a>(&'a self, normalized: &'a str) -> &'a str {
        self.renames.get(normalized).map(String::as_str).unwrap_or(normalized)
    }

    pub fn needs_auxiliary(&self) -> bool {
        self.dystopia == DystopiaSource::Auxiliary
    }

    /// Whether a column is on this schema's explicit drop list.
    pub fn is_dropped(&self, column: &str) -> bool {
        self.drop.iter().any(|c| c == column)
    }
}
