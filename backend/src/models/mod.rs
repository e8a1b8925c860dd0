//! Domain models shared by the builder and the view layer.
//!
//! - [`Feature`] - numeric field keys with their display names
//! - [`CanonicalRecord`] - one reconciled (country, year) row
//! - [`CanonicalTable`] - the immutable reconciled dataset
//! - [`YearRange`] - closed, ordered year interval used by filters

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{CsvError, FilterError};

// =============================================================================
// Canonical columns
// =============================================================================

/// Column order of the canonical CSV file.
pub const CANONICAL_COLUMNS: [&str; 13] = [
    "country",
    "year",
    "happiness_rank",
    "happiness_score",
    "gdp_per_capita",
    "family",
    "health_life_expectancy",
    "freedom",
    "perceptions_of_corruption",
    "generosity",
    "dystopia_residual",
    "region",
    "country_code",
];

/// Columns every filtered subset keeps regardless of the feature selection.
pub const IDENTIFIER_COLUMNS: [&str; 4] = ["country", "happiness_score", "year", "country_code"];

// =============================================================================
// Features
// =============================================================================

/// A numeric field of the canonical table that a view can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    HappinessRank,
    HappinessScore,
    GdpPerCapita,
    Family,
    HealthLifeExpectancy,
    Freedom,
    PerceptionsOfCorruption,
    Generosity,
    DystopiaResidual,
}

impl Feature {
    /// Every selectable feature, in canonical column order.
    pub const ALL: [Feature; 9] = [
        Feature::HappinessRank,
        Feature::HappinessScore,
        Feature::GdpPerCapita,
        Feature::Family,
        Feature::HealthLifeExpectancy,
        Feature::Freedom,
        Feature::PerceptionsOfCorruption,
        Feature::Generosity,
        Feature::DystopiaResidual,
    ];

    /// The seven contributing factors that explain `happiness_score`.
    pub const FACTORS: [Feature; 7] = [
        Feature::GdpPerCapita,
        Feature::Family,
        Feature::HealthLifeExpectancy,
        Feature::Freedom,
        Feature::PerceptionsOfCorruption,
        Feature::Generosity,
        Feature::DystopiaResidual,
    ];

    /// Canonical column name.
    pub fn key(self) -> &'static str {
        match self {
            Feature::HappinessRank => "happiness_rank",
            Feature::HappinessScore => "happiness_score",
            Feature::GdpPerCapita => "gdp_per_capita",
            Feature::Family => "family",
            Feature::HealthLifeExpectancy => "health_life_expectancy",
            Feature::Freedom => "freedom",
            Feature::PerceptionsOfCorruption => "perceptions_of_corruption",
            Feature::Generosity => "generosity",
            Feature::DystopiaResidual => "dystopia_residual",
        }
    }

    /// Human-readable label used for chart titles and facet headers.
    pub fn display_name(self) -> &'static str {
        match self {
            Feature::HappinessRank => "Happiness Rank",
            Feature::HappinessScore => "Happiness Score",
            Feature::GdpPerCapita => "GDP per Capita",
            Feature::Family => "Family",
            Feature::HealthLifeExpectancy => "Health (Life Expectancy)",
            Feature::Freedom => "Freedom",
            Feature::PerceptionsOfCorruption => "Perceptions of Corruption",
            Feature::Generosity => "Generosity",
            Feature::DystopiaResidual => "Dystopia Residual",
        }
    }

    /// Inverse of [`Feature::display_name`].
    pub fn from_display_name(label: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.display_name() == label)
    }

    pub fn is_factor(self) -> bool {
        Feature::FACTORS.contains(&self)
    }

    /// Parse a comma-separated list of keys, skipping blanks and duplicates.
    pub fn parse_list(raw: &str) -> Result<Vec<Feature>, FilterError> {
        let mut out = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let feature: Feature = part.parse()?;
            if !out.contains(&feature) {
                out.push(feature);
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Feature {
    type Err = FilterError;

    /// Accepts either the column key or the display name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.key() == s)
            .or_else(|| Feature::from_display_name(s))
            .ok_or_else(|| FilterError::UnknownFeature(s.to_string()))
    }
}

// =============================================================================
// Canonical record
// =============================================================================

/// One reconciled row: a single country in a single year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub country: String,
    pub year: i32,
    pub happiness_rank: u32,
    pub happiness_score: f64,
    pub gdp_per_capita: Option<f64>,
    pub family: Option<f64>,
    pub health_life_expectancy: Option<f64>,
    pub freedom: Option<f64>,
    pub perceptions_of_corruption: Option<f64>,
    pub generosity: Option<f64>,
    pub dystopia_residual: Option<f64>,
    pub region: Option<String>,
    pub country_code: Option<String>,
}

impl CanonicalRecord {
    /// Value of a numeric feature. Rank and score are always present.
    pub fn value(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::HappinessRank => Some(f64::from(self.happiness_rank)),
            Feature::HappinessScore => Some(self.happiness_score),
            Feature::GdpPerCapita => self.gdp_per_capita,
            Feature::Family => self.family,
            Feature::HealthLifeExpectancy => self.health_life_expectancy,
            Feature::Freedom => self.freedom,
            Feature::PerceptionsOfCorruption => self.perceptions_of_corruption,
            Feature::Generosity => self.generosity,
            Feature::DystopiaResidual => self.dystopia_residual,
        }
    }
}

// =============================================================================
// Canonical table
// =============================================================================

/// The reconciled dataset. Read-only once constructed.
#[derive(Debug, Clone, Default)]
pub struct CanonicalTable {
    records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    pub fn new(records: Vec<CanonicalRecord>) -> Self {
        Self { records }
    }

    /// Load a canonical CSV written by the builder.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CsvError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| CsvError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Read canonical rows from any CSV source.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, CsvError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let records = rdr
            .deserialize::<CanonicalRecord>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { records })
    }

    /// Write the table as CSV with [`CANONICAL_COLUMNS`] as header.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<(), CsvError> {
        let mut wtr = csv::Writer::from_writer(writer);
        if self.records.is_empty() {
            wtr.write_record(CANONICAL_COLUMNS)?;
        }
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct countries, sorted.
    pub fn countries(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.country.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.records
            .iter()
            .map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Full year span of the table, `None` when empty.
    pub fn year_bounds(&self) -> Option<YearRange> {
        YearRange::from_values(&self.years())
    }
}

// =============================================================================
// Year range
// =============================================================================

/// Closed integer interval `[start, end]` with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    /// Endpoints may be given in either order.
    pub fn new(a: i32, b: i32) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// Collapse any number of years to their min/max; `None` for no values.
    pub fn from_values(values: &[i32]) -> Option<Self> {
        let start = values.iter().copied().min()?;
        let end = values.iter().copied().max()?;
        Some(Self { start, end })
    }

    /// Parse `"2015,2019"` (or a single year, or more values collapsed to min/max).
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let values = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                p.parse::<i32>()
                    .map_err(|_| FilterError::InvalidYearRange(raw.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_values(&values).ok_or_else(|| FilterError::InvalidYearRange(raw.to_string()))
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_keys_round_trip_through_labels() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_display_name(feature.display_name()), Some(feature));
            assert_eq!(feature.key().parse::<Feature>().unwrap(), feature);
        }
    }

    #[test]
    fn test_feature_parse_list() {
        let features = Feature::parse_list("gdp_per_capita, Freedom ,gdp_per_capita,").unwrap();
        assert_eq!(features, vec![Feature::GdpPerCapita, Feature::Freedom]);

        let err = Feature::parse_list("gdp,family").unwrap_err();
        assert_eq!(err, FilterError::UnknownFeature("gdp".into()));
    }

    #[test]
    fn test_factors_exclude_rank_and_score() {
        assert_eq!(Feature::FACTORS.len(), 7);
        assert!(!Feature::HappinessScore.is_factor());
        assert!(Feature::DystopiaResidual.is_factor());
    }

    #[test]
    fn test_year_range_collapses_to_min_max() {
        let range = YearRange::from_values(&[2017, 2015, 2019, 2016]).unwrap();
        assert_eq!((range.start(), range.end()), (2015, 2019));
        assert_eq!(YearRange::new(2019, 2016), YearRange::new(2016, 2019));
        assert!(YearRange::from_values(&[]).is_none());
    }

    #[test]
    fn test_year_range_parse() {
        assert_eq!(YearRange::parse("2019,2015").unwrap(), YearRange::new(2015, 2019));
        assert_eq!(YearRange::parse("2018").unwrap(), YearRange::new(2018, 2018));
        assert!(YearRange::parse("").is_err());
        assert!(YearRange::parse("twenty").is_err());
    }

    #[test]
    fn test_canonical_csv_round_trip_keeps_nulls() {
        let record = CanonicalRecord {
            country: "United Arab Emirates".into(),
            year: 2018,
            happiness_rank: 20,
            happiness_score: 6.774,
            gdp_per_capita: Some(2.096),
            family: Some(0.776),
            health_life_expectancy: Some(0.670),
            freedom: Some(0.284),
            perceptions_of_corruption: None,
            generosity: Some(0.186),
            dystopia_residual: Some(2.76),
            region: None,
            country_code: Some("ARE".into()),
        };
        let table = CanonicalTable::new(vec![record.clone()]);

        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with(&CANONICAL_COLUMNS.join(",")));

        let loaded = CanonicalTable::from_reader(buf.as_slice()).unwrap();
        assert_eq!(loaded.records(), &[record]);
    }

    #[test]
    fn test_empty_table_still_writes_header() {
        let mut buf = Vec::new();
        CanonicalTable::default().write_csv(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().trim(), CANONICAL_COLUMNS.join(","));
    }
}
