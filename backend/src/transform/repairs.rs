//! Record-level repairs applied after the union.
//!
//! - country-name aliases (one spelling per country across years)
//! - region backfill for years that shipped without a region column
//! - country-code join from a lookup table
//! - duplicate detection and final ordering

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{ReconcileError, ReconcileResult};
use crate::models::CanonicalRecord;
use crate::parser::RawTable;

/// Spellings that changed between releases.
const BUILTIN_ALIASES: [(&str, &str); 2] = [
    ("Hong Kong S.A.R., China", "Hong Kong"),
    ("Somaliland region", "Somaliland Region"),
];

// =============================================================================
// Country aliases
// =============================================================================

/// Variant spelling → canonical country name.
#[derive(Debug, Clone)]
pub struct CountryAliases {
    map: HashMap<String, String>,
}

impl Default for CountryAliases {
    fn default() -> Self {
        let map = BUILTIN_ALIASES
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        Self { map }
    }
}

impl CountryAliases {
    /// No aliases at all.
    pub fn empty() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn insert(&mut self, variant: impl Into<String>, canonical: impl Into<String>) {
        self.map.insert(variant.into(), canonical.into());
    }

    /// Add entries from a two-column (variant, canonical) table.
    pub fn extend_from_raw(&mut self, raw: &RawTable) -> ReconcileResult<usize> {
        if raw.headers.len() != 2 {
            return Err(ReconcileError::MalformedLookup {
                name: "aliases".into(),
                found: raw.headers.len(),
            });
        }
        let before = self.map.len();
        for row in &raw.rows {
            let (variant, canonical) = (row[0].trim(), row[1].trim());
            if !variant.is_empty() && !canonical.is_empty() {
                self.insert(variant, canonical);
            }
        }
        Ok(self.map.len() - before)
    }

    pub fn canonicalize<'a>(&'a self, name: &'a str) -> &'a str {
        self.map.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Rewrite country names in place. Returns how many rows changed.
    pub fn apply(&self, records: &mut [CanonicalRecord]) -> usize {
        let mut changed = 0;
        for record in records.iter_mut() {
            if let Some(canonical) = self.map.get(&record.country) {
                log_info_indent(
                    format!("{} ({}) → {}", record.country, record.year, canonical),
                    1,
                );
                record.country = canonical.clone();
                changed += 1;
            }
        }
        changed
    }
}

// =============================================================================
// Region backfill
// =============================================================================

/// Two years disagree on a country's region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionConflict {
    pub country: String,
    /// Region kept (from the earliest year that had one)
    pub kept: String,
    pub kept_year: i32,
    pub other: String,
    pub other_year: i32,
}

/// Outcome of [`rebuild_regions`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegionRepair {
    /// Rows whose region was filled in
    pub filled: usize,
    /// Countries without a region in any year
    pub unresolved: Vec<String>,
    pub conflicts: Vec<RegionConflict>,
}

/// Assign every record its country's region.
///
/// A country's region is the one recorded in the earliest year that carries
/// one. Later disagreeing values are overwritten and reported.
pub fn rebuild_regions(records: &mut [CanonicalRecord]) -> RegionRepair {
    let mut order: Vec<&CanonicalRecord> = records.iter().filter(|r| r.region.is_some()).collect();
    order.sort_by_key(|r| r.year);

    let mut lookup: HashMap<String, (String, i32)> = HashMap::new();
    let mut conflicts = Vec::new();
    let mut seen_conflicts: HashSet<(String, String)> = HashSet::new();

    for record in order {
        let Some(region) = record.region.as_deref() else { continue };
        match lookup.get(&record.country) {
            None => {
                lookup.insert(record.country.clone(), (region.to_string(), record.year));
            }
            Some((kept, kept_year)) if kept != region => {
                if seen_conflicts.insert((record.country.clone(), region.to_string())) {
                    conflicts.push(RegionConflict {
                        country: record.country.clone(),
                        kept: kept.clone(),
                        kept_year: *kept_year,
                        other: region.to_string(),
                        other_year: record.year,
                    });
                }
            }
            Some(_) => {}
        }
    }

    let mut filled = 0;
    let mut unresolved = BTreeSet::new();
    for record in records.iter_mut() {
        match lookup.get(&record.country) {
            Some((region, _)) => {
                if record.region.is_none() {
                    filled += 1;
                }
                record.region = Some(region.clone());
            }
            None => {
                unresolved.insert(record.country.clone());
            }
        }
    }

    for conflict in &conflicts {
        log_warning(format!(
            "Region conflict for '{}': kept '{}' ({}), ignored '{}' ({})",
            conflict.country, conflict.kept, conflict.kept_year, conflict.other, conflict.other_year
        ));
    }
    if !unresolved.is_empty() {
        log_warning(format!(
            "{} countries have no region in any year: {}",
            unresolved.len(),
            unresolved.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    log_success(format!("Regions: {} rows backfilled from {} countries", filled, lookup.len()));

    RegionRepair {
        filled,
        unresolved: unresolved.into_iter().collect(),
        conflicts,
    }
}

// =============================================================================
// Country codes
// =============================================================================

/// Country → three-letter code.
#[derive(Debug, Clone, Default)]
pub struct CountryCodeLookup {
    codes: HashMap<String, String>,
}

impl CountryCodeLookup {
    /// Build from a two-column (country, code) table. Keys go through the
    /// alias table; codes are upper-cased.
    pub fn from_raw(raw: &RawTable, aliases: &CountryAliases) -> ReconcileResult<Self> {
        if raw.headers.len() != 2 {
            return Err(ReconcileError::MalformedLookup {
                name: "country codes".into(),
                found: raw.headers.len(),
            });
        }
        let codes = raw
            .rows
            .iter()
            .filter(|row| !row[0].trim().is_empty() && !row[1].trim().is_empty())
            .map(|row| {
                (
                    aliases.canonicalize(row[0].trim()).to_string(),
                    row[1].trim().to_uppercase(),
                )
            })
            .collect();
        Ok(Self { codes })
    }

    pub fn get(&self, country: &str) -> Option<&str> {
        self.codes.get(country).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Fill `country_code` from the lookup. Returns the sorted countries with no code.
pub fn join_country_codes(records: &mut [CanonicalRecord], lookup: &CountryCodeLookup) -> Vec<String> {
    let mut missing = BTreeSet::new();
    for record in records.iter_mut() {
        record.country_code = lookup.get(&record.country).map(str::to_string);
        if record.country_code.is_none() {
            missing.insert(record.country.clone());
        }
    }
    if !missing.is_empty() {
        log_warning(format!(
            "No country code for: {}",
            missing.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    missing.into_iter().collect()
}

// =============================================================================
// Uniqueness and ordering
// =============================================================================

/// First (country, year) pair that occurs more than once.
pub fn find_duplicate(records: &[CanonicalRecord]) -> Option<(String, i32)> {
    let mut seen: HashSet<(&str, i32)> = HashSet::new();
    records
        .iter()
        .find(|r| !seen.insert((r.country.as_str(), r.year)))
        .map(|r| (r.country.clone(), r.year))
}

/// Order by year, then rank, then country.
pub fn sort_records(records: &mut [CanonicalRecord]) {
    records.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then(a.happiness_rank.cmp(&b.happiness_rank))
            .then_with(|| a.country.cmp(&b.country))
    });
}

/// Rows per year, for reporting.
pub fn rows_per_year(records: &[CanonicalRecord]) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.year).or_insert(0) += 1;
    }
    counts
}

/// Log a one-line alias summary.
pub fn log_alias_summary(changed: usize, aliases: &CountryAliases) {
    if changed > 0 {
        log_info(format!("Aliases: {} rows renamed ({} known spellings)", changed, aliases.len()));
    }
}
