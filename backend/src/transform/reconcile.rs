//! Per-year reconciliation and the cross-year union.
//!
//! ```text
//! RawTable ──normalize──▶ slugs ──rename──▶ canonical names ──drop/join──▶ YearTable
//! YearTable × N ──union──▶ UnionTable ──parse──▶ Vec<CanonicalRecord>
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::headers::normalize_headers;
use super::repairs::CountryAliases;
use super::shapes::{SchemaShape, YearSchema, RECONCILED_COLUMNS};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{ReconcileError, ReconcileResult};
use crate::models::CanonicalRecord;
use crate::parser::RawTable;

// =============================================================================
// Auxiliary join policy
// =============================================================================

/// What to do when a country has no auxiliary dystopia-residual entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuxJoinPolicy {
    /// Abort the build, naming year and country.
    #[default]
    FailFast,
    /// Keep the row with an empty `dystopia_residual`.
    LeftJoinNull,
    /// Drop the row.
    InnerJoinDrop,
}

impl FromStr for AuxJoinPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fail-fast" => Ok(AuxJoinPolicy::FailFast),
            "left-join-null" => Ok(AuxJoinPolicy::LeftJoinNull),
            "inner-join-drop" => Ok(AuxJoinPolicy::InnerJoinDrop),
            other => Err(format!(
                "unknown policy '{}' (expected fail-fast, left-join-null or inner-join-drop)",
                other
            )),
        }
    }
}

impl fmt::Display for AuxJoinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuxJoinPolicy::FailFast => "fail-fast",
            AuxJoinPolicy::LeftJoinNull => "left-join-null",
            AuxJoinPolicy::InnerJoinDrop => "inner-join-drop",
        })
    }
}

// =============================================================================
// Auxiliary lookup
// =============================================================================

/// Country → raw dystopia-residual cell, for years whose source omits it.
///
/// Keys are alias-canonicalized so either spelling of a country matches.
#[derive(Debug, Clone, Default)]
pub struct AuxiliaryLookup {
    values: HashMap<String, String>,
    duplicates: Vec<String>,
}

impl AuxiliaryLookup {
    /// Build from a two-column (country, value) table. Header names are not
    /// interpreted; the first two columns are used positionally.
    pub fn from_raw(year: i32, raw: &RawTable, aliases: &CountryAliases) -> ReconcileResult<Self> {
        if raw.headers.len() != 2 {
            return Err(ReconcileError::MalformedLookup {
                name: format!("auxiliary {}", year),
                found: raw.headers.len(),
            });
        }
        let mut lookup = Self::default();
        for row in raw.rows.iter().filter(|row| !row[0].trim().is_empty()) {
            let country = aliases.canonicalize(row[0].trim()).to_string();
            let value = row[1].trim().to_string();
            // Last entry wins.
            if let Some(previous) = lookup.values.insert(country.clone(), value.clone()) {
                log_warning(format!(
                    "Auxiliary {}: '{}' listed more than once ({} replaced by {})",
                    year, country, previous, value
                ));
                if !lookup.duplicates.contains(&country) {
                    lookup.duplicates.push(country);
                }
            }
        }
        Ok(lookup)
    }

    /// Countries that appeared on more than one row, after aliasing.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn get(&self, country: &str) -> Option<&str> {
        self.values.get(country).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Reconciled yearly table
// =============================================================================

/// Why a raw column did not survive reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Listed in the schema's drop list.
    YearSpecific,
    /// Not a canonical column and not listed.
    Unmapped,
    /// Native column ignored because the schema joins the auxiliary lookup.
    SupersededByAuxiliary,
}

/// A raw column that was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedColumn {
    /// Column name after normalization and renaming
    pub column: String,
    pub reason: DropReason,
}

/// One year mapped onto [`RECONCILED_COLUMNS`]. Cells are still strings.
#[derive(Debug, Clone)]
pub struct YearTable {
    pub year: i32,
    pub shape: SchemaShape,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub dropped: Vec<DroppedColumn>,
    /// Countries without an auxiliary entry (only under non-fail-fast policies)
    pub auxiliary_gaps: Vec<String>,
}

impl YearTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Map one raw yearly table onto the reconciled column set.
///
/// `auxiliary` must be supplied when the schema joins `dystopia_residual`.
pub fn reconcile_year(
    raw: &RawTable,
    schema: &YearSchema,
    auxiliary: Option<&AuxiliaryLookup>,
    aliases: &CountryAliases,
    policy: AuxJoinPolicy,
) -> ReconcileResult<YearTable> {
    let year = schema.year;
    log_info(format!("Year {}: {} shape, {} rows", year, shape_label(schema.shape), raw.row_count()));

    let normalized = normalize_headers(&raw.headers);
    let renamed: Vec<String> = normalized.iter().map(|h| schema.rename(h).to_string()).collect();

    for (slug, canonical) in normalized.iter().zip(&renamed) {
        if slug != canonical {
            log_info_indent(format!("{} → {}", slug, canonical), 1);
        }
    }

    // Locate canonical columns, classify everything else.
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut dropped = Vec::new();
    for (idx, name) in renamed.iter().enumerate() {
        let is_canonical = RECONCILED_COLUMNS.contains(&name.as_str()) && name != "year";
        if !is_canonical {
            let reason = if schema.is_dropped(name) {
                DropReason::YearSpecific
            } else {
                DropReason::Unmapped
            };
            dropped.push(DroppedColumn {
                column: name.clone(),
                reason,
            });
            continue;
        }
        if name == "dystopia_residual" && schema.needs_auxiliary() {
            dropped.push(DroppedColumn {
                column: name.clone(),
                reason: DropReason::SupersededByAuxiliary,
            });
            continue;
        }
        if positions.insert(name.as_str(), idx).is_some() {
            return Err(ReconcileError::DuplicateColumn {
                year,
                column: name.clone(),
            });
        }
    }

    for column in RECONCILED_COLUMNS {
        let optional = column == "year"
            || column == "region"
            || (column == "dystopia_residual" && schema.needs_auxiliary());
        if !optional && !positions.contains_key(column) {
            return Err(ReconcileError::MissingColumn {
                year,
                column: column.to_string(),
                headers: renamed.clone(),
            });
        }
    }

    log_dropped(&dropped);

    let lookup = if schema.needs_auxiliary() {
        let lookup = auxiliary.ok_or(ReconcileError::MissingAuxiliary(year))?;
        log_info_indent(
            format!("joining dystopia_residual from auxiliary lookup ({} entries)", lookup.len()),
            1,
        );
        Some(lookup)
    } else {
        None
    };

    let country_idx = positions["country"];
    let mut rows = Vec::with_capacity(raw.row_count());
    let mut auxiliary_gaps = Vec::new();

    for row in &raw.rows {
        let country = row[country_idx].trim();

        let dystopia = match lookup {
            None => row[positions["dystopia_residual"]].clone(),
            Some(lookup) => match lookup.get(aliases.canonicalize(country)) {
                Some(value) => value.to_string(),
                None => match policy {
                    AuxJoinPolicy::FailFast => {
                        return Err(ReconcileError::UnjoinableAuxiliaryRow {
                            year,
                            country: country.to_string(),
                        });
                    }
                    AuxJoinPolicy::LeftJoinNull => {
                        log_warning(format!("Year {}: no dystopia_residual for '{}', left empty", year, country));
                        auxiliary_gaps.push(country.to_string());
                        String::new()
                    }
                    AuxJoinPolicy::InnerJoinDrop => {
                        log_warning(format!("Year {}: no dystopia_residual for '{}', row dropped", year, country));
                        auxiliary_gaps.push(country.to_string());
                        continue;
                    }
                },
            },
        };

        let out: Vec<String> = RECONCILED_COLUMNS
            .iter()
            .map(|&column| match column {
                "year" => year.to_string(),
                "dystopia_residual" => dystopia.clone(),
                "country" => country.to_string(),
                other => positions
                    .get(other)
                    .map(|&idx| row[idx].trim().to_string())
                    .unwrap_or_default(),
            })
            .collect();
        rows.push(out);
    }

    log_success(format!("Year {}: {} rows reconciled", year, rows.len()));

    Ok(YearTable {
        year,
        shape: schema.shape,
        headers: RECONCILED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
        dropped,
        auxiliary_gaps,
    })
}

fn shape_label(shape: SchemaShape) -> &'static str {
    match shape {
        SchemaShape::Early => "early",
        SchemaShape::Middle => "middle",
        SchemaShape::Late => "late",
    }
}

fn log_dropped(dropped: &[DroppedColumn]) {
    for col in dropped {
        match col.reason {
            DropReason::YearSpecific => log_info_indent(format!("dropped year-specific column '{}'", col.column), 1),
            DropReason::SupersededByAuxiliary => {
                log_info_indent(format!("ignored native '{}' (auxiliary lookup wins)", col.column), 1)
            }
            DropReason::Unmapped => log_warning(format!("dropped unmapped column '{}'", col.column)),
        }
    }
}

// =============================================================================
// Union
// =============================================================================

/// All years stacked row-wise. Columns are [`RECONCILED_COLUMNS`].
#[derive(Debug, Clone, Default)]
pub struct UnionTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Stack reconciled years. Fails if any year's column set deviates.
pub fn union_years(tables: &[YearTable]) -> ReconcileResult<UnionTable> {
    let expected: Vec<String> = RECONCILED_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut rows = Vec::with_capacity(tables.iter().map(YearTable::row_count).sum());

    for table in tables {
        if table.headers != expected {
            return Err(ReconcileError::SchemaMismatch {
                year: table.year,
                expected,
                found: table.headers.clone(),
            });
        }
        rows.extend(table.rows.iter().cloned());
    }

    Ok(UnionTable {
        headers: expected,
        rows,
    })
}

// =============================================================================
// Typed parsing
// =============================================================================

/// Cells treated as missing numeric values.
const NULL_MARKERS: [&str; 5] = ["", "n/a", "na", "nan", "null"];

/// Parse the union into typed records. `country_code` is left empty for
/// the repair stage.
pub fn into_records(union: &UnionTable) -> ReconcileResult<Vec<CanonicalRecord>> {
    union.rows.iter().map(|row| parse_row(row)).collect()
}

fn parse_row(row: &[String]) -> ReconcileResult<CanonicalRecord> {
    // Column positions follow RECONCILED_COLUMNS.
    let country = row[0].trim().to_string();
    let year: i32 = row[11].trim().parse().map_err(|_| ReconcileError::InvalidValue {
        year: 0,
        country: country.clone(),
        column: "year".into(),
        value: row[11].clone(),
        message: "not an integer".into(),
    })?;

    let cell = |idx: usize| CellContext {
        year,
        country: &country,
        column: RECONCILED_COLUMNS[idx],
        value: row[idx].trim(),
    };

    if country.is_empty() {
        return Err(cell(0).invalid("empty country name"));
    }

    let region = row[1].trim();

    Ok(CanonicalRecord {
        happiness_rank: cell(2).rank()?,
        happiness_score: cell(3).required_number()?,
        gdp_per_capita: cell(4).factor()?,
        family: cell(5).factor()?,
        health_life_expectancy: cell(6).factor()?,
        freedom: cell(7).factor()?,
        perceptions_of_corruption: cell(8).factor()?,
        generosity: cell(9).factor()?,
        dystopia_residual: cell(10).factor()?,
        region: (!region.is_empty()).then(|| region.to_string()),
        country_code: None,
        year,
        country,
    })
}

struct CellContext<'a> {
    year: i32,
    country: &'a str,
    column: &'a str,
    value: &'a str,
}

impl CellContext<'_> {
    fn invalid(&self, message: &str) -> ReconcileError {
        ReconcileError::InvalidValue {
            year: self.year,
            country: self.country.to_string(),
            column: self.column.to_string(),
            value: self.value.to_string(),
            message: message.to_string(),
        }
    }

    fn number(&self) -> ReconcileResult<f64> {
        match self.value.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(self.invalid("not a number")),
        }
    }

    fn required_number(&self) -> ReconcileResult<f64> {
        if self.is_null() {
            return Err(self.invalid("required value is missing"));
        }
        self.number()
    }

    fn rank(&self) -> ReconcileResult<u32> {
        let v = self.required_number()?;
        if v.fract() != 0.0 || v < 1.0 || v > f64::from(u32::MAX) {
            return Err(self.invalid("rank must be a whole number >= 1"));
        }
        Ok(v as u32)
    }

    fn factor(&self) -> ReconcileResult<Option<f64>> {
        if self.is_null() {
            return Ok(None);
        }
        let v = self.number()?;
        if v < 0.0 {
            return Err(self.invalid("contributing factor must be non-negative"));
        }
        Ok(Some(v))
    }

    fn is_null(&self) -> bool {
        NULL_MARKERS.contains(&self.value.to_lowercase().as_str())
    }
}
