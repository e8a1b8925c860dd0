//! Dataset build pipeline: raw yearly files to the canonical CSV.
//!
//! [`build_dataset`] is the entry point used by the CLI. It:
//! 1. Resolves every year's schema and checks all input files exist
//! 2. Reads and decodes the raw tables (auto-detected encoding/delimiter)
//! 3. Reconciles each year and stacks them
//! 4. Applies aliases, rebuilds regions and joins country codes
//! 5. Validates the table against the canonical record schema
//! 6. Writes the output through a temporary file
//!
//! Steps 3–5 are also available without any file-system access through
//! [`reconcile_sources`].
//!
//! # Example
//!
//! ```rust,ignore
//! use happydash::config::BuildConfig;
//! use happydash::registry::SchemaCatalog;
//! use happydash::transform::pipeline::build_dataset;
//!
//! let report = build_dataset(&BuildConfig::from_env()?, &SchemaCatalog::builtin())?;
//! println!("Wrote {} rows", report.total_rows);
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::reconcile::{
    into_records, reconcile_year, union_years, AuxJoinPolicy, AuxiliaryLookup, DroppedColumn, YearTable,
};
use super::repairs::{
    find_duplicate, join_country_codes, log_alias_summary, rebuild_regions, rows_per_year, sort_records,
    CountryAliases, CountryCodeLookup, RegionRepair,
};
use super::shapes::{SchemaShape, YearSchema};
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::models::CanonicalTable;
use crate::parser::{read_csv_file, RawTable};
use crate::registry::SchemaCatalog;
use crate::validation::validate_records;

/// Lookups and policy shared by every year of a build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub aliases: CountryAliases,
    pub country_codes: Option<CountryCodeLookup>,
    pub aux_policy: AuxJoinPolicy,
}

/// One year's inputs, already read.
#[derive(Debug, Clone)]
pub struct YearSource {
    pub schema: YearSchema,
    pub table: RawTable,
    pub auxiliary: Option<RawTable>,
}

/// Per-year part of the build report.
#[derive(Debug, Clone, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub shape: SchemaShape,
    pub encoding: String,
    pub delimiter: char,
    pub source_rows: usize,
    pub output_rows: usize,
    pub dropped: Vec<DroppedColumn>,
    pub auxiliary_gaps: Vec<String>,
}

/// What a build did, for logging and the CLI's JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Written file (absent for in-memory builds)
    pub output: Option<PathBuf>,
    pub total_rows: usize,
    pub aux_policy: AuxJoinPolicy,
    pub years: Vec<YearSummary>,
    pub aliases_applied: usize,
    pub regions: RegionRepair,
    /// Countries left without a code (empty when no lookup was given)
    pub missing_country_codes: Vec<String>,
    pub rows_per_year: BTreeMap<i32, usize>,
}

/// Canonical table plus its report.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub table: CanonicalTable,
    pub report: BuildReport,
}

/// Reconcile already-read sources into a validated canonical table.
pub fn reconcile_sources(sources: &[YearSource], options: &BuildOptions) -> BuildResult<BuildOutcome> {
    if sources.is_empty() {
        return Err(BuildError::EmptyInput);
    }

    // Step 1: per-year reconciliation
    log_info("🔄 Reconciling yearly tables...");
    let mut tables: Vec<YearTable> = Vec::with_capacity(sources.len());
    let mut summaries = Vec::with_capacity(sources.len());
    for source in sources {
        let year = source.schema.year;
        let lookup = source
            .auxiliary
            .as_ref()
            .map(|raw| AuxiliaryLookup::from_raw(year, raw, &options.aliases))
            .transpose()?;

        let table = reconcile_year(&source.table, &source.schema, lookup.as_ref(), &options.aliases, options.aux_policy)?;
        summaries.push(YearSummary {
            year,
            shape: table.shape,
            encoding: source.table.encoding.clone(),
            delimiter: source.table.delimiter,
            source_rows: source.table.row_count(),
            output_rows: table.row_count(),
            dropped: table.dropped.clone(),
            auxiliary_gaps: table.auxiliary_gaps.clone(),
        });
        tables.push(table);
    }

    // Step 2: union and typed parse
    let union = union_years(&tables)?;
    log_success(format!("Union: {} rows across {} years", union.rows.len(), tables.len()));
    let mut records = into_records(&union)?;

    // Step 3: repairs
    log_info("🩹 Repairing country names and regions...");
    let aliases_applied = options.aliases.apply(&mut records);
    log_alias_summary(aliases_applied, &options.aliases);

    if let Some((country, year)) = find_duplicate(&records) {
        log_error(format!("Duplicate record: {} ({})", country, year));
        return Err(BuildError::DuplicateRecord { country, year });
    }

    let regions = rebuild_regions(&mut records);

    let missing_country_codes = match &options.country_codes {
        Some(lookup) => {
            let missing = join_country_codes(&mut records, lookup);
            log_success(format!("Country codes: {} lookup entries, {} countries unmatched", lookup.len(), missing.len()));
            missing
        }
        None => {
            log_warning("No country-code lookup given; country_code left empty");
            Vec::new()
        }
    };

    sort_records(&mut records);

    // Step 4: validation
    log_info("✔️  Validating canonical records...");
    validate_records(&records)?;
    log_success(format!("All {} records valid", records.len()));

    let report = BuildReport {
        output: None,
        total_rows: records.len(),
        aux_policy: options.aux_policy,
        years: summaries,
        aliases_applied,
        regions,
        missing_country_codes,
        rows_per_year: rows_per_year(&records),
    };

    Ok(BuildOutcome {
        table: CanonicalTable::new(records),
        report,
    })
}

/// Run the full build described by `config` and write the canonical CSV.
///
/// Nothing is written unless every step succeeds; an existing output file
/// is only replaced at the very end.
pub fn build_dataset(config: &BuildConfig, catalog: &SchemaCatalog) -> BuildResult<BuildReport> {
    if config.years.is_empty() {
        return Err(BuildError::EmptyInput);
    }

    log_info(format!("📖 Building dataset from {}", config.raw_dir.display()));

    // Preflight: every schema and file before any processing.
    let mut plan = Vec::with_capacity(config.years.len());
    for &year in &config.years {
        let schema = catalog.resolve(year)?;
        let source = config.source_path(year);
        if !source.is_file() {
            return Err(BuildError::MissingSourceFile { year, path: source });
        }
        let auxiliary = if schema.needs_auxiliary() {
            let path = config.auxiliary_path(year);
            if !path.is_file() {
                return Err(BuildError::MissingAuxiliaryFile { year, path });
            }
            Some(path)
        } else {
            None
        };
        plan.push((schema, source, auxiliary));
    }

    let mut options = BuildOptions {
        aux_policy: config.aux_policy,
        ..BuildOptions::default()
    };
    if let Some(path) = &config.aliases {
        let added = options.aliases.extend_from_raw(&read_csv_file(path)?)?;
        log_info(format!("Loaded {} extra aliases from {}", added, path.display()));
    }
    if let Some(path) = config.country_codes_path() {
        options.country_codes = Some(CountryCodeLookup::from_raw(&read_csv_file(&path)?, &options.aliases)?);
    }

    let mut sources = Vec::with_capacity(plan.len());
    for (schema, source, auxiliary) in plan {
        let table = read_csv_file(&source)?;
        log_success(format!(
            "{}: encoding {}, separator '{}', {} rows",
            source.display(),
            table.encoding,
            table.delimiter,
            table.row_count()
        ));
        let auxiliary = auxiliary.as_deref().map(read_csv_file).transpose()?;
        sources.push(YearSource {
            schema,
            table,
            auxiliary,
        });
    }

    let BuildOutcome { table, mut report } = reconcile_sources(&sources, &options)?;

    write_atomically(&table, &config.output)?;
    log_success(format!("💾 Wrote {} rows to {}", table.len(), config.output.display()));

    report.output = Some(config.output.clone());
    Ok(report)
}

/// Write to a sibling temporary file, then rename over `path`.
pub fn write_atomically(table: &CanonicalTable, path: &Path) -> BuildResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("canonical.csv");
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    let written = fs::File::create(&tmp)
        .map_err(BuildError::from)
        .and_then(|file| table.write_csv(BufWriter::new(file)).map_err(BuildError::from));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::models::{Feature, YearRange};
    use crate::views::filter;
    use tempfile::tempdir;

    fn fixture_sources() -> Vec<YearSource> {
        fixtures::ROWS_PER_YEAR
            .iter()
            .map(|&(year, _)| YearSource {
                schema: YearSchema::builtin(year).unwrap(),
                table: fixtures::raw_year(year),
                auxiliary: fixtures::raw_auxiliary(year),
            })
            .collect()
    }

    fn fixture_options() -> BuildOptions {
        let aliases = CountryAliases::default();
        let country_codes = CountryCodeLookup::from_raw(&fixtures::raw_country_codes(), &aliases).unwrap();
        BuildOptions {
            aliases,
            country_codes: Some(country_codes),
            aux_policy: AuxJoinPolicy::FailFast,
        }
    }

    fn config_for(dir: &Path) -> BuildConfig {
        BuildConfig {
            raw_dir: dir.join("raw"),
            output: dir.join("processed").join("summary_df.csv"),
            schema_dir: dir.join("schemas"),
            ..BuildConfig::default()
        }
    }

    #[test]
    fn test_row_count_is_sum_of_years() {
        let outcome = reconcile_sources(&fixture_sources(), &fixture_options()).unwrap();
        let expected: usize = fixtures::ROWS_PER_YEAR.iter().map(|(_, n)| n).sum();
        assert_eq!(outcome.table.len(), expected);
        assert_eq!(outcome.report.total_rows, expected);
        for (year, n) in fixtures::ROWS_PER_YEAR {
            assert_eq!(outcome.report.rows_per_year[&year], n);
        }
    }

    #[test]
    fn test_hong_kong_alias_everywhere() {
        let outcome = reconcile_sources(&fixture_sources(), &fixture_options()).unwrap();
        let records = outcome.table.records();
        assert!(records.iter().all(|r| r.country != "Hong Kong S.A.R., China"));
        assert!(records.iter().all(|r| r.country != "Somaliland region"));

        let hong_kong: Vec<_> = records.iter().filter(|r| r.country == "Hong Kong").collect();
        assert_eq!(hong_kong.len(), 4);
        assert!(hong_kong.iter().all(|r| r.region.as_deref() == Some("Eastern Asia")));
        assert!(hong_kong.iter().all(|r| r.country_code.as_deref() == Some("HKG")));
        assert_eq!(outcome.report.aliases_applied, 2);
    }

    #[test]
    fn test_repairs_are_reported() {
        let outcome = reconcile_sources(&fixture_sources(), &fixture_options()).unwrap();
        assert_eq!(outcome.report.regions.unresolved, vec!["United Arab Emirates"]);
        assert_eq!(outcome.report.missing_country_codes, vec!["Somaliland Region"]);

        let somaliland = outcome.table.records().iter().find(|r| r.country == "Somaliland Region").unwrap();
        assert_eq!(somaliland.region.as_deref(), Some("Sub-Saharan Africa"));

        let early = &outcome.report.years[0];
        assert_eq!(early.year, 2015);
        assert_eq!(early.dropped.len(), 1);
        assert_eq!(early.dropped[0].column, "standard_error");
    }

    #[test]
    fn test_canada_2018_score() {
        let outcome = reconcile_sources(&fixture_sources(), &fixture_options()).unwrap();
        let subset = filter(
            &outcome.table,
            &["Canada".to_string()],
            &[Feature::HappinessScore],
            YearRange::new(2018, 2018),
        );
        assert_eq!(subset.rows.len(), 1);
        assert_eq!(subset.rows[0].happiness_score, 7.328);
    }

    #[test]
    fn test_output_sorted_by_year_then_rank() {
        let outcome = reconcile_sources(&fixture_sources(), &fixture_options()).unwrap();
        let keys: Vec<(i32, u32)> = outcome
            .table
            .records()
            .iter()
            .map(|r| (r.year, r.happiness_rank))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_duplicate_after_alias_is_fatal() {
        let mut sources = fixture_sources();
        let mut raw = sources[2].table.clone();
        let mut dup = raw.rows[2].clone();
        dup[0] = "Hong Kong".into();
        raw.rows.push(dup);
        sources[2].table = raw;

        let err = reconcile_sources(&sources, &fixture_options()).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateRecord { ref country, year: 2017 } if country == "Hong Kong"));
    }

    #[test]
    fn test_accented_country_joins_auxiliary() {
        let source = "\
Overall rank,Country or region,Score,GDP per capita,Social support,Healthy life expectancy,Freedom to make life choices,Generosity,Perceptions of corruption
7,Canada,7.328,1.33,1.532,0.896,0.653,0.321,0.291
88,Curaçao,5.1,1.2,1.1,0.8,0.4,0.2,0.1
";
        let aux = "country,dystopia_residual\nCanada,2.2\nCuraçao,1.5\n";
        let sources = vec![YearSource {
            schema: YearSchema::builtin(2018).unwrap(),
            table: crate::parser::parse_bytes_auto(source.as_bytes()).unwrap(),
            auxiliary: Some(crate::parser::parse_bytes_auto(aux.as_bytes()).unwrap()),
        }];

        let outcome = reconcile_sources(&sources, &BuildOptions::default()).unwrap();
        let curacao = outcome.table.records().iter().find(|r| r.country == "Curaçao").unwrap();
        assert_eq!(curacao.dystopia_residual, Some(1.5));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            reconcile_sources(&[], &BuildOptions::default()),
            Err(BuildError::EmptyInput)
        ));
    }

    #[test]
    fn test_build_dataset_writes_canonical_csv() {
        let dir = tempdir().unwrap();
        fixtures::write_raw_dir(&dir.path().join("raw"));
        let config = config_for(dir.path());

        let report = build_dataset(&config, &SchemaCatalog::builtin()).unwrap();
        assert_eq!(report.output.as_deref(), Some(config.output.as_path()));

        let table = CanonicalTable::load(&config.output).unwrap();
        assert_eq!(table.len(), 18);
        assert_eq!(table.years(), vec![2015, 2016, 2017, 2018, 2019]);

        let header = fs::read_to_string(&config.output).unwrap().lines().next().unwrap().to_string();
        assert_eq!(
            header,
            "country,year,happiness_rank,happiness_score,gdp_per_capita,family,health_life_expectancy,freedom,perceptions_of_corruption,generosity,dystopia_residual,region,country_code"
        );
    }

    #[test]
    fn test_missing_year_file_writes_nothing() {
        let dir = tempdir().unwrap();
        fixtures::write_raw_dir(&dir.path().join("raw"));
        fs::remove_file(dir.path().join("raw").join("2016.csv")).unwrap();
        let config = config_for(dir.path());

        let err = build_dataset(&config, &SchemaCatalog::builtin()).unwrap_err();
        match err {
            BuildError::MissingSourceFile { year, path } => {
                assert_eq!(year, 2016);
                assert!(path.ends_with("2016.csv"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!config.output.exists());
    }

    #[test]
    fn test_missing_auxiliary_file_is_fatal() {
        let dir = tempdir().unwrap();
        fixtures::write_raw_dir(&dir.path().join("raw"));
        fs::remove_file(dir.path().join("raw").join("2019_dystopia.csv")).unwrap();

        let err = build_dataset(&config_for(dir.path()), &SchemaCatalog::builtin()).unwrap_err();
        assert!(matches!(err, BuildError::MissingAuxiliaryFile { year: 2019, .. }));
    }

    #[test]
    fn test_failed_build_keeps_previous_output() {
        let dir = tempdir().unwrap();
        fixtures::write_raw_dir(&dir.path().join("raw"));
        let config = config_for(dir.path());
        build_dataset(&config, &SchemaCatalog::builtin()).unwrap();
        let before = fs::read_to_string(&config.output).unwrap();

        // Canada missing from the 2018 lookup under fail-fast.
        fs::write(
            dir.path().join("raw").join("2018_dystopia.csv"),
            "country,dystopia_residual\nSwitzerland,2.05\n",
        )
        .unwrap();
        let err = build_dataset(&config, &SchemaCatalog::builtin()).unwrap_err();
        assert!(err.to_string().contains("2018"));
        assert_eq!(fs::read_to_string(&config.output).unwrap(), before);
    }

    #[test]
    fn test_unsupported_year_without_stored_schema() {
        let dir = tempdir().unwrap();
        fixtures::write_raw_dir(&dir.path().join("raw"));
        let config = BuildConfig {
            years: vec![2020],
            ..config_for(dir.path())
        };
        let err = build_dataset(&config, &SchemaCatalog::builtin()).unwrap_err();
        assert!(err.to_string().contains("2020"));
    }
}
