//! Error types for the happydash builder and view layer.
//!
//! The hierarchy mirrors the processing stages:
//!
//! - [`CsvError`] - reading and decoding raw or canonical CSV files
//! - [`ReconcileError`] - per-year schema reconciliation
//! - [`RegistryError`] - stored schema registry
//! - [`ValidationError`] - canonical record validation
//! - [`ConfigError`] - environment / flag configuration
//! - [`FilterError`] - view requests (unknown feature, bad year range)
//! - [`BuildError`] - top-level dataset build
//! - [`ServerError`] - HTTP server start-up
//!
//! Lower layers convert into [`BuildError`] via `From`, so `?` works across
//! stage boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading a CSV file.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV.
    #[error("Invalid CSV at line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// Low-level csv crate error (canonical table reading/writing).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// Reconciliation Errors
// =============================================================================

/// Errors while mapping one raw yearly table onto the canonical schema.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No schema is known for this year.
    #[error("No schema registered for year {0}")]
    UnsupportedYear(i32),

    /// A canonical column is missing after renaming.
    #[error("Year {year}: missing column '{column}' after renaming (headers: {headers:?})")]
    MissingColumn {
        year: i32,
        column: String,
        headers: Vec<String>,
    },

    /// Two raw headers map onto the same canonical column.
    #[error("Year {year}: column '{column}' appears more than once after renaming")]
    DuplicateColumn { year: i32, column: String },

    /// A country has no row in the auxiliary dystopia-residual lookup.
    #[error("Year {year}: no dystopia_residual entry for country '{country}'")]
    UnjoinableAuxiliaryRow { year: i32, country: String },

    /// Year needs an auxiliary lookup but none was supplied.
    #[error("Year {0}: dystopia_residual must be joined but no auxiliary table was given")]
    MissingAuxiliary(i32),

    /// A lookup table (auxiliary, aliases, country codes) is not two-column.
    #[error("Lookup table '{name}' must have 2 columns, found {found}")]
    MalformedLookup { name: String, found: usize },

    /// A cell could not be interpreted.
    #[error("Year {year}, country '{country}', column '{column}': invalid value '{value}' ({message})")]
    InvalidValue {
        year: i32,
        country: String,
        column: String,
        value: String,
        message: String,
    },

    /// Per-year tables disagree on their column set at union time.
    #[error("Year {year}: column set {found:?} differs from {expected:?}")]
    SchemaMismatch {
        year: i32,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors from the stored schema registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Schema not found.
    #[error("Schema not found: {0}")]
    NotFound(String),

    /// Invalid schema data.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// IO error.
    #[error("Registry IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Registry JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors from canonical table validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Records failed the JSON schema.
    #[error("{} record(s) failed validation; first: {}", .failures.len(), first_failure(.failures))]
    SchemaError { failures: Vec<(usize, Vec<String>)> },

    /// The embedded schema itself could not be compiled.
    #[error("Invalid embedded schema: {0}")]
    InvalidSchema(String),

    /// A table-level invariant does not hold.
    #[error("Table invariant violated: {0}")]
    Invariant(String),
}

fn first_failure(failures: &[(usize, Vec<String>)]) -> String {
    failures
        .first()
        .map(|(idx, errs)| format!("record {}: {}", idx, errs.join("; ")))
        .unwrap_or_default()
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable or flag holds an unusable value.
    #[error("Invalid value '{value}' for {key}: {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

// =============================================================================
// Filter Errors
// =============================================================================

/// Errors from view requests.
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    /// Feature key or label not recognized.
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Facet requested for a feature that the subset does not carry.
    #[error("Feature '{0}' is not part of the filtered subset")]
    FeatureNotSelected(String),

    /// Year range could not be built.
    #[error("Invalid year range: {0}")]
    InvalidYearRange(String),

    /// Year cannot be represented as a calendar date.
    #[error("Year {0} cannot be converted to a date")]
    InvalidYear(i32),
}

// =============================================================================
// Build Errors (top-level)
// =============================================================================

/// Top-level dataset build errors.
///
/// Returned by [`crate::transform::pipeline::build_dataset`]. Any of these
/// aborts the whole build before the output file is touched.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Raw file for a requested year does not exist.
    #[error("Missing source file for year {year}: {}", .path.display())]
    MissingSourceFile { year: i32, path: PathBuf },

    /// Auxiliary dystopia-residual file for a year does not exist.
    #[error("Missing auxiliary file for year {year}: {}", .path.display())]
    MissingAuxiliaryFile { year: i32, path: PathBuf },

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Reconciliation error.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Registry error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Two rows share a (country, year) key after alias repair.
    #[error("Duplicate record for country '{country}' in year {year}")]
    DuplicateRecord { country: String, year: i32 },

    /// No years were requested.
    #[error("No years to build")]
    EmptyInput,

    /// Writing the output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Canonical table could not be loaded.
    #[error("Failed to load canonical table: {0}")]
    Load(#[from] CsvError),

    /// Bind or serve failure.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for reconciliation.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for view requests.
pub type FilterResult<T> = Result<T, FilterError>;

/// Result type for the dataset build.
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> BuildError
        let csv_err = CsvError::EmptyFile;
        let build_err: BuildError = csv_err.into();
        assert!(build_err.to_string().contains("empty"));

        // ReconcileError -> BuildError
        let err = ReconcileError::UnjoinableAuxiliaryRow {
            year: 2018,
            country: "Atlantis".into(),
        };
        let build_err: BuildError = err.into();
        let msg = build_err.to_string();
        assert!(msg.contains("2018"));
        assert!(msg.contains("Atlantis"));
    }

    #[test]
    fn test_missing_source_names_year_and_path() {
        let err = BuildError::MissingSourceFile {
            year: 2016,
            path: PathBuf::from("data/raw/2016.csv"),
        };
        let msg = err.to_string();
        assert!(msg.contains("2016"));
        assert!(msg.contains("data/raw/2016.csv"));
    }

    #[test]
    fn test_validation_error_format() {
        let err = ValidationError::SchemaError {
            failures: vec![(3, vec!["freedom is less than 0".into()])],
        };
        let msg = err.to_string();
        assert!(msg.contains("1 record(s)"));
        assert!(msg.contains("record 3"));
        assert!(msg.contains("freedom"));
    }
}
