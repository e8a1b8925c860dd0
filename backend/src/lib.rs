//! # happydash - World Happiness Report dataset builder and view API
//!
//! happydash reconciles the yearly World Happiness Report releases, whose
//! headers and column sets changed over time, into one canonical table and
//! serves filter/aggregate views of it to a dashboard.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Yearly CSVs │────▶│   Parser    │────▶│  Reconcile  │────▶│  Canonical  │
//! │ (ISO/UTF8)  │     │ (auto-enc)  │     │  + repairs  │     │     CSV     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                     │
//!                            ┌─────────────┐     ┌─────────────┐      │
//!                            │  HTTP/JSON  │◀────│    Views    │◀─────┘
//!                            │   (axum)    │     │ (pure fns)  │
//!                            └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use happydash::{build_dataset, BuildConfig, SchemaCatalog};
//!
//! let report = build_dataset(&BuildConfig::default(), &SchemaCatalog::builtin()).unwrap();
//! println!("Wrote {} rows", report.total_rows);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Canonical record, table, features, year range
//! - [`parser`] - CSV parsing with encoding/delimiter detection
//! - [`transform`] - Header normalization, per-year reconciliation, repairs, pipeline
//! - [`validation`] - Canonical record schema validation
//! - [`registry`] - Stored per-year schemas
//! - [`views`] - Filter, averages, time series, facets, map frames
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Schema storage
pub mod registry;

// Views
pub mod views;

// HTTP API
pub mod api;

#[cfg(test)]
mod fixtures;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BuildError, ConfigError, CsvError, FilterError, ReconcileError, RegistryError, ServerError, ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CanonicalRecord, CanonicalTable, Feature, YearRange, CANONICAL_COLUMNS};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_str, read_csv_file, RawTable};

// =============================================================================
// Re-exports - Reconciliation
// =============================================================================

pub use transform::headers::{normalize_header, normalize_headers};
pub use transform::reconcile::{
    into_records, reconcile_year, union_years, AuxJoinPolicy, AuxiliaryLookup, DropReason, DroppedColumn, YearTable,
};
pub use transform::repairs::{rebuild_regions, CountryAliases, CountryCodeLookup, RegionRepair};
pub use transform::shapes::{SchemaShape, YearSchema, SUPPORTED_YEARS};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{build_dataset, reconcile_sources, BuildOptions, BuildOutcome, BuildReport, YearSource};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid, validate, validate_canonical_record, validate_records};

// =============================================================================
// Re-exports - Registry
// =============================================================================

pub use registry::{SchemaCatalog, SchemaRegistry, StoredSchema};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::{BuildConfig, ServerConfig};

// =============================================================================
// Re-exports - Views
// =============================================================================

pub use views::{
    aggregate_by_country, feature_catalog, filter, map_frames, reshape_for_facets, time_series, Selection, Subset,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, SelectionEcho, ViewResponse};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
