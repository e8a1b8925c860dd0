//! Transformation module.
//!
//! Raw yearly tables to the canonical table:
//! - Headers: slug normalization
//! - Shapes: per-year rename/drop tables
//! - Reconcile: per-year mapping, union, typed parsing
//! - Repairs: aliases, regions, country codes, ordering
//! - Pipeline: the end-to-end build

pub mod headers;
pub mod pipeline;
pub mod reconcile;
pub mod repairs;
pub mod shapes;

pub use headers::{normalize_header, normalize_headers};
pub use pipeline::{build_dataset, reconcile_sources, BuildOptions, BuildOutcome, BuildReport, YearSource};
pub use reconcile::{reconcile_year, union_years, AuxJoinPolicy, YearTable};
pub use shapes::{SchemaShape, YearSchema};
