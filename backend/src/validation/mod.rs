//! JSON Schema validation for canonical records.
//!
//! The record schema is embedded at compile time from
//! `schemas/canonical-record.json` (Draft 7). It pins the column set
//! (`additionalProperties: false`), requires non-negative factors that may
//! be `null`, a rank of at least 1 and a three-letter upper-case country
//! code when present.
//!
//! Table-level rules that a per-record schema cannot express (one row per
//! `(country, year)`) are checked by [`validate_records`].
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use happydash::validation::validate;
//!
//! let schema = json!({
//!     "type": "object",
//!     "required": ["name"],
//!     "properties": { "name": { "type": "string" } }
//! });
//! assert!(validate(&schema, &json!({ "name": "test" })).is_ok());
//! assert!(validate(&schema, &json!({ "age": 42 })).is_err());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::models::CanonicalRecord;

static CANONICAL_RECORD_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/canonical-record.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a schema.
///
/// Returns every error message when invalid.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Boolean form of [`validate`].
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// The embedded canonical record schema.
pub fn canonical_record_schema() -> &'static Value {
    &CANONICAL_RECORD_SCHEMA
}

/// Validate one record (as JSON) against the canonical schema.
pub fn validate_canonical_record(data: &Value) -> Result<(), Vec<String>> {
    validate(canonical_record_schema(), data)
}

/// Validate a whole table: every record against the schema, then
/// `(country, year)` uniqueness.
///
/// The validator is compiled once for the table.
pub fn validate_records(records: &[CanonicalRecord]) -> Result<(), ValidationError> {
    let validator = jsonschema::draft7::new(canonical_record_schema())
        .map_err(|e| ValidationError::InvalidSchema(e.to_string()))?;

    let mut failures = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let value = serde_json::to_value(record)
            .map_err(|e| ValidationError::Invariant(format!("record {} not serializable: {}", idx, e)))?;
        let errors: Vec<String> = validator
            .iter_errors(&value)
            .map(|e| format!("{} ({} {})", e, record.country, record.year))
            .collect();
        if !errors.is_empty() {
            failures.push((idx, errors));
        }
    }
    if !failures.is_empty() {
        return Err(ValidationError::SchemaError { failures });
    }

    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert((record.country.as_str(), record.year)) {
            return Err(ValidationError::Invariant(format!(
                "duplicate (country, year): ({}, {})",
                record.country, record.year
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_record() -> Value {
        json!({
            "country": "Canada",
            "year": 2018,
            "happiness_rank": 7,
            "happiness_score": 7.328,
            "gdp_per_capita": 1.33,
            "family": 1.532,
            "health_life_expectancy": 0.896,
            "freedom": 0.653,
            "perceptions_of_corruption": 0.291,
            "generosity": 0.321,
            "dystopia_residual": 2.2,
            "region": "North America",
            "country_code": "CAN"
        })
    }

    fn record() -> CanonicalRecord {
        serde_json::from_value(valid_record()).unwrap()
    }

    #[test]
    fn test_valid_record() {
        assert!(validate_canonical_record(&valid_record()).is_ok());
    }

    #[test]
    fn test_nulls_allowed_for_factors_region_and_code() {
        let mut data = valid_record();
        data["perceptions_of_corruption"] = Value::Null;
        data["region"] = Value::Null;
        data["country_code"] = Value::Null;
        assert!(validate_canonical_record(&data).is_ok());
    }

    #[test]
    fn test_negative_factor_rejected() {
        let mut data = valid_record();
        data["generosity"] = json!(-0.1);
        let errors = validate_canonical_record(&data).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_rank_zero_rejected() {
        let mut data = valid_record();
        data["happiness_rank"] = json!(0);
        assert!(validate_canonical_record(&data).is_err());
    }

    #[test]
    fn test_extra_column_rejected() {
        let mut data = valid_record();
        data["standard_error"] = json!(0.03);
        assert!(validate_canonical_record(&data).is_err());
    }

    #[test]
    fn test_lowercase_code_rejected() {
        let mut data = valid_record();
        data["country_code"] = json!("can");
        assert!(!is_valid(canonical_record_schema(), &data));
    }

    #[test]
    fn test_validate_records_reports_index() {
        let mut bad = record();
        bad.freedom = Some(-1.0);
        let err = validate_records(&[record(), bad]).unwrap_err();
        match err {
            ValidationError::SchemaError { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_records_rejects_duplicates() {
        let err = validate_records(&[record(), record()]).unwrap_err();
        assert!(matches!(err, ValidationError::Invariant(ref msg) if msg.contains("Canada")));
    }
}
