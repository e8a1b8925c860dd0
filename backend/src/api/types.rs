//! REST API response types.
//!
//! Every view endpoint answers with the same envelope: a request id, the
//! selection it was computed for, a row count and the rows.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::views::Selection;

/// Envelope for a computed view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse<T> {
    /// Unique request identifier
    pub request_id: String,
    /// Always "ok"; errors use [`error_response`]
    pub status: &'static str,
    /// View name ("filter", "averages", ...)
    pub view: &'static str,
    pub selection: SelectionEcho,
    pub row_count: usize,
    pub rows: Vec<T>,
}

impl<T> ViewResponse<T> {
    pub fn new(view: &'static str, selection: &Selection, rows: Vec<T>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            status: "ok",
            view,
            selection: SelectionEcho::from(selection),
            row_count: rows.len(),
            rows,
        }
    }
}

/// The selection as echoed back to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEcho {
    pub countries: Vec<String>,
    /// Feature keys
    pub features: Vec<&'static str>,
    /// `[start, end]`, inclusive
    pub years: [i32; 2],
}

impl From<&Selection> for SelectionEcho {
    fn from(selection: &Selection) -> Self {
        Self {
            countries: selection.countries.clone(),
            features: selection.features.iter().map(|f| f.key()).collect(),
            years: [selection.years.start(), selection.years.end()],
        }
    }
}

/// Years present in the table, for the range slider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearsResponse {
    pub years: Vec<i32>,
    pub min: Option<i32>,
    pub max: Option<i32>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "requestId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "rowCount": 0,
        "rows": []
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feature, YearRange};

    #[test]
    fn test_envelope_fields() {
        let selection = Selection {
            countries: vec!["Canada".into()],
            features: vec![Feature::Freedom],
            years: YearRange::new(2019, 2015),
        };
        let response = ViewResponse::new("filter", &selection, vec![1, 2, 3]);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["rowCount"], 3);
        assert_eq!(json["selection"]["years"], json!([2015, 2019]));
        assert_eq!(json["selection"]["features"], json!(["freedom"]));
        assert!(Uuid::parse_str(json["requestId"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_error_response() {
        let json = error_response("Unknown feature: wealth");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "Unknown feature: wealth");
        assert_eq!(json["rows"], json!([]));
    }
}
