//! HTTP server for the dashboard views.
//!
//! The canonical table is loaded once at start-up and shared read-only.
//! Each request recomputes its view from the query parameters.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | GET    | `/api/countries`  | Distinct countries                   |
//! | GET    | `/api/features`   | Feature keys and display names       |
//! | GET    | `/api/years`      | Available years and bounds           |
//! | GET    | `/api/filter`     | Filtered subset                      |
//! | GET    | `/api/averages`   | Per-country means                    |
//! | GET    | `/api/timeseries` | Year-ordered rows with dates         |
//! | GET    | `/api/facets`     | Long-format rows per feature         |
//! | GET    | `/api/map`        | Per-year choropleth frames           |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |
//!
//! View endpoints accept `countries`, `features` and `years`
//! (comma-separated; years collapse to min/max).

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, log_success, log_warning, LOG_BROADCASTER};
use super::types::{error_response, ViewResponse, YearsResponse};
use crate::config::ServerConfig;
use crate::error::{FilterError, ServerError};
use crate::models::CanonicalTable;
use crate::views::{
    aggregate_by_country, feature_catalog, map_frames, reshape_for_facets, time_series, CountryAverage,
    FacetRow, FeatureInfo, MapFrame, Selection, SubsetRow, TimePoint,
};

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Shared, read-only server state.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<CanonicalTable>,
}

/// Query parameters common to every view endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub countries: Option<String>,
    pub features: Option<String>,
    pub years: Option<String>,
}

/// Build the router over a loaded table.
pub fn router(table: Arc<CanonicalTable>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/countries", get(countries))
        .route("/api/features", get(features))
        .route("/api/years", get(years))
        .route("/api/filter", get(filter_view))
        .route("/api/averages", get(averages_view))
        .route("/api/timeseries", get(timeseries_view))
        .route("/api/facets", get(facets_view))
        .route("/api/map", get(map_view))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(AppState { table })
}

/// Load the canonical table and serve until shutdown
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    let table = CanonicalTable::load(&config.data)?;
    if table.is_empty() {
        log_warning(format!("{} contains no rows", config.data.display()));
    }
    log_success(format!(
        "Loaded {} rows ({} countries) from {}",
        table.len(),
        table.countries().len(),
        config.data.display()
    ));

    let app = router(Arc::new(table));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    log_info(format!("🚀 happydash server running on http://localhost:{}", config.port));
    log_info("GET /api/filter | averages | timeseries | facets | map");
    log_info("GET /api/logs - SSE log stream");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "happydash",
        "version": env!("CARGO_PKG_VERSION"),
        "rows": state.table.len()
    }))
}

async fn countries(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.table.countries())
}

async fn features() -> Json<Vec<FeatureInfo>> {
    Json(feature_catalog())
}

async fn years(State(state): State<AppState>) -> Json<YearsResponse> {
    let bounds = state.table.year_bounds();
    Json(YearsResponse {
        years: state.table.years(),
        min: bounds.map(|b| b.start()),
        max: bounds.map(|b| b.end()),
    })
}

fn bad_request(err: FilterError) -> ApiError {
    log_warning(format!("Rejected request: {}", err));
    (StatusCode::BAD_REQUEST, Json(error_response(&err.to_string())))
}

fn parse_selection(state: &AppState, query: &ViewQuery) -> Result<Selection, ApiError> {
    Selection::parse(
        &state.table,
        query.countries.as_deref(),
        query.features.as_deref(),
        query.years.as_deref(),
    )
    .map_err(bad_request)
}

async fn filter_view(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> ApiResult<ViewResponse<SubsetRow>> {
    let selection = parse_selection(&state, &query)?;
    let subset = selection.apply(&state.table);
    Ok(Json(ViewResponse::new("filter", &selection, subset.rows)))
}

async fn averages_view(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<ViewResponse<CountryAverage>> {
    let selection = parse_selection(&state, &query)?;
    let rows = aggregate_by_country(&selection.apply(&state.table));
    Ok(Json(ViewResponse::new("averages", &selection, rows)))
}

async fn timeseries_view(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<ViewResponse<TimePoint>> {
    let selection = parse_selection(&state, &query)?;
    let rows = time_series(&selection.apply(&state.table)).map_err(bad_request)?;
    Ok(Json(ViewResponse::new("timeseries", &selection, rows)))
}

async fn facets_view(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> ApiResult<ViewResponse<FacetRow>> {
    let selection = parse_selection(&state, &query)?;
    let subset = selection.apply(&state.table);
    let rows = reshape_for_facets(&subset, &selection.features).map_err(bad_request)?;
    Ok(Json(ViewResponse::new("facets", &selection, rows)))
}

async fn map_view(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> ApiResult<ViewResponse<MapFrame>> {
    let selection = parse_selection(&state, &query)?;
    let rows = map_frames(&selection.apply(&state.table));
    Ok(Json(ViewResponse::new("map", &selection, rows)))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::fixture_table;

    fn state() -> AppState {
        AppState {
            table: Arc::new(fixture_table()),
        }
    }

    fn query(countries: Option<&str>, features: Option<&str>, years: Option<&str>) -> Query<ViewQuery> {
        Query(ViewQuery {
            countries: countries.map(str::to_string),
            features: features.map(str::to_string),
            years: years.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_filter_canada_2018() {
        let Json(response) = filter_view(State(state()), query(Some("Canada"), Some("happiness_score"), Some("2018,2018")))
            .await
            .unwrap();
        assert_eq!(response.row_count, 1);
        assert_eq!(response.rows[0].happiness_score, 7.328);
        assert_eq!(response.selection.years, [2018, 2018]);
    }

    #[tokio::test]
    async fn test_defaults_cover_whole_table() {
        let Json(response) = filter_view(State(state()), query(None, None, None)).await.unwrap();
        assert_eq!(response.row_count, 18);
        assert_eq!(response.selection.features.len(), 7);
    }

    #[tokio::test]
    async fn test_unknown_feature_is_bad_request() {
        let (status, Json(body)) = filter_view(State(state()), query(None, Some("wealth"), None))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("wealth"));
    }

    #[tokio::test]
    async fn test_bad_years_is_bad_request() {
        let (status, _) = averages_view(State(state()), query(None, None, Some("last year")))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_averages_and_facets() {
        let Json(averages) = averages_view(State(state()), query(None, Some("freedom"), None)).await.unwrap();
        assert_eq!(averages.row_count, 6);

        let Json(facets) = facets_view(State(state()), query(Some("Canada"), Some("freedom,family"), None))
            .await
            .unwrap();
        assert_eq!(facets.row_count, 10);
    }

    #[tokio::test]
    async fn test_timeseries_and_map() {
        let Json(series) = timeseries_view(State(state()), query(Some("Switzerland"), None, None)).await.unwrap();
        let years: Vec<i32> = series.rows.iter().map(|p| p.row.year).collect();
        assert_eq!(years, vec![2015, 2016, 2017, 2018, 2019]);

        let Json(map) = map_view(State(state()), query(None, None, Some("2019"))).await.unwrap();
        assert_eq!(map.row_count, 1);
        assert_eq!(map.rows[0].points.len(), 3);
    }

    #[tokio::test]
    async fn test_control_options() {
        let Json(names) = countries(State(state())).await;
        assert!(names.contains(&"Hong Kong".to_string()));
        assert!(!names.contains(&"Hong Kong S.A.R., China".to_string()));

        let Json(span) = years(State(state())).await;
        assert_eq!((span.min, span.max), (Some(2015), Some(2019)));

        let Json(catalog) = features().await;
        assert_eq!(catalog.len(), 9);
    }

    #[test]
    fn test_router_builds() {
        let _ = router(Arc::new(CanonicalTable::default()));
    }
}
