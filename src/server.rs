//! HTTP server.
//!
//! Exposes the [`QueryService`] as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Version and index availability |
//! | `GET`  | `/search` | Ranked search, filters as query parameters |
//! | `POST` | `/search` | Ranked search, `{ "query", "filter" }` body |
//! | `POST` | `/index/rebuild` | Rebuild the index; plain-text status |
//! | `GET`  | `/patterns?id=` | Full record of one pattern |
//! | `GET`  | `/categories` | Known categories, led by `Any` |
//! | `GET`  | `/categories/{category}/patterns` | Patterns in a category |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no pattern with id: ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `index_unavailable` (503), `internal` (500). Search never errors: a
//! bad, unparsable or unmatched query is an empty list. Rebuild failures
//! are reported in the status text with HTTP 200.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};

use odp_search_core::filter::FilterConfig;
use odp_search_core::models::{PatternRecord, RankedPattern};

use crate::error::OdpError;
use crate::service::{PatternSummary, QueryService};

/// Build the router over a shared service.
pub fn router(service: Arc<QueryService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", get(handle_search_get).post(handle_search_post))
        .route("/index/rebuild", post(handle_rebuild))
        .route("/patterns", get(handle_get_pattern))
        .route("/categories", get(handle_categories))
        .route("/categories/{category}/patterns", get(handle_category_patterns))
        .layer(cors)
        .with_state(service)
}

/// Bind `bind` and serve until the process is terminated.
pub async fn run_server(service: Arc<QueryService>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "ODP search server listening");
    axum::serve(listener, router(service)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

impl From<OdpError> for AppError {
    fn from(e: OdpError) -> Self {
        match e {
            OdpError::IndexUnavailable(_) => AppError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code: "index_unavailable",
                message: e.to_string(),
            },
            other => {
                error!(error = %other, "Request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message: other.to_string(),
                }
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    term_index: bool,
    vector_index: bool,
    generation: Option<String>,
}

async fn handle_health(State(service): State<Arc<QueryService>>) -> Json<HealthResponse> {
    let (term_index, vector_index) = service.availability();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        term_index,
        vector_index,
        generation: service.generation(),
    })
}

// ============ /search ============

/// Query-string form of a search. Flags use their short names.
#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
    category: Option<String>,
    size: Option<String>,
    profile: Option<String>,
    strategy: Option<String>,
    dolce: Option<bool>,
    schema_org: Option<bool>,
    dbpedia: Option<bool>,
}

impl SearchParams {
    fn filter(&self) -> FilterConfig {
        FilterConfig {
            category: self.category.clone(),
            size: self.size.clone(),
            profile: self.profile.clone(),
            strategy: self.strategy.clone(),
            dolce_mapping_required: self.dolce,
            schema_org_mapping_required: self.schema_org,
            dbpedia_mapping_required: self.dbpedia,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    filter: FilterConfig,
}

/// An unparsable request is a bad query, answered with an empty ranking.
fn unparsable(reason: impl std::fmt::Display) -> Json<Vec<RankedPattern>> {
    debug!("{}", OdpError::QueryParse(reason.to_string()));
    Json(Vec::new())
}

async fn handle_search_get(
    State(service): State<Arc<QueryService>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Json<Vec<RankedPattern>> {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rejection) => return unparsable(rejection.body_text()),
    };
    let filter = params.filter();
    Json(service.search(&params.query, &filter).await)
}

/// The body is parsed by hand so that a missing content type or a
/// malformed payload still yields `200 []`.
async fn handle_search_post(
    State(service): State<Arc<QueryService>>,
    body: Bytes,
) -> Json<Vec<RankedPattern>> {
    let req: SearchRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return unparsable(e),
    };
    Json(service.search(&req.query, &req.filter).await)
}

// ============ POST /index/rebuild ============

async fn handle_rebuild(State(service): State<Arc<QueryService>>) -> String {
    service.rebuild().await.to_string()
}

// ============ GET /patterns ============

#[derive(Debug, Deserialize)]
struct PatternParams {
    id: Option<String>,
}

async fn handle_get_pattern(
    State(service): State<Arc<QueryService>>,
    Query(params): Query<PatternParams>,
) -> Result<Json<PatternRecord>, AppError> {
    let id = params
        .id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| bad_request("id must not be empty"))?;
    match service.get_pattern(&id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(not_found(format!("no pattern with id: {id}"))),
    }
}

// ============ /categories ============

async fn handle_categories(State(service): State<Arc<QueryService>>) -> Json<Vec<String>> {
    Json(service.categories().await)
}

async fn handle_category_patterns(
    State(service): State<Arc<QueryService>>,
    Path(category): Path<String>,
) -> Result<Json<Vec<PatternSummary>>, AppError> {
    Ok(Json(service.patterns_by_category(&category).await?))
}
