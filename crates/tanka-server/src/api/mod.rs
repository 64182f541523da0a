mod listings;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tanka_core::{CategoriesFile, CategoryConfig};
use tanka_pipeline::{Pipeline, PipelineError};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_inbound_gate, request_id, GateLayer, InboundGate, OperationClass, RequestId,
};
use crate::store::ListingStore;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub categories: Arc<CategoriesFile>,
    pub store: ListingStore,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    categories: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "quota_exceeded" => StatusCode::SERVICE_UNAVAILABLE,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn find_category<'a>(
    state: &'a AppState,
    slug: &str,
    request_id: &str,
) -> Result<&'a CategoryConfig, ApiError> {
    state.categories.find(slug).ok_or_else(|| {
        ApiError::new(
            request_id,
            "not_found",
            format!("category '{slug}' not found"),
        )
    })
}

pub(super) fn map_pipeline_error(request_id: String, error: &PipelineError) -> ApiError {
    if error.is_quota() {
        tracing::warn!(error = %error, "outbound scrape quota exhausted");
        return ApiError::new(
            request_id,
            "quota_exceeded",
            "marketplace request quota exhausted; try again later",
        );
    }
    match error {
        PipelineError::Scrape { .. } => {
            tracing::error!(error = %error, "marketplace scrape failed");
            ApiError::new(request_id, "upstream_error", error.to_string())
        }
        PipelineError::ScraperSetup(_) | PipelineError::LlmSetup(_) => {
            tracing::error!(error = %error, "pipeline setup failed");
            ApiError::new(request_id, "internal_error", "pipeline unavailable")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .expose_headers([
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("x-ratelimit-remaining"),
            header::RETRY_AFTER,
        ])
}

fn gated(gate: &InboundGate, class: OperationClass, routes: Router<AppState>) -> Router<AppState> {
    routes.layer(axum::middleware::from_fn_with_state(
        GateLayer {
            gate: gate.clone(),
            class,
        },
        enforce_inbound_gate,
    ))
}

pub fn build_app(state: AppState, gate: &InboundGate) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    let read_routes = Router::new()
        .route("/api/v1/categories", get(listings::list_categories))
        .route(
            "/api/v1/categories/{slug}/listings",
            get(listings::list_listings),
        );
    let rescrape_routes = Router::new().route(
        "/api/v1/categories/{slug}/rescrape",
        post(listings::rescrape_category),
    );
    let refetch_routes = Router::new().route(
        "/api/v1/categories/{slug}/listings/{source_id}/refetch",
        post(listings::refetch_listing),
    );

    Router::new()
        .merge(public_routes)
        .merge(gated(gate, OperationClass::Read, read_routes))
        .merge(gated(gate, OperationClass::FullRescrape, rescrape_routes))
        .merge(gated(gate, OperationClass::RefetchItem, refetch_routes))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData {
            status: "ok",
            categories: state.categories.categories.len(),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
