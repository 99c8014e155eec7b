use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use scout_core::error::AppError;
use scout_core::models::DiscoveryRequest;
use scout_core::traits::{ChatModel, Cleaner, CredentialProvider, Fetcher, SearchEngine};

use crate::dto::{DiscoverJobsRequest, DiscoverJobsResponse, HealthResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router<F, C, M, S>(state: Arc<AppState<F, C, M, S>>) -> Router
where
    F: Fetcher,
    C: Cleaner,
    M: ChatModel,
    S: SearchEngine,
{
    Router::new()
        .route("/v1/discover", post(discover_jobs::<F, C, M, S>))
        .route("/health", get(health::<F, C, M, S>))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/discover",
    request_body = DiscoverJobsRequest,
    responses(
        (status = 200, description = "Ranked jobs with run diagnostics", body = DiscoverJobsResponse),
        (status = 400, description = "Request out of bounds", body = crate::dto::ErrorResponse),
        (status = 500, description = "Discovery failed unexpectedly", body = crate::dto::ErrorResponse),
        (status = 503, description = "No API key available", body = crate::dto::ErrorResponse),
    ),
    tag = "discovery"
)]
pub async fn discover_jobs<F, C, M, S>(
    State(state): State<Arc<AppState<F, C, M, S>>>,
    axum::Json(body): axum::Json<DiscoverJobsRequest>,
) -> Result<axum::Json<DiscoverJobsResponse>, ApiError>
where
    F: Fetcher,
    C: Cleaner,
    M: ChatModel,
    S: SearchEngine,
{
    let request = DiscoveryRequest::from(body);
    request.validate()?;

    // Acquired here rather than through `DiscoveryService::run`: the key has
    // to be known to cool it down if the pipeline task dies.
    let key = state.keys.acquire().ok_or(AppError::NoCredential)?;

    // Run on its own task so a panic inside the pipeline surfaces as a
    // JoinError instead of tearing down the connection.
    let task_state = Arc::clone(&state);
    let task_key = key.clone();
    let outcome = tokio::spawn(async move {
        task_state.service.discover(&request, &task_key).await
    })
    .await;

    match outcome {
        Ok(result) => Ok(axum::Json(DiscoverJobsResponse::from(result))),
        Err(e) => {
            state.keys.report_failure(&key);
            Err(AppError::Generic(format!("Discovery failed: {e}")).into())
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health<F, C, M, S>(State(state): State<Arc<AppState<F, C, M, S>>>) -> impl IntoResponse
where
    F: Fetcher,
    C: Cleaner,
    M: ChatModel,
    S: SearchEngine,
{
    let response = HealthResponse {
        status: "healthy",
        key_pool: state.keys.status().into(),
    };

    (StatusCode::OK, axum::Json(response))
}
