//! Health handler.
//!
//! # Purpose
//! Lightweight probe endpoint for orchestrators and uptime checks.
use crate::api::error::{ApiError, api_unavailable};
use crate::api::types::{ErrorResponse, HealthStatus};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses(
        (status = 200, description = "Service health", body = HealthStatus),
        (status = 503, description = "Store unreachable", body = ErrorResponse)
    )
)]
/// Return service health.
///
/// Probes the backing store and returns `ok` if it answers.
pub(crate) async fn health(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    if let Err(err) = state.store.health_check().await {
        return Err(api_unavailable("storage unavailable", &err));
    }
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
    }))
}
