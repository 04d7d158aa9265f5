//! Router and shared handler state.
//!
//! # Routes
//! - `GET /api/stories`, `DELETE /api/stories/:id`: story list and delete
//! - `GET /api/stories/events`: change relay (server-sent events)
//! - `POST /api/webhook`: signed creation callback from the workflow
//! - `POST /api/scope`: forward an application scope to the workflow
//! - `GET /api/health`, `GET /api/openapi.json`
use crate::api;
use crate::auth::SessionVerifier;
use crate::config::{Environment, RelayConfig};
use crate::observability;
use crate::store::StoryStore;
use crate::workflow::WorkflowClient;
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{delete, get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoryStore>,
    pub verifier: Arc<SessionVerifier>,
    pub environment: Environment,
    pub relay: RelayConfig,
    pub webhook_secret: Option<String>,
    pub workflow: Arc<WorkflowClient>,
}

/// Span for one inbound request, parented on the caller's trace context.
///
/// Only the path is recorded; query strings are left out of the span.
fn request_span(request: &Request<Body>) -> Span {
    let span = tracing::info_span!(
        "http.request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version()
    );
    span.set_parent(observability::trace_context_from_headers(request.headers()));
    span
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(api::system::health))
        .route("/api/stories", get(api::stories::list_stories))
        .route("/api/stories/events", get(api::events::story_events))
        .route("/api/stories/:id", delete(api::stories::delete_story))
        .route("/api/webhook", post(api::webhook::receive_webhook))
        .route("/api/scope", post(api::scope::submit_scope))
        .route("/api/openapi.json", get(api::openapi::openapi_json))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}
