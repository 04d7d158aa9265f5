//! OpenAPI schema aggregation.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document.
use crate::api::{
    events, scope, stories, system,
    types::{
        ErrorResponse, HealthStatus, MessageResponse, ScopeRequest, ScopeResponse,
        StoryListResponse, WebhookPayload,
    },
    webhook,
};
use axum::Json;
use storyboard_core::Story;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "storyboard-api",
        version = "v1",
        description = "Story management HTTP API"
    ),
    paths(
        system::health,
        stories::list_stories,
        stories::delete_story,
        events::story_events,
        webhook::receive_webhook,
        scope::submit_scope
    ),
    components(schemas(
        Story,
        StoryListResponse,
        MessageResponse,
        ErrorResponse,
        HealthStatus,
        WebhookPayload,
        ScopeRequest,
        ScopeResponse
    )),
    tags(
        (name = "system", description = "Health"),
        (name = "stories", description = "Story listing, deletion and change stream"),
        (name = "webhook", description = "Inbound workflow callbacks"),
        (name = "scope", description = "Outbound scope submission")
    )
)]
pub struct ApiDoc;

pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
