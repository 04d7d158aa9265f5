//! Story read and delete handlers.
//!
//! # Purpose
//! Thin HTTP wrappers around the story use cases. Each request gets its own
//! [`SessionStoryRepository`], so store access always carries the caller's
//! credentials.
use crate::api::error::{ApiError, api_validation_error, story_error};
use crate::api::types::{ErrorResponse, MessageResponse, StoryListQuery, StoryListResponse};
use crate::app::AppState;
use crate::auth::RequestAuth;
use crate::repository::SessionStoryRepository;
use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use storyboard_core::{DeleteStoryUseCase, GetStoriesUseCase, Story};

#[utoipa::path(
    get,
    path = "/api/stories",
    tag = "stories",
    params(("envelope" = Option<bool>, Query, description = "Wrap the list as {count, stories}")),
    responses(
        (status = 200, description = "Stories, newest first", body = [Story]),
        (status = 400, description = "Malformed query string", body = ErrorResponse),
        (status = 401, description = "No session", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub(crate) async fn list_stories(
    State(state): State<AppState>,
    auth: RequestAuth,
    query: Result<Query<StoryListQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected story list query");
        api_validation_error("Invalid query parameters")
    })?;
    let repository = SessionStoryRepository::new(state.store.clone(), auth.credentials());
    let stories = GetStoriesUseCase::new(&repository, &auth)
        .execute()
        .await
        .map_err(|err| story_error(err, "Failed to fetch stories"))?;
    if query.envelope {
        return Ok(Json(StoryListResponse {
            count: stories.len(),
            stories,
        })
        .into_response());
    }
    Ok(Json(stories).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/stories/{id}",
    tag = "stories",
    params(("id" = String, Path, description = "Story id")),
    responses(
        (status = 200, description = "Story deleted", body = MessageResponse),
        (status = 401, description = "No session", body = ErrorResponse),
        (status = 403, description = "Story belongs to another user", body = ErrorResponse),
        (status = 404, description = "Story not found", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub(crate) async fn delete_story(
    State(state): State<AppState>,
    auth: RequestAuth,
    Path(story_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repository = SessionStoryRepository::new(state.store.clone(), auth.credentials());
    DeleteStoryUseCase::new(&repository, &auth)
        .execute(&story_id)
        .await
        .map_err(|err| story_error(err, "Failed to delete story"))?;
    Ok(Json(MessageResponse {
        message: "Story deleted successfully".to_string(),
    }))
}
