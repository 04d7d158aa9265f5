//! Scope submission endpoint.
//!
//! # Purpose
//! Forwards a story's application scope to the workflow engine on behalf of a
//! signed-in user.
use crate::api::error::{
    ApiError, api_configuration_error, api_internal_message, api_unauthorized,
    api_validation_error,
};
use crate::api::types::{ErrorResponse, ScopeRequest, ScopeResponse};
use crate::app::AppState;
use crate::auth::RequestAuth;
use axum::Json;
use axum::extract::State;
use storyboard_core::{AuthService, StoryError};

fn required(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[utoipa::path(
    post,
    path = "/api/scope",
    tag = "scope",
    request_body = ScopeRequest,
    responses(
        (status = 200, description = "Scope submitted", body = ScopeResponse),
        (status = 400, description = "Missing story code or scope", body = ErrorResponse),
        (status = 401, description = "No session", body = ErrorResponse),
        (status = 500, description = "Workflow not configured or unreachable", body = ErrorResponse)
    )
)]
pub(crate) async fn submit_scope(
    State(state): State<AppState>,
    auth: RequestAuth,
    body: Option<Json<ScopeRequest>>,
) -> Result<Json<ScopeResponse>, ApiError> {
    if !auth.is_authenticated().await {
        return Err(api_unauthorized(&StoryError::NotAuthenticated.to_string()));
    }
    let Some(Json(request)) = body else {
        return Err(api_validation_error("Story code and scope are required"));
    };
    let (Some(story_code), Some(scope)) = (required(request.story_code), required(request.scope))
    else {
        return Err(api_validation_error("Story code and scope are required"));
    };

    match state.workflow.submit_scope(&story_code, &scope).await {
        Ok(()) => Ok(Json(ScopeResponse { success: true })),
        Err(err) if err.is_configuration() => {
            tracing::error!(error = %err, "workflow is not configured");
            Err(api_configuration_error(&err.to_string()))
        }
        Err(err) => {
            tracing::error!(error = %err, story_code = %story_code, "scope submission failed");
            Err(api_internal_message("Failed to submit scope"))
        }
    }
}
