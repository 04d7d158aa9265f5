//! HTTP error bodies.
//!
//! Every failing endpoint answers `{ "error": <message>, "code": <code> }`.
//! Store and repository causes are logged here and replaced by the endpoint's
//! fallback message before they reach the client.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use storyboard_core::StoryError;

/// Structured API error returned by handlers.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: message.to_string(),
                code: code.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn api_unauthorized(message: &str) -> ApiError {
    // Authentication failed or missing.
    ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

pub fn api_forbidden(message: &str) -> ApiError {
    // Authenticated, but not permitted.
    ApiError::new(StatusCode::FORBIDDEN, "forbidden", message)
}

pub fn api_validation_error(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn api_configuration_error(message: &str) -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", message)
}

pub fn api_unavailable(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "story store unavailable");
    ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
}

pub fn api_internal_message(message: &str) -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Map a use-case failure onto its HTTP status.
///
/// Authorization failures keep their own message; anything else is logged and
/// collapsed into `fallback`.
pub fn story_error(err: StoryError, fallback: &str) -> ApiError {
    match err {
        StoryError::NotAuthenticated | StoryError::MissingUserId => {
            api_unauthorized(&err.to_string())
        }
        StoryError::Unauthorized => api_forbidden(&err.to_string()),
        StoryError::NotFound => api_not_found(&err.to_string()),
        StoryError::Validation(message) => api_validation_error(&message),
        StoryError::Configuration(message) => {
            tracing::error!(error = %message, "configuration error");
            api_configuration_error(fallback)
        }
        StoryError::Repository(inner) => {
            tracing::error!(error = %inner, "story repository error");
            api_internal_message(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyboard_core::RepositoryError;

    #[test]
    fn codes_follow_status() {
        let cases = [
            (api_not_found("x"), StatusCode::NOT_FOUND, "not_found"),
            (api_unauthorized("x"), StatusCode::UNAUTHORIZED, "unauthorized"),
            (api_forbidden("x"), StatusCode::FORBIDDEN, "forbidden"),
            (api_validation_error("x"), StatusCode::BAD_REQUEST, "validation_error"),
            (
                api_configuration_error("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
            ),
            (api_internal_message("x"), StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        ];
        for (api, status, code) in cases {
            assert_eq!(api.status, status);
            assert_eq!(api.body.code, code);
            assert_eq!(api.body.error, "x");
        }
    }

    #[test]
    fn unavailable_store_is_503() {
        let api = api_unavailable(
            "store unavailable",
            &StoreError::Connection("pool timed out".into()),
        );
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.body.code, "unavailable");
    }

    #[test]
    fn story_errors_map_to_statuses() {
        let cases = [
            (StoryError::NotAuthenticated, StatusCode::UNAUTHORIZED, "User is not authenticated"),
            (StoryError::MissingUserId, StatusCode::UNAUTHORIZED, "User ID not found"),
            (StoryError::Unauthorized, StatusCode::FORBIDDEN, "Unauthorized to delete this story"),
            (StoryError::NotFound, StatusCode::NOT_FOUND, "Story not found"),
            (
                StoryError::Repository(RepositoryError::new("pool timed out")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete story",
            ),
        ];
        for (err, status, message) in cases {
            let api = story_error(err, "Failed to delete story");
            assert_eq!(api.status, status);
            assert_eq!(api.body.error, message);
        }
    }

    #[test]
    fn repository_details_are_not_exposed() {
        let api = story_error(
            StoryError::Repository(RepositoryError::new("password=hunter2")),
            "Failed to fetch stories",
        );
        assert!(!api.body.error.contains("hunter2"));
    }
}
