use thiserror::Error;

/// Failure reported by a story repository.
///
/// Wraps the underlying store message; the store's own error type never leaks
/// past the repository boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("repository error: {0}")]
pub struct RepositoryError(pub String);

impl RepositoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Errors raised by the story use cases.
///
/// The display strings double as the client-facing messages for the
/// authorization variants, so keep them stable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoryError {
    #[error("User is not authenticated")]
    NotAuthenticated,
    #[error("User ID not found")]
    MissingUserId,
    #[error("Story not found")]
    NotFound,
    #[error("Unauthorized to delete this story")]
    Unauthorized,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type StoryResult<T> = Result<T, StoryError>;
