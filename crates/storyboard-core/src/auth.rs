use crate::error::StoryResult;
use async_trait::async_trait;

/// Session view of the authentication gate.
///
/// One value is built per request (or per client session). Implementations
/// answer for that caller only; they never hold process-wide identity.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Bearer token for the current session.
    ///
    /// Fails with `StoryError::NotAuthenticated` when there is no session.
    async fn token(&self) -> StoryResult<String>;

    async fn is_authenticated(&self) -> bool;

    /// Resolved user id, or `None` when the gate cannot supply one.
    async fn user_id(&self) -> Option<String>;
}
