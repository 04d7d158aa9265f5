use crate::error::RepositoryError;
use crate::story::Story;
use async_trait::async_trait;

/// Typed story access over a data store.
///
/// # Invariants
/// - `find_by_id` reports absence as `Ok(None)`, never as an error, so callers
///   can tell "not found" apart from "store failed".
/// - `find_all` returns stories ordered by `created_at`, newest first.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Story>, RepositoryError>;
    async fn find_all(&self) -> Result<Vec<Story>, RepositoryError>;
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
}
