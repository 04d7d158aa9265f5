use crate::auth::AuthService;
use crate::error::{StoryError, StoryResult};
use crate::repository::StoryRepository;
use crate::story::{Story, sort_newest_first};

/// List every story for an authenticated caller, newest first.
pub struct GetStoriesUseCase<'a> {
    repository: &'a dyn StoryRepository,
    auth: &'a dyn AuthService,
}

impl<'a> GetStoriesUseCase<'a> {
    pub fn new(repository: &'a dyn StoryRepository, auth: &'a dyn AuthService) -> Self {
        Self { repository, auth }
    }

    /// # Errors
    /// - `StoryError::NotAuthenticated` when there is no session; the
    ///   repository is not touched.
    /// - `StoryError::Repository` passed through unchanged from the store.
    pub async fn execute(&self) -> StoryResult<Vec<Story>> {
        if !self.auth.is_authenticated().await {
            return Err(StoryError::NotAuthenticated);
        }
        let mut stories = self.repository.find_all().await?;
        // Stores are expected to order already; re-sort so the contract holds
        // regardless of backend.
        sort_newest_first(&mut stories);
        Ok(stories)
    }
}
