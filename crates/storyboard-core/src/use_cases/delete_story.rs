use crate::auth::AuthService;
use crate::error::{StoryError, StoryResult};
use crate::repository::StoryRepository;

/// Delete a story on behalf of its owner.
///
/// # Invariants
/// Every step is a hard gate, evaluated in order:
/// 1. session present, else `NotAuthenticated`
/// 2. user id resolved, else `MissingUserId`
/// 3. story exists, else `NotFound`
/// 4. caller owns the story, else `Unauthorized`
/// 5. repository delete; failures propagate
///
/// `delete` is never issued unless all four checks pass.
pub struct DeleteStoryUseCase<'a> {
    repository: &'a dyn StoryRepository,
    auth: &'a dyn AuthService,
}

impl<'a> DeleteStoryUseCase<'a> {
    pub fn new(repository: &'a dyn StoryRepository, auth: &'a dyn AuthService) -> Self {
        Self { repository, auth }
    }

    pub async fn execute(&self, story_id: &str) -> StoryResult<()> {
        if !self.auth.is_authenticated().await {
            return Err(StoryError::NotAuthenticated);
        }
        let user_id = self
            .auth
            .user_id()
            .await
            .ok_or(StoryError::MissingUserId)?;

        let story = self
            .repository
            .find_by_id(story_id)
            .await?
            .ok_or(StoryError::NotFound)?;

        if !story.is_owned_by(&user_id) {
            tracing::warn!(
                story_id,
                user_id = %user_id,
                "delete rejected: caller does not own story"
            );
            return Err(StoryError::Unauthorized);
        }

        self.repository.delete(story_id).await?;
        tracing::info!(story_id, user_id = %user_id, "story deleted");
        Ok(())
    }
}
