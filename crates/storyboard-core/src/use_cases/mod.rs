//! Application rules guarding story reads and deletes.
//!
//! Each use case borrows its collaborators for the lifetime of one request.
mod delete_story;
mod get_stories;

pub use delete_story::DeleteStoryUseCase;
pub use get_stories::GetStoriesUseCase;

#[cfg(test)]
pub(crate) mod fakes {
    use crate::auth::AuthService;
    use crate::error::{RepositoryError, StoryError, StoryResult};
    use crate::repository::StoryRepository;
    use crate::story::Story;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    pub fn story(id: &str, owner: &str, day: u32) -> Story {
        Story {
            id: id.to_string(),
            story_code: format!("STORY-{id}"),
            application_scope: "scope".to_string(),
            definition_of_ready: "dor".to_string(),
            definition_of_done: "dod".to_string(),
            acceptance_criteria: "ac".to_string(),
            technical_doc: None,
            clerk_user_id: owner.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    #[derive(Default)]
    pub struct FakeRepository {
        pub stories: Vec<Story>,
        pub fail_with: Option<String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeRepository {
        pub fn with(stories: Vec<Story>) -> Self {
            Self {
                stories,
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> Result<(), RepositoryError> {
            self.calls.lock().unwrap().push(call);
            match &self.fail_with {
                Some(message) => Err(RepositoryError::new(message.clone())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl StoryRepository for FakeRepository {
        async fn find_by_id(&self, id: &str) -> Result<Option<Story>, RepositoryError> {
            self.record(format!("find_by_id:{id}"))?;
            Ok(self.stories.iter().find(|s| s.id == id).cloned())
        }

        async fn find_all(&self) -> Result<Vec<Story>, RepositoryError> {
            self.record("find_all".to_string())?;
            Ok(self.stories.clone())
        }

        async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
            self.record(format!("delete:{id}"))
        }
    }

    pub struct FakeAuth {
        pub authenticated: bool,
        pub user_id: Option<String>,
    }

    impl FakeAuth {
        pub fn anonymous() -> Self {
            Self {
                authenticated: false,
                user_id: None,
            }
        }

        pub fn user(id: &str) -> Self {
            Self {
                authenticated: true,
                user_id: Some(id.to_string()),
            }
        }
    }

    #[async_trait]
    impl AuthService for FakeAuth {
        async fn token(&self) -> StoryResult<String> {
            if self.authenticated {
                Ok("token".to_string())
            } else {
                Err(StoryError::NotAuthenticated)
            }
        }

        async fn is_authenticated(&self) -> bool {
            self.authenticated
        }

        async fn user_id(&self) -> Option<String> {
            self.user_id.clone()
        }
    }
}
