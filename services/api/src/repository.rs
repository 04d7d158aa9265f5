//! Store-backed story repository.
//!
//! # Purpose
//! Adapts one caller's [`StoreConnection`] to [`StoryRepository`]. The
//! connection is opened on first use with the caller's credentials and
//! released when the adapter is dropped at the end of the request.
use crate::store::{Credentials, StoreConnection, StoreError, StoryStore};
use async_trait::async_trait;
use std::sync::Arc;
use storyboard_core::{RepositoryError, Story, StoryRepository};
use tokio::sync::OnceCell;

pub struct SessionStoryRepository {
    store: Arc<dyn StoryStore>,
    credentials: Option<Credentials>,
    connection: OnceCell<Box<dyn StoreConnection>>,
}

impl SessionStoryRepository {
    pub fn new(store: Arc<dyn StoryStore>, credentials: Option<Credentials>) -> Self {
        Self {
            store,
            credentials,
            connection: OnceCell::new(),
        }
    }

    async fn connection(&self) -> Result<&dyn StoreConnection, RepositoryError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let credentials = self
                    .credentials
                    .as_ref()
                    .ok_or_else(|| StoreError::Connection("no session credentials".into()))?;
                self.store.connect(credentials).await
            })
            .await
            .map_err(repository_error)?;
        Ok(connection.as_ref())
    }

    #[cfg(test)]
    fn is_connected(&self) -> bool {
        self.connection.initialized()
    }
}

fn repository_error(err: StoreError) -> RepositoryError {
    tracing::error!(error = %err, "story store operation failed");
    RepositoryError::new(err.to_string())
}

#[async_trait]
impl StoryRepository for SessionStoryRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Story>, RepositoryError> {
        self.connection()
            .await?
            .find_by_id(id)
            .await
            .map_err(repository_error)
    }

    async fn find_all(&self) -> Result<Vec<Story>, RepositoryError> {
        self.connection()
            .await?
            .find_all()
            .await
            .map_err(repository_error)
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.connection()
            .await?
            .delete(id)
            .await
            .map_err(repository_error)
    }
}
