//! Postgres-backed implementation of the story store.
//!
//! # What this module is
//! Durable story storage via `sqlx`, with change notifications delivered by
//! `LISTEN/NOTIFY`. A row trigger (see `migrations/`) publishes one JSON
//! payload per insert/update/delete on `story_info`.
//!
//! # Scoped credentials
//! Every operation runs in its own transaction and first sets the caller's
//! token and user id as transaction-local settings (`request.jwt.token`,
//! `request.jwt.claim.sub`). Row-level policies can read them; they vanish on
//! commit, so a pooled connection never carries one caller's identity into the
//! next request.
//!
//! # Notification payloads
//! `NOTIFY` payloads are capped at 8000 bytes, so the trigger publishes a
//! projection of the row (`id`, `story_code`, `clerk_user_id`, `created_at`)
//! instead of the generated documents. Consumers re-fetch on notification and
//! do not need the full image.
//!
//! # Listener connections
//! Each change subscription holds its own dedicated connection opened from the
//! database URL, outside the request pool. Open relay streams therefore never
//! take pool slots away from list or delete requests.
//!
//! # Security notes
//! - Database URLs may contain credentials; never log them.
//! - Access tokens are bound as parameters, never interpolated.
use super::{
    ChangeFilter, ChangeSubscription, Credentials, StoreConnection, StoreError, StoreResult,
    StoryStore,
};
use crate::config::PostgresConfig;
use crate::observability::STORE_DELETES_TOTAL;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use sqlx::postgres::{PgConnectOptions, PgListener, PgPoolOptions};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use storyboard_core::{ChangeEvent, Story};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(err.to_string())
            }
            other => StoreError::Unexpected(anyhow!(other)),
        }
    }
}

/// Durable story store backed by a Postgres pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    url: Arc<str>,
}

impl PostgresStore {
    /// Build the pool and apply migrations before any request is served.
    ///
    /// # Errors
    /// - URL parse, connect timeout, pool or migration failures.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = tokio::time::timeout(
            Duration::from_millis(pg.connect_timeout_ms),
            PgPoolOptions::new()
                .max_connections(pg.max_connections)
                .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
                .connect_with(connect_options),
        )
        .await
        .map_err(|_| StoreError::Connection("postgres connect timed out".into()))??;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|err| StoreError::Unexpected(anyhow!(err)))?;
        Ok(Self {
            pool,
            url: Arc::from(pg.url.as_str()),
        })
    }
}

#[async_trait]
impl StoryStore for PostgresStore {
    async fn connect(&self, credentials: &Credentials) -> StoreResult<Box<dyn StoreConnection>> {
        if credentials.access_token.is_empty() {
            return Err(StoreError::Connection("missing access token".into()));
        }
        Ok(Box::new(PostgresConnection {
            pool: self.pool.clone(),
            url: self.url.clone(),
            credentials: credentials.clone(),
        }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[derive(Debug, FromRow)]
struct DbStory {
    id: String,
    story_code: String,
    application_scope: String,
    definition_of_ready: String,
    definition_of_done: String,
    acceptance_criteria: String,
    technical_doc: Option<String>,
    clerk_user_id: String,
    created_at: DateTime<Utc>,
}

impl From<DbStory> for Story {
    fn from(row: DbStory) -> Self {
        Story {
            id: row.id,
            story_code: row.story_code,
            application_scope: row.application_scope,
            definition_of_ready: row.definition_of_ready,
            definition_of_done: row.definition_of_done,
            acceptance_criteria: row.acceptance_criteria,
            technical_doc: row.technical_doc,
            clerk_user_id: row.clerk_user_id,
            created_at: row.created_at,
        }
    }
}

const SELECT_STORY: &str = r#"SELECT id, story_code, application_scope, definition_of_ready,
       definition_of_done, acceptance_criteria, technical_doc, clerk_user_id, created_at
  FROM story_info"#;

struct PostgresConnection {
    pool: PgPool,
    url: Arc<str>,
    credentials: Credentials,
}

impl PostgresConnection {
    async fn scoped(&self) -> StoreResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "SELECT set_config('request.jwt.token', $1, true), set_config('request.jwt.claim.sub', $2, true)",
        )
        .bind(&self.credentials.access_token)
        .bind(self.credentials.user_id.as_deref().unwrap_or(""))
        .execute(&mut *tx)
        .await?;
        Ok(tx)
    }
}

#[async_trait]
impl StoreConnection for PostgresConnection {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Story>> {
        let mut tx = self.scoped().await?;
        let row = sqlx::query_as::<_, DbStory>(&format!("{SELECT_STORY} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row.map(Story::from))
    }

    async fn find_all(&self) -> StoreResult<Vec<Story>> {
        let mut tx = self.scoped().await?;
        let rows = sqlx::query_as::<_, DbStory>(&format!(
            "{SELECT_STORY} ORDER BY created_at DESC"
        ))
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(rows.into_iter().map(Story::from).collect())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut tx = self.scoped().await?;
        let result = sqlx::query("DELETE FROM story_info WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        metrics::counter!(STORE_DELETES_TOTAL, "backend" => "postgres")
            .increment(result.rows_affected());
        Ok(())
    }

    async fn subscribe_to_changes(
        &self,
        channel: &str,
        filter: &ChangeFilter,
    ) -> StoreResult<ChangeSubscription> {
        let mut listener = PgListener::connect(&self.url).await?;
        listener
            .listen(channel)
            .await
            .map_err(|err| StoreError::Subscription(err.to_string()))?;
        tracing::info!(channel, table = %filter.table, "listening for story changes");

        let filter = filter.clone();
        // Dropping the listener closes its dedicated connection.
        let events = futures::stream::unfold(listener, move |mut listener| {
            let filter = filter.clone();
            async move {
                loop {
                    match listener.recv().await {
                        Ok(notification) => match parse_notification(notification.payload()) {
                            Ok(event) if filter.matches(&event) => {
                                return Some((Ok(event), listener));
                            }
                            Ok(_) => continue,
                            Err(err) => {
                                tracing::warn!(error = %err, "ignoring malformed change payload");
                                continue;
                            }
                        },
                        Err(err) => {
                            return Some((Err(StoreError::Subscription(err.to_string())), listener));
                        }
                    }
                }
            }
        })
        .boxed();
        Ok(ChangeSubscription::new(channel, events, || {}))
    }
}

fn parse_notification(payload: &str) -> Result<ChangeEvent, serde_json::Error> {
    serde_json::from_str(payload)
}
