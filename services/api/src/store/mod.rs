//! Data store boundary.
//!
//! # Purpose
//! Narrow interface over the record store: per-caller connections exposing
//! `find_by_id`, `find_all`, `delete` and `subscribe_to_changes`. Nothing
//! outside this module sees a native client.
//!
//! # Key invariants
//! - A [`StoreConnection`] is opened from one caller's [`Credentials`] and is
//!   never shared across requests.
//! - A [`ChangeSubscription`] owns its store-side resources; dropping it
//!   unsubscribes.
use crate::observability::RELAY_SUBSCRIPTIONS_ACTIVE;
use async_trait::async_trait;
use futures::Stream;
use futures::stream::BoxStream;
use std::pin::Pin;
use std::task::{Context, Poll};
use storyboard_core::{ChangeEvent, Story};
use thiserror::Error;

pub mod memory;
pub mod postgres;

/// Schema the story table lives in.
pub const STORY_SCHEMA: &str = "public";
/// Table holding story records.
pub const STORY_TABLE: &str = "story_info";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("subscription failed: {0}")]
    Subscription(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Identity a connection acts on behalf of.
#[derive(Clone)]
pub struct Credentials {
    pub access_token: String,
    pub user_id: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Which change notifications a subscription forwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub schema: String,
    pub table: String,
}

impl ChangeFilter {
    pub fn table(table: &str) -> Self {
        Self {
            schema: STORY_SCHEMA.to_string(),
            table: table.to_string(),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.schema == self.schema && event.table == self.table
    }
}

#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Open a connection scoped to `credentials`.
    async fn connect(&self, credentials: &Credentials) -> StoreResult<Box<dyn StoreConnection>>;
    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
pub trait StoreConnection: Send + Sync {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Story>>;
    /// All stories ordered by `created_at`, newest first.
    async fn find_all(&self) -> StoreResult<Vec<Story>>;
    async fn delete(&self, id: &str) -> StoreResult<()>;
    async fn subscribe_to_changes(
        &self,
        channel: &str,
        filter: &ChangeFilter,
    ) -> StoreResult<ChangeSubscription>;
}

/// Live change feed for one subscriber.
///
/// Yields events in store delivery order. Teardown runs synchronously when the
/// value is dropped, whichever side drops it.
pub struct ChangeSubscription {
    events: BoxStream<'static, StoreResult<ChangeEvent>>,
    _guard: SubscriptionGuard,
}

impl ChangeSubscription {
    pub fn new(
        channel: &str,
        events: BoxStream<'static, StoreResult<ChangeEvent>>,
        on_close: impl FnOnce() + Send + 'static,
    ) -> Self {
        metrics::gauge!(RELAY_SUBSCRIPTIONS_ACTIVE).increment(1.0);
        tracing::debug!(channel, "change subscription opened");
        Self {
            events,
            _guard: SubscriptionGuard {
                channel: channel.to_string(),
                on_close: Some(Box::new(on_close)),
            },
        }
    }
}

impl Stream for ChangeSubscription {
    type Item = StoreResult<ChangeEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.as_mut().poll_next(cx)
    }
}

struct SubscriptionGuard {
    channel: String,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
        metrics::gauge!(RELAY_SUBSCRIPTIONS_ACTIVE).decrement(1.0);
        tracing::debug!(channel = %self.channel, "change subscription closed");
    }
}
