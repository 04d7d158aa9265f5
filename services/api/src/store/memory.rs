//! In-memory implementation of the story store.
//!
//! # Purpose
//! Keeps stories in a `HashMap` guarded by `tokio::sync::RwLock` and fans
//! change notifications out over a `tokio::sync::broadcast` channel. It exists
//! for local development and tests; nothing survives a restart.
//!
//! # Change notifications
//! Every mutation publishes one [`ChangeEvent`] after the map has been
//! updated, so a subscriber that re-fetches on notification always sees the
//! new state. Slow subscribers that overflow the broadcast buffer skip the
//! missed events (logged) and keep receiving; delivery is at-most-once.
//!
//! # Credentials
//! Connections require a non-empty access token but do not enforce row-level
//! policy; authorization lives in the use cases.
use super::{
    ChangeFilter, ChangeSubscription, Credentials, STORY_SCHEMA, STORY_TABLE, StoreConnection,
    StoreError, StoreResult, StoryStore,
};
use crate::observability::STORE_DELETES_TOTAL;
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use storyboard_core::{ChangeEvent, ChangeKind, Story, sort_newest_first};
use tokio::sync::{RwLock, broadcast};

const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
enum StoreSignal {
    Change(ChangeEvent),
    Fault(String),
}

struct Shared {
    stories: RwLock<HashMap<String, Story>>,
    signals: broadcast::Sender<StoreSignal>,
    active_subscriptions: AtomicUsize,
}

/// In-memory story store.
///
/// Cloning is cheap and every clone shares the same records and feed.
#[derive(Clone)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (signals, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                stories: RwLock::new(HashMap::new()),
                signals,
                active_subscriptions: AtomicUsize::new(0),
            }),
        }
    }

    /// Insert a story as the external workflow would and publish `INSERT`.
    pub async fn insert(&self, story: Story) -> StoreResult<Story> {
        let mut stories = self.shared.stories.write().await;
        if stories.contains_key(&story.id) {
            return Err(StoreError::Conflict("story exists".into()));
        }
        stories.insert(story.id.clone(), story.clone());
        drop(stories);
        self.publish(ChangeKind::Insert, Some(&story), None);
        Ok(story)
    }

    /// Replace a story wholesale and publish `UPDATE`.
    pub async fn update(&self, story: Story) -> StoreResult<Story> {
        let mut stories = self.shared.stories.write().await;
        let previous = stories
            .insert(story.id.clone(), story.clone())
            .ok_or_else(|| StoreError::NotFound("story".into()))?;
        drop(stories);
        self.publish(ChangeKind::Update, Some(&story), Some(&previous));
        Ok(story)
    }

    /// Report a subscription-level failure to every live subscriber.
    pub fn fail_subscriptions(&self, message: &str) {
        let _ = self
            .shared
            .signals
            .send(StoreSignal::Fault(message.to_string()));
    }

    /// Number of change subscriptions that have not yet been dropped.
    pub fn active_subscriptions(&self) -> usize {
        self.shared.active_subscriptions.load(Ordering::SeqCst)
    }

    fn publish(&self, kind: ChangeKind, new: Option<&Story>, old: Option<&Story>) {
        let event = ChangeEvent::new(
            kind,
            STORY_SCHEMA,
            STORY_TABLE,
            new.and_then(|s| serde_json::to_value(s).ok()),
            old.and_then(|s| serde_json::to_value(s).ok()),
            Utc::now().to_rfc3339(),
        );
        // No receivers is not an error: nobody is watching.
        let _ = self.shared.signals.send(StoreSignal::Change(event));
    }
}

#[async_trait]
impl StoryStore for InMemoryStore {
    async fn connect(&self, credentials: &Credentials) -> StoreResult<Box<dyn StoreConnection>> {
        if credentials.access_token.is_empty() {
            return Err(StoreError::Connection("missing access token".into()));
        }
        Ok(Box::new(MemoryConnection {
            store: self.clone(),
            user_id: credentials.user_id.clone(),
        }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryConnection {
    store: InMemoryStore,
    user_id: Option<String>,
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Story>> {
        Ok(self.store.shared.stories.read().await.get(id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Story>> {
        let mut stories: Vec<Story> = self
            .store
            .shared
            .stories
            .read()
            .await
            .values()
            .cloned()
            .collect();
        sort_newest_first(&mut stories);
        Ok(stories)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let removed = self.store.shared.stories.write().await.remove(id);
        if let Some(story) = removed {
            tracing::debug!(story_id = id, user_id = ?self.user_id, "story removed from memory store");
            metrics::counter!(STORE_DELETES_TOTAL, "backend" => "memory").increment(1);
            self.store.publish(ChangeKind::Delete, None, Some(&story));
        }
        Ok(())
    }

    async fn subscribe_to_changes(
        &self,
        channel: &str,
        filter: &ChangeFilter,
    ) -> StoreResult<ChangeSubscription> {
        let receiver = self.store.shared.signals.subscribe();
        let filter = filter.clone();
        let channel_name = channel.to_string();
        let events = futures::stream::unfold(receiver, move |mut receiver| {
            let filter = filter.clone();
            let channel_name = channel_name.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(StoreSignal::Change(event)) if filter.matches(&event) => {
                            return Some((Ok(event), receiver));
                        }
                        Ok(StoreSignal::Change(_)) => continue,
                        Ok(StoreSignal::Fault(message)) => {
                            return Some((Err(StoreError::Subscription(message)), receiver));
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                channel = %channel_name,
                                skipped,
                                "change subscriber lagged; events dropped"
                            );
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        })
        .boxed();

        let shared = self.store.shared.clone();
        shared.active_subscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(ChangeSubscription::new(channel, events, move || {
            shared.active_subscriptions.fetch_sub(1, Ordering::SeqCst);
        }))
    }
}
