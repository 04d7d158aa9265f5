//! Story list controller.
//!
//! # Purpose
//! Owns one session's view of the story list: the full set fetched from the
//! API, a debounced search filter over it, the delete confirmation gate, and
//! transient notifications. A single task drives it; nothing here is shared.
//!
//! # Key invariants
//! - Every change event triggers a full refetch; events are never applied
//!   incrementally.
//! - A failed refresh keeps the previously loaded list visible.
//! - Filtering is local. It never calls the API.
//! - The delete call is sent only after explicit confirmation.
//! - At most one notification is held. The run loop publishes it once and
//!   then clears it, so the next snapshot no longer carries it.
use crate::api::{MessageStream, StoriesApi};
use crate::error::ClientError;
use crate::sse::StreamMessage;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use storyboard_core::{ChangeEvent, ChangeKind, Story};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a change event for display.
    pub fn for_change(event: &ChangeEvent) -> Self {
        match event.event_type {
            ChangeKind::Insert => Self::new(NotificationKind::Success, "New story added"),
            ChangeKind::Update => Self::new(NotificationKind::Info, "Story updated"),
            ChangeKind::Delete => Self::new(NotificationKind::Warning, "Story removed"),
        }
    }
}

/// Snapshot published after every controller step.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub phase: Phase,
    pub stories: Vec<Story>,
    pub total: usize,
    pub search: String,
    pub error: Option<String>,
    pub pending_delete: Option<String>,
    pub notification: Option<Notification>,
}

impl Default for ListView {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            stories: Vec::new(),
            total: 0,
            search: String::new(),
            error: None,
            pending_delete: None,
            notification: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    RequestDelete(String),
    ConfirmDelete,
    CancelDelete,
    Refresh,
    Shutdown,
}

struct PendingSearch {
    text: String,
    deadline: Instant,
}

pub struct ListController {
    api: Arc<dyn StoriesApi>,
    debounce: Duration,
    phase: Phase,
    stories: Vec<Story>,
    filtered: Vec<Story>,
    search: String,
    pending_search: Option<PendingSearch>,
    error: Option<String>,
    pending_delete: Option<String>,
    notification: Option<Notification>,
}

impl ListController {
    pub fn new(api: Arc<dyn StoriesApi>) -> Self {
        Self {
            api,
            debounce: DEFAULT_DEBOUNCE,
            phase: Phase::Idle,
            stories: Vec::new(),
            filtered: Vec::new(),
            search: String::new(),
            pending_search: None,
            error: None,
            pending_delete: None,
            notification: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stories(&self) -> &[Story] {
        &self.stories
    }

    pub fn filtered(&self) -> &[Story] {
        &self.filtered
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// Remove and return the notification raised by the latest step.
    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }

    pub fn view(&self) -> ListView {
        ListView {
            phase: self.phase,
            stories: self.filtered.clone(),
            total: self.stories.len(),
            search: self.search.clone(),
            error: self.error.clone(),
            pending_delete: self.pending_delete.clone(),
            notification: self.notification.clone(),
        }
    }

    /// Fetch the full list. On failure the current list stays in place.
    pub async fn refresh(&mut self) {
        self.phase = Phase::Loading;
        match self.api.fetch_stories().await {
            Ok(stories) => {
                self.stories = stories;
                self.error = None;
                self.phase = Phase::Ready;
                self.recompute_filter();
            }
            Err(err) => {
                tracing::warn!(error = %err, "story refresh failed");
                self.error = Some(err.to_string());
                self.phase = Phase::Error;
            }
        }
    }

    /// Record new search text; it applies once the debounce window elapses.
    pub fn set_search(&mut self, text: impl Into<String>) {
        self.pending_search = Some(PendingSearch {
            text: text.into(),
            deadline: Instant::now() + self.debounce,
        });
    }

    pub fn search_deadline(&self) -> Option<Instant> {
        self.pending_search.as_ref().map(|pending| pending.deadline)
    }

    pub fn apply_pending_search(&mut self) {
        if let Some(pending) = self.pending_search.take() {
            self.search = pending.text;
            self.recompute_filter();
        }
    }

    fn recompute_filter(&mut self) {
        self.filtered = self
            .stories
            .iter()
            .filter(|story| story.matches_code(&self.search))
            .cloned()
            .collect();
    }

    /// React to one relay message. Returns `Err` when the relay reported a
    /// failure and the stream is closing.
    pub async fn handle_message(&mut self, message: StreamMessage) -> Result<(), ClientError> {
        match message {
            StreamMessage::Connected => Ok(()),
            StreamMessage::Change(event) => {
                tracing::debug!(
                    event_type = event.event_type.as_str(),
                    story_id = event.record_id().unwrap_or_default(),
                    "story change received"
                );
                self.notification = Some(Notification::for_change(&event));
                self.refresh().await;
                Ok(())
            }
            StreamMessage::Error(message) => {
                tracing::warn!(error = %message, "story event stream failed");
                Err(ClientError::StreamClosed)
            }
        }
    }

    pub fn request_delete(&mut self, story_id: impl Into<String>) {
        self.pending_delete = Some(story_id.into());
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub async fn confirm_delete(&mut self) {
        let Some(story_id) = self.pending_delete.take() else {
            return;
        };
        match self.api.delete_story(&story_id).await {
            Ok(()) => {
                self.notification = Some(Notification::new(
                    NotificationKind::Success,
                    "Story deleted successfully",
                ));
                self.refresh().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, story_id = %story_id, "story delete failed");
                self.notification =
                    Some(Notification::new(NotificationKind::Error, err.to_string()));
            }
        }
    }

    /// Send the current snapshot, then drop the notification it carried.
    fn publish(&mut self, view: &watch::Sender<ListView>) {
        let _ = view.send(self.view());
        self.notification = None;
    }

    /// Returns `false` when the loop should stop.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Search(text) => self.set_search(text),
            Command::RequestDelete(id) => self.request_delete(id),
            Command::ConfirmDelete => self.confirm_delete().await,
            Command::CancelDelete => self.cancel_delete(),
            Command::Refresh => self.refresh().await,
            Command::Shutdown => return false,
        }
        true
    }

    /// Drive the controller until the relay stream ends, fails, or a
    /// `Shutdown` command arrives. Publishes a [`ListView`] after every step.
    ///
    /// Reconnecting after a stream failure is the caller's decision.
    pub async fn run(
        mut self,
        mut events: MessageStream,
        mut commands: mpsc::Receiver<Command>,
        view: watch::Sender<ListView>,
    ) -> Result<(), ClientError> {
        self.refresh().await;
        self.publish(&view);

        loop {
            let deadline = self.search_deadline();
            let debounce = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                message = events.next() => {
                    match message {
                        Some(Ok(message)) => {
                            let outcome = self.handle_message(message).await;
                            self.publish(&view);
                            outcome?;
                        }
                        Some(Err(err)) => return Err(err),
                        None => return Err(ClientError::StreamClosed),
                    }
                }
                command = commands.recv() => {
                    let keep_running = match command {
                        Some(command) => self.handle_command(command).await,
                        None => false,
                    };
                    self.publish(&view);
                    if !keep_running {
                        return Ok(());
                    }
                }
                _ = debounce => {
                    self.apply_pending_search();
                    self.publish(&view);
                }
            }
        }
    }
}
