//! Client side of the storyboard API.
//!
//! # Purpose
//! Typed HTTP access to the story endpoints, a decoder for the change relay's
//! event stream, and the list controller that keeps a session's story list in
//! sync with pushed changes.
pub mod api;
pub mod controller;
pub mod error;
pub mod sse;

pub use api::{HttpStoriesApi, MessageStream, StoriesApi};
pub use controller::{Command, ListController, ListView, Notification, NotificationKind, Phase};
pub use error::ClientError;
pub use sse::{SseDecoder, SseFrame, StreamMessage};
