//! Storyboard domain core.
//!
//! # Purpose
//! Holds the `Story` entity, the change-event payload pushed by the relay, the
//! error taxonomy, and the two application rules (`GetStoriesUseCase`,
//! `DeleteStoryUseCase`) that gate every read and delete behind the caller's
//! session.
//!
//! # Notes
//! Storage and authentication are consumed through the [`StoryRepository`] and
//! [`AuthService`] traits; this crate never talks to a database or an identity
//! provider directly.
pub mod auth;
pub mod change;
pub mod error;
pub mod repository;
pub mod story;
pub mod use_cases;

pub use auth::AuthService;
pub use change::{ChangeEvent, ChangeKind};
pub use error::{RepositoryError, StoryError, StoryResult};
pub use repository::StoryRepository;
pub use story::{Story, sort_newest_first};
pub use use_cases::{DeleteStoryUseCase, GetStoriesUseCase};
