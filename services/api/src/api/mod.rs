//! Storyboard HTTP API module.
//!
//! # Purpose
//! Route handler modules plus the shared error and body types.
pub mod error;
pub mod events;
pub mod openapi;
pub mod scope;
pub mod stories;
pub mod system;
pub mod types;
pub mod webhook;
