//! Storyboard service library crate.
//!
//! # Purpose
//! Serves the story list, the delete endpoint and the change relay behind the
//! session gate, plus the inbound creation webhook and outbound scope
//! submission. The binary and the integration tests both build on it.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod observability;
pub mod relay;
pub mod repository;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;
