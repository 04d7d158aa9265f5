//! Authentication gate and webhook signature checks.
//!
//! # Purpose
//! Verifies bearer session tokens, exposes the per-request
//! [`storyboard_core::AuthService`] view, and authenticates inbound workflow
//! webhooks by HMAC signature.
pub mod request;
pub mod session;
pub mod signature;

pub use request::RequestAuth;
pub use session::{AuthError, SessionClaims, SessionVerifier};
