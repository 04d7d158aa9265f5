//! Per-request session view.
//!
//! # Purpose
//! Builds a [`RequestAuth`] from the request's `Authorization` header and
//! exposes it to the use cases as an [`AuthService`]. Handlers take it as an
//! extractor; it never rejects on its own, so the use case decides what an
//! absent session means.
use crate::app::AppState;
use crate::auth::session::{SessionVerifier, bearer_token};
use crate::store::Credentials;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::convert::Infallible;
use storyboard_core::{AuthService, StoryError, StoryResult};

#[derive(Clone)]
struct VerifiedSession {
    token: String,
    user_id: Option<String>,
}

#[derive(Clone, Default)]
pub struct RequestAuth {
    session: Option<VerifiedSession>,
}

impl RequestAuth {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_headers(verifier: &SessionVerifier, headers: &HeaderMap) -> Self {
        let Some(token) = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
        else {
            return Self::anonymous();
        };
        match verifier.verify(token) {
            Ok(claims) => Self {
                session: Some(VerifiedSession {
                    token: token.to_string(),
                    user_id: claims.sub.filter(|sub| !sub.is_empty()),
                }),
            },
            Err(err) => {
                tracing::debug!(error = %err, "rejected session token");
                Self::anonymous()
            }
        }
    }

    /// Credentials for opening a scoped store connection.
    pub fn credentials(&self) -> Option<Credentials> {
        self.session.as_ref().map(|session| Credentials {
            access_token: session.token.clone(),
            user_id: session.user_id.clone(),
        })
    }
}

#[async_trait]
impl AuthService for RequestAuth {
    async fn token(&self) -> StoryResult<String> {
        self.session
            .as_ref()
            .map(|session| session.token.clone())
            .ok_or(StoryError::NotAuthenticated)
    }

    async fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    async fn user_id(&self) -> Option<String> {
        self.session.as_ref().and_then(|s| s.user_id.clone())
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequestAuth {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&state.verifier, &parts.headers))
    }
}
