//! Outbound workflow client.
//!
//! # Purpose
//! Submits a story's application scope to the external workflow engine that
//! later generates the story definitions and calls back through the webhook.
//!
//! # Key invariants
//! - The target path segment is `webhook` in production and `webhook-test`
//!   everywhere else.
//! - Every request carries the configured `api-key` header.
//! - There is no retry; a failed submission is reported to the caller.
use crate::config::{Environment, WorkflowConfig};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const API_KEY_HEADER: &str = "api-key";

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Webhook key is not configured")]
    MissingKey,
    #[error("Webhook URL is not configured")]
    MissingUrl,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("workflow responded with status {0}")]
    Status(reqwest::StatusCode),
}

impl WorkflowError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingKey | Self::MissingUrl)
    }
}

#[derive(Debug, Serialize)]
struct ScopeSubmission<'a> {
    story_code: &'a str,
    application_scope: &'a str,
}

#[derive(Debug, Clone)]
pub struct WorkflowClient {
    client: reqwest::Client,
    config: WorkflowConfig,
    environment: Environment,
}

impl WorkflowClient {
    pub fn new(config: WorkflowConfig, environment: Environment) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "falling back to default workflow http client");
                reqwest::Client::new()
            });
        Self {
            client,
            config,
            environment,
        }
    }

    /// Full submission URL, or `None` when no base URL is configured.
    pub fn submission_url(&self) -> Option<String> {
        let base = self.config.base_url.as_deref()?;
        let segment = if self.environment.is_production() {
            "webhook"
        } else {
            "webhook-test"
        };
        Some(format!(
            "{}/{}/{}",
            base.trim_end_matches('/'),
            segment,
            self.config.path.trim_start_matches('/')
        ))
    }

    pub async fn submit_scope(
        &self,
        story_code: &str,
        application_scope: &str,
    ) -> Result<(), WorkflowError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(WorkflowError::MissingKey)?;
        let url = self.submission_url().ok_or(WorkflowError::MissingUrl)?;
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, key)
            .json(&ScopeSubmission {
                story_code,
                application_scope,
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WorkflowError::Status(status));
        }
        tracing::info!(story_code, "scope submitted to workflow");
        Ok(())
    }
}
