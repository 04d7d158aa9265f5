//! Request and response bodies for the HTTP API.
use serde::{Deserialize, Serialize};
use storyboard_core::Story;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct StoryListResponse {
    pub count: usize,
    pub stories: Vec<Story>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoryListQuery {
    #[serde(default)]
    pub envelope: bool,
}

/// Story definitions produced by the workflow engine.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(default)]
    pub definition_of_ready: Option<String>,
    #[serde(default)]
    pub definition_of_done: Option<String>,
    #[serde(default)]
    pub acceptance_criteria: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl WebhookPayload {
    pub fn is_complete(&self) -> bool {
        [
            &self.definition_of_ready,
            &self.definition_of_done,
            &self.acceptance_criteria,
        ]
        .iter()
        .all(|field| field.as_deref().is_some_and(|value| !value.trim().is_empty()))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScopeRequest {
    #[serde(default)]
    pub story_code: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ScopeResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_payload_requires_definitions() {
        let full: WebhookPayload = serde_json::from_value(serde_json::json!({
            "definitionOfReady": "r",
            "definitionOfDone": "d",
            "acceptanceCriteria": "a",
            "timestamp": "2024-01-01T00:00:00Z"
        }))
        .expect("payload");
        assert!(full.is_complete());

        let partial: WebhookPayload = serde_json::from_value(serde_json::json!({
            "definitionOfReady": "r",
            "definitionOfDone": "",
            "timestamp": "2024-01-01T00:00:00Z"
        }))
        .expect("payload");
        assert!(!partial.is_complete());

        let untimed: WebhookPayload = serde_json::from_value(serde_json::json!({
            "definitionOfReady": "r",
            "definitionOfDone": "d",
            "acceptanceCriteria": "a"
        }))
        .expect("payload");
        assert!(untimed.is_complete());
    }

    #[test]
    fn list_query_defaults_to_bare_array() {
        let query: StoryListQuery = serde_json::from_str("{}").expect("query");
        assert!(!query.envelope);
    }
}
