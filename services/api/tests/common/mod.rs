#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use chrono::{TimeZone, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use std::sync::Arc;
use storyboard_api::app::{AppState, build_router};
use storyboard_api::auth::SessionVerifier;
use storyboard_api::config::{
    AuthConfig, DEFAULT_CHANNEL, DEFAULT_WORKFLOW_PATH, Environment, RelayConfig, WorkflowConfig,
};
use storyboard_api::store::STORY_TABLE;
use storyboard_api::store::memory::InMemoryStore;
use storyboard_api::workflow::WorkflowClient;
use storyboard_core::Story;

pub const AUTH_SECRET: &str = "integration-secret";

pub struct TestApp {
    pub store: InMemoryStore,
    pub environment: Environment,
    pub webhook_secret: Option<String>,
    pub workflow: WorkflowConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
            environment: Environment::Test,
            webhook_secret: None,
            workflow: WorkflowConfig {
                base_url: None,
                path: DEFAULT_WORKFLOW_PATH.to_string(),
                api_key: None,
            },
        }
    }

    pub fn router(&self) -> axum::Router {
        let state = AppState {
            store: Arc::new(self.store.clone()),
            verifier: Arc::new(SessionVerifier::new(&AuthConfig {
                secret: AUTH_SECRET.to_string(),
                issuer: None,
            })),
            environment: self.environment,
            relay: RelayConfig {
                channel: DEFAULT_CHANNEL.to_string(),
                table: STORY_TABLE.to_string(),
            },
            webhook_secret: self.webhook_secret.clone(),
            workflow: Arc::new(WorkflowClient::new(self.workflow.clone(), self.environment)),
        };
        build_router(state)
    }
}

pub fn session_token(user_id: &str) -> String {
    let exp = Utc::now().timestamp() + 300;
    encode(
        &Header::new(Algorithm::HS256),
        &serde_json::json!({"sub": user_id, "exp": exp}),
        &EncodingKey::from_secret(AUTH_SECRET.as_bytes()),
    )
    .expect("token")
}

pub fn story(id: &str, code: &str, owner: &str, day: u32) -> Story {
    Story {
        id: id.to_string(),
        story_code: code.to_string(),
        application_scope: format!("scope for {code}"),
        definition_of_ready: "ready".to_string(),
        definition_of_done: "done".to_string(),
        acceptance_criteria: "criteria".to_string(),
        technical_doc: None,
        clerk_user_id: owner.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
    }
}

pub fn request(method: &str, uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", session_token(user)));
    }
    builder.body(Body::empty()).expect("request")
}

pub fn json_request(
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", session_token(user)));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub async fn read_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}
