//! HTTP access to the storyboard API.
//!
//! # Purpose
//! [`StoriesApi`] is the seam the list controller talks through;
//! [`HttpStoriesApi`] implements it over `reqwest` with a bearer session
//! token.
use crate::error::ClientError;
use crate::sse::{StreamMessage, decode_messages};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Deserialize;
use storyboard_core::Story;

pub type MessageStream = BoxStream<'static, Result<StreamMessage, ClientError>>;

#[async_trait]
pub trait StoriesApi: Send + Sync {
    async fn fetch_stories(&self) -> Result<Vec<Story>, ClientError>;
    async fn delete_story(&self, id: &str) -> Result<(), ClientError>;
    /// Open the relay stream. The first message is normally `Connected`.
    async fn open_events(&self) -> Result<MessageStream, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct HttpStoriesApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpStoriesApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turn a non-2xx response into `ClientError::Status`, keeping the server's
/// `error` message when the body carries one.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl StoriesApi for HttpStoriesApi {
    async fn fetch_stories(&self) -> Result<Vec<Story>, ClientError> {
        let response = self
            .client
            .get(self.url("/api/stories"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let bytes = check_status(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn delete_story(&self, id: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/stories/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn open_events(&self) -> Result<MessageStream, ClientError> {
        let response = self
            .client
            .get(self.url("/api/stories/events"))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response).await?;
        tracing::debug!(base_url = %self.base_url, "story event stream opened");
        Ok(decode_messages(response.bytes_stream()).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{delete, get};
    use chrono::{TimeZone, Utc};

    fn story() -> Story {
        Story {
            id: "1".to_string(),
            story_code: "STORY-1".to_string(),
            application_scope: "scope".to_string(),
            definition_of_ready: String::new(),
            definition_of_done: String::new(),
            acceptance_criteria: String::new(),
            technical_doc: None,
            clerk_user_id: "user_1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    async fn spawn(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router.into_make_service()).await;
        });
        format!("http://{addr}")
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer token-1")
    }

    #[tokio::test]
    async fn fetch_sends_bearer_token() {
        let router = axum::Router::new().route(
            "/api/stories",
            get(|headers: HeaderMap| async move {
                if authorized(&headers) {
                    Ok(Json(vec![story()]))
                } else {
                    Err(StatusCode::UNAUTHORIZED)
                }
            }),
        );
        let api = HttpStoriesApi::new(spawn(router).await, "token-1");
        let stories = api.fetch_stories().await.expect("stories");
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].story_code, "STORY-1");
    }

    #[tokio::test]
    async fn delete_surfaces_server_message() {
        let router = axum::Router::new().route(
            "/api/stories/:id",
            delete(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(serde_json::json!({
                        "error": "Unauthorized to delete this story",
                        "code": "forbidden"
                    })),
                )
            }),
        );
        let api = HttpStoriesApi::new(spawn(router).await, "token-1");
        let err = api.delete_story("1").await.expect_err("forbidden");
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.to_string(), "Unauthorized to delete this story");
    }

    #[tokio::test]
    async fn open_events_decodes_relay_frames() {
        let router = axum::Router::new().route(
            "/api/stories/events",
            get(|| async {
                (
                    [("content-type", "text/event-stream")],
                    "data: connected\n\n:ping\n\ndata: {\"eventType\":\"UPDATE\",\"schema\":\"public\",\"table\":\"story_info\",\"new\":{\"id\":\"1\"},\"commit_timestamp\":\"t\"}\n\n",
                )
            }),
        );
        let api = HttpStoriesApi::new(spawn(router).await, "token-1");
        let messages: Vec<_> = api.open_events().await.expect("stream").collect().await;
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], Ok(StreamMessage::Connected)));
        assert!(matches!(&messages[1], Ok(StreamMessage::Change(_))));
    }
}
