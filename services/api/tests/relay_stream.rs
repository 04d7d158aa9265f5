mod common;

use axum::body::Body;
use axum::http::{StatusCode, header};
use common::{TestApp, read_json, request, story};
use http_body_util::BodyExt;
use std::time::Duration;
use tower::ServiceExt;

/// Read body frames until one complete SSE event (`\n\n`) is buffered.
async fn next_event(body: &mut Body, buffer: &mut String) -> String {
    loop {
        if let Some(end) = buffer.find("\n\n") {
            let event = buffer[..end].to_string();
            buffer.drain(..end + 2);
            return event;
        }
        let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
            .await
            .expect("frame before timeout")
            .expect("stream open")
            .expect("frame");
        if let Ok(data) = frame.into_data() {
            buffer.push_str(std::str::from_utf8(&data).expect("utf8"));
        }
    }
}

#[tokio::test]
async fn stream_requires_session() {
    let app = TestApp::new();
    let response = app
        .router()
        .oneshot(request("GET", "/api/stories/events", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.active_subscriptions(), 0);
    assert_eq!(read_json(response).await["error"], "User is not authenticated");
}

#[tokio::test]
async fn stream_relays_changes_and_unsubscribes_on_drop() {
    let app = TestApp::new();
    let response = app
        .router()
        .oneshot(request("GET", "/api/stories/events", Some("user_1")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let mut body = response.into_body();
    let mut buffer = String::new();
    assert_eq!(next_event(&mut body, &mut buffer).await, "data: connected");
    assert_eq!(app.store.active_subscriptions(), 1);

    app.store
        .insert(story("7", "STORY-7", "user_2", 3))
        .await
        .expect("insert");
    let frame = next_event(&mut body, &mut buffer).await;
    let json = frame.strip_prefix("data: ").expect("data frame");
    let event: serde_json::Value = serde_json::from_str(json).expect("event json");
    assert_eq!(event["eventType"], "INSERT");
    assert_eq!(event["table"], "story_info");
    assert_eq!(event["new"]["id"], "7");

    drop(body);
    assert_eq!(app.store.active_subscriptions(), 0);
}

#[tokio::test]
async fn one_subscription_per_client() {
    let app = TestApp::new();
    let first = app
        .router()
        .oneshot(request("GET", "/api/stories/events", Some("user_1")))
        .await
        .expect("first");
    let second = app
        .router()
        .oneshot(request("GET", "/api/stories/events", Some("user_2")))
        .await
        .expect("second");
    assert_eq!(app.store.active_subscriptions(), 2);

    drop(first);
    assert_eq!(app.store.active_subscriptions(), 1);
    drop(second);
    assert_eq!(app.store.active_subscriptions(), 0);
}

#[tokio::test]
async fn subscription_failure_emits_error_frame_and_closes() {
    let app = TestApp::new();
    let response = app
        .router()
        .oneshot(request("GET", "/api/stories/events", Some("user_1")))
        .await
        .expect("response");
    let mut body = response.into_body();
    let mut buffer = String::new();
    assert_eq!(next_event(&mut body, &mut buffer).await, "data: connected");

    app.store.fail_subscriptions("channel error");
    let frame = next_event(&mut body, &mut buffer).await;
    assert_eq!(
        frame,
        "event: error\ndata: {\"error\":\"subscription failed\"}"
    );

    let end = tokio::time::timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("stream ends");
    assert!(end.is_none());
    assert_eq!(app.store.active_subscriptions(), 0);
}
