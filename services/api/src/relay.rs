//! Change relay.
//!
//! # Purpose
//! Turns one store [`ChangeSubscription`] into the frame sequence pushed to a
//! browser over server-sent events.
//!
//! # Key invariants
//! - The first frame is always the `connected` sentinel.
//! - Each store event becomes exactly one frame, in delivery order.
//! - A subscription error yields one `error` frame and ends the stream.
//! - The subscription lives inside the frame stream, so dropping the response
//!   body unsubscribes.
use crate::observability::RELAY_EVENTS_TOTAL;
use crate::store::ChangeSubscription;
use axum::response::sse::Event;
use futures::stream::{self, Stream, StreamExt};
use storyboard_core::ChangeEvent;

pub const CONNECTED_SENTINEL: &str = "connected";
const SUBSCRIPTION_FAILED: &str = r#"{"error":"subscription failed"}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    Connected,
    Change(String),
    Error,
}

impl RelayFrame {
    fn change(event: &ChangeEvent) -> Option<Self> {
        match serde_json::to_string(event) {
            Ok(json) => Some(Self::Change(json)),
            Err(err) => {
                tracing::error!(error = %err, "failed to encode change event");
                None
            }
        }
    }

    pub fn into_event(self) -> Event {
        match self {
            Self::Connected => Event::default().data(CONNECTED_SENTINEL),
            Self::Change(json) => Event::default().data(json),
            Self::Error => Event::default().event("error").data(SUBSCRIPTION_FAILED),
        }
    }
}

enum RelayState {
    Open(ChangeSubscription),
    Closed,
}

pub fn relay_frames(subscription: ChangeSubscription) -> impl Stream<Item = RelayFrame> + Send {
    let changes = stream::unfold(RelayState::Open(subscription), |state| async move {
        let RelayState::Open(mut subscription) = state else {
            return None;
        };
        loop {
            match subscription.next().await {
                Some(Ok(event)) => {
                    let Some(frame) = RelayFrame::change(&event) else {
                        continue;
                    };
                    metrics::counter!(
                        RELAY_EVENTS_TOTAL,
                        "event_type" => event.event_type.as_str()
                    )
                    .increment(1);
                    return Some((frame, RelayState::Open(subscription)));
                }
                Some(Err(err)) => {
                    tracing::error!(error = %err, "change subscription failed");
                    drop(subscription);
                    return Some((RelayFrame::Error, RelayState::Closed));
                }
                None => return None,
            }
        }
    });
    stream::once(async { RelayFrame::Connected }).chain(changes)
}
