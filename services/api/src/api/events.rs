//! Change stream endpoint.
//!
//! # Purpose
//! Serves the relay as `text/event-stream`. One store subscription is held
//! per open response; it is released when the client goes away.
use crate::api::error::{ApiError, api_unauthorized};
use crate::api::types::ErrorResponse;
use crate::app::AppState;
use crate::auth::RequestAuth;
use crate::relay::{RelayFrame, relay_frames};
use crate::store::{ChangeFilter, ChangeSubscription, Credentials, StoreResult};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, BoxStream, StreamExt};
use std::convert::Infallible;
use storyboard_core::StoryError;

type EventStream = BoxStream<'static, Result<Event, Infallible>>;

#[utoipa::path(
    get,
    path = "/api/stories/events",
    tag = "stories",
    responses(
        (status = 200, description = "Server-sent change events", body = String, content_type = "text/event-stream"),
        (status = 401, description = "No session", body = ErrorResponse)
    )
)]
pub(crate) async fn story_events(
    State(state): State<AppState>,
    auth: RequestAuth,
) -> Result<Sse<EventStream>, ApiError> {
    let Some(credentials) = auth.credentials() else {
        return Err(api_unauthorized(&StoryError::NotAuthenticated.to_string()));
    };
    let frames = match open_subscription(&state, &credentials).await {
        Ok(subscription) => relay_frames(subscription).boxed(),
        Err(err) => {
            tracing::error!(error = %err, "failed to open change subscription");
            stream::iter([RelayFrame::Connected, RelayFrame::Error]).boxed()
        }
    };
    let events: EventStream = frames
        .map(|frame| Ok::<_, Infallible>(frame.into_event()))
        .boxed();
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn open_subscription(
    state: &AppState,
    credentials: &Credentials,
) -> StoreResult<ChangeSubscription> {
    let connection = state.store.connect(credentials).await?;
    connection
        .subscribe_to_changes(&state.relay.channel, &ChangeFilter::table(&state.relay.table))
        .await
}
