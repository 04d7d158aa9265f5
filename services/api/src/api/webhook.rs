//! Inbound workflow webhook.
//!
//! # Purpose
//! Receives generated story definitions from the workflow engine. The body is
//! authenticated by HMAC signature before it is parsed.
//!
//! # Security considerations
//! - Verification is skipped only in development mode.
//! - Outside development a missing secret is a server fault, never a bypass.
use crate::api::error::{ApiError, api_configuration_error, api_unauthorized, api_validation_error};
use crate::api::types::{ErrorResponse, WebhookPayload};
use crate::app::AppState;
use crate::auth::signature::{SIGNATURE_HEADER, verify_signature};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;

#[utoipa::path(
    post,
    path = "/api/webhook",
    tag = "webhook",
    request_body = WebhookPayload,
    params(("x-webhook-signature" = Option<String>, Header, description = "Hex HMAC-SHA256 of the raw body")),
    responses(
        (status = 200, description = "Webhook accepted", body = String, content_type = "text/plain"),
        (status = 400, description = "Malformed or incomplete payload", body = ErrorResponse),
        (status = 401, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 500, description = "Webhook secret not configured", body = ErrorResponse)
    )
)]
pub(crate) async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    if state.environment.is_development() {
        tracing::debug!("development mode: skipping webhook signature verification");
    } else {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| api_unauthorized("No signature provided"))?;
        let Some(secret) = state.webhook_secret.as_deref() else {
            tracing::error!("webhook secret is not configured");
            return Err(api_configuration_error("Webhook secret is not configured"));
        };
        if !verify_signature(secret, &body, signature) {
            tracing::warn!("webhook signature verification failed");
            return Err(api_unauthorized("Invalid signature"));
        }
    }

    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|err| {
        tracing::warn!(error = %err, "webhook payload is not valid json");
        api_validation_error("Invalid payload")
    })?;
    if !payload.is_complete() {
        return Err(api_validation_error("Missing required fields"));
    }

    tracing::info!(
        timestamp = payload.timestamp.as_deref().unwrap_or_default(),
        environment = ?state.environment,
        "received story definitions from workflow"
    );
    Ok("Webhook processed successfully")
}
