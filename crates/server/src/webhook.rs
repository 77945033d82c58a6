//! `POST /webhook`: RingCentral event subscription endpoint.
//!
//! Notifications are parsed and queued for the event pump; the response never waits on the
//! agent. Subscription setup requests carry a `Validation-Token` header that must be echoed.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::HeaderName, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use clarity_chat::{ChatEnvelope, EventSender};
use clarity_core::InterfaceError;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};
use uuid::Uuid;

const VALIDATION_TOKEN: &str = "validation-token";
const VERIFICATION_TOKEN: &str = "verification-token";

#[derive(Clone)]
pub struct WebhookState {
    events: EventSender,
    verification_token: Option<SecretString>,
}

impl WebhookState {
    pub fn new(events: EventSender, verification_token: Option<SecretString>) -> Self {
        Self { events, verification_token }
    }
}

#[derive(Debug, Serialize)]
struct WebhookAck {
    accepted: bool,
    correlation_id: String,
}

#[derive(Debug, Serialize)]
struct WebhookRejection {
    error: &'static str,
    detail: String,
    correlation_id: String,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/webhook", post(receive)).with_state(state)
}

async fn receive(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> Response {
    let correlation_id = Uuid::new_v4().simple().to_string();

    if let Some(token) = headers.get(VALIDATION_TOKEN) {
        info!(
            event_name = "ingress.webhook.validation",
            correlation_id = %correlation_id,
            "echoing subscription validation token"
        );
        return (StatusCode::OK, [(HeaderName::from_static(VALIDATION_TOKEN), token.clone())])
            .into_response();
    }

    if let Some(expected) = &state.verification_token {
        let provided = headers.get(VERIFICATION_TOKEN).and_then(|value| value.to_str().ok());
        if provided != Some(expected.expose_secret()) {
            warn!(
                event_name = "ingress.webhook.unverified",
                correlation_id = %correlation_id,
                "webhook verification token missing or wrong"
            );
            return rejection(
                StatusCode::UNAUTHORIZED,
                InterfaceError::Unauthorized {
                    message: "verification token mismatch".to_owned(),
                    correlation_id,
                },
            );
        }
    }

    let envelope = match ChatEnvelope::from_webhook(&body, &correlation_id) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(
                event_name = "ingress.webhook.rejected",
                correlation_id = %correlation_id,
                error = %error,
                "webhook payload could not be parsed"
            );
            return rejection(
                StatusCode::BAD_REQUEST,
                InterfaceError::BadRequest { message: error.to_string(), correlation_id },
            );
        }
    };

    let envelope_id = envelope.envelope_id.clone();
    let event_type = envelope.event.event_type();
    match state.events.try_send(envelope) {
        Ok(()) => {
            info!(
                event_name = "ingress.webhook.queued",
                correlation_id = %envelope_id,
                event_type = ?event_type,
                "chat event queued"
            );
            (StatusCode::OK, Json(WebhookAck { accepted: true, correlation_id: envelope_id }))
                .into_response()
        }
        Err(error) => {
            let message = match error {
                TrySendError::Full(_) => "event queue is full",
                TrySendError::Closed(_) => "event pump is not running",
            };
            warn!(
                event_name = "ingress.webhook.dropped",
                correlation_id = %envelope_id,
                reason = message,
                "chat event could not be queued"
            );
            rejection(
                StatusCode::SERVICE_UNAVAILABLE,
                InterfaceError::ServiceUnavailable {
                    message: message.to_owned(),
                    correlation_id: envelope_id,
                },
            )
        }
    }
}

fn rejection(status: StatusCode, error: InterfaceError) -> Response {
    let body = WebhookRejection {
        error: error.user_message(),
        detail: error.to_string(),
        correlation_id: error.correlation_id().to_owned(),
    };
    (status, Json(body)).into_response()
}
