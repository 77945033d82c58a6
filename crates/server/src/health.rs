use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use clarity_chat::EventSender;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    events: EventSender,
    model: String,
}

impl HealthState {
    pub fn new(events: EventSender, model: impl Into<String>) -> Self {
        Self { events, model: model.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub event_queue: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let event_queue = queue_check(&state.events);
    let ready = event_queue.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("clarity-server running with model `{}`", state.model),
        },
        event_queue,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn queue_check(events: &EventSender) -> HealthCheck {
    if events.is_closed() {
        return HealthCheck { status: "degraded", detail: "event pump is not running".to_owned() };
    }
    HealthCheck {
        status: "ready",
        detail: format!("{} of {} queue slots free", events.capacity(), events.max_capacity()),
    }
}
