use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::client::ChatClientError;

const POST_ADDED: &str = "PostAdded";
const GROUP_JOINED: &str = "GroupJoined";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub envelope_id: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    PostAdded(PostAddedEvent),
    BotJoined(BotJoinedEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::PostAdded(_) => ChatEventType::PostAdded,
            Self::BotJoined(_) => ChatEventType::BotJoined,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }

    pub fn group_id(&self) -> Option<&str> {
        match self {
            Self::PostAdded(event) => Some(&event.group_id),
            Self::BotJoined(event) => Some(&event.group_id),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    PostAdded,
    BotJoined,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostAddedEvent {
    pub group_id: String,
    pub creator_id: String,
    pub text: String,
    pub handled_by_extension: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotJoinedEvent {
    pub group_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("webhook payload is not valid json: {0}")]
    Malformed(String),
    #[error("`{event_type}` event is missing `{field}`")]
    MissingField { event_type: String, field: &'static str },
}

#[derive(Deserialize)]
struct WebhookPayload {
    uuid: Option<String>,
    #[serde(default)]
    body: Map<String, Value>,
}

impl ChatEnvelope {
    /// Reads a RingCentral `{uuid, body: {eventType, ...}}` notification. `fallback_id` names
    /// the envelope when the platform sent no uuid.
    pub fn from_webhook(raw: &[u8], fallback_id: &str) -> Result<Self, EventParseError> {
        let payload: WebhookPayload = serde_json::from_slice(raw)
            .map_err(|error| EventParseError::Malformed(error.to_string()))?;
        let envelope_id = payload
            .uuid
            .filter(|uuid| !uuid.trim().is_empty())
            .unwrap_or_else(|| fallback_id.to_owned());
        let event = parse_body(&payload.body)?;
        Ok(Self { envelope_id, event })
    }
}

fn parse_body(body: &Map<String, Value>) -> Result<ChatEvent, EventParseError> {
    let event_type = body.get("eventType").and_then(Value::as_str).unwrap_or_default();
    let required = |field: &'static str| {
        id_field(body, field).ok_or_else(|| EventParseError::MissingField {
            event_type: event_type.to_owned(),
            field,
        })
    };

    match event_type {
        POST_ADDED => Ok(ChatEvent::PostAdded(PostAddedEvent {
            group_id: required("groupId")?,
            creator_id: required("creatorId")?,
            text: body.get("text").and_then(Value::as_str).unwrap_or_default().to_owned(),
            handled_by_extension: body
                .get("handledByExtension")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })),
        GROUP_JOINED => Ok(ChatEvent::BotJoined(BotJoinedEvent { group_id: required("id")? })),
        other => Ok(ChatEvent::Unsupported { event_type: other.to_owned() }),
    }
}

/// Platform ids arrive as strings or bare numbers depending on the event source.
fn id_field(body: &Map<String, Value>, field: &str) -> Option<String> {
    match body.get(field)? {
        Value::String(value) if !value.trim().is_empty() => Some(value.trim().to_owned()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Replied { posts: usize },
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Send(#[from] ChatClientError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}
