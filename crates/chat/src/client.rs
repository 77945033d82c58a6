use std::time::Duration;

use async_trait::async_trait;
use clarity_core::config::ChatConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatClientError {
    #[error("chat client could not be built: {0}")]
    Build(String),
    #[error("chat post failed: {0}")]
    Network(String),
    #[error("chat post rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound half of the chat boundary: post one text message into a group.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_message(&self, group_id: &str, text: &str) -> Result<(), ChatClientError>;
}

/// Posts through the RingCentral team messaging REST API with a pre-issued bot token.
pub struct RingCentralChatClient {
    http: Client,
    api_base_url: String,
    bot_token: SecretString,
}

impl RingCentralChatClient {
    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatClientError> {
        let http = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|error| ChatClientError::Build(error.to_string()))?;
        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            bot_token: config.bot_token.clone(),
        })
    }

    pub fn posts_endpoint(&self, group_id: &str) -> String {
        format!("{}/restapi/v1.0/glip/chats/{group_id}/posts", self.api_base_url)
    }
}

#[async_trait]
impl ChatClient for RingCentralChatClient {
    async fn send_message(&self, group_id: &str, text: &str) -> Result<(), ChatClientError> {
        let response = self
            .http
            .post(self.posts_endpoint(group_id))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|error| ChatClientError::Network(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "chat.post.rejected",
                group_id,
                status = status.as_u16(),
                "chat api rejected post"
            );
            return Err(ChatClientError::Rejected { status: status.as_u16(), body });
        }

        debug!(event_name = "chat.post.sent", group_id, chars = text.len(), "posted chat message");
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub group_id: String,
    pub text: String,
}

/// Keeps every post in memory instead of sending it. Used by tests and dry runs.
#[derive(Default)]
pub struct RecordingChatClient {
    sent: Mutex<Vec<SentMessage>>,
    failure: Option<ChatClientError>,
}

impl RecordingChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: ChatClientError) -> Self {
        Self { failure: Some(error), ..Self::default() }
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn texts_for(&self, group_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|message| message.group_id == group_id)
            .map(|message| message.text.clone())
            .collect()
    }
}

#[async_trait]
impl ChatClient for RecordingChatClient {
    async fn send_message(&self, group_id: &str, text: &str) -> Result<(), ChatClientError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.sent
            .lock()
            .await
            .push(SentMessage { group_id: group_id.to_owned(), text: text.to_owned() });
        Ok(())
    }
}
