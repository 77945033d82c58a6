use std::sync::Arc;

use clarity_agent::{build_campaign_agent, conversation_resolver, AgentRunner, AssemblyError};
use clarity_chat::{
    campaign_dispatcher, ChatClient, ChatClientError, EventDispatcher, RingCentralChatClient,
};
use clarity_core::config::{AppConfig, ConfigError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub dispatcher: EventDispatcher,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    ChatClient(#[from] ChatClientError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let agent = build_campaign_agent(&config)?;
    let client = RingCentralChatClient::from_config(&config.chat)?;
    bootstrap_with_parts(config, Arc::new(client), Arc::new(agent))
}

/// Wires the chat front end around an already-built agent and chat client.
pub fn bootstrap_with_parts(
    config: AppConfig,
    client: Arc<dyn ChatClient>,
    agent: Arc<dyn AgentRunner>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let resolver = conversation_resolver(&config.agent)?;
    let dispatcher = campaign_dispatcher(&config.chat.bot_id, client, resolver, agent);

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        handlers = dispatcher.handler_count(),
        conversation_ttl_secs = config.agent.conversation_ttl_secs,
        "application bootstrap complete"
    );
    Ok(Application { config, dispatcher })
}
