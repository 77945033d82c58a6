use std::sync::Arc;

use async_trait::async_trait;
use clarity_agent::conversation::{is_help_request, is_identity_question};
use clarity_agent::{AgentRunner, ConversationResolver};
use tracing::{debug, info};

use crate::client::ChatClient;
use crate::events::{
    ChatEnvelope, ChatEvent, ChatEventType, EventContext, EventDispatcher, EventHandler,
    EventHandlerError, HandlerResult, PostAddedEvent,
};
use crate::messages;

/// Answers mentions of the bot: identity and help texts first, then campaign analysis for
/// anything that names a campaign or follows up on one.
pub struct CampaignPostHandler {
    bot_id: String,
    client: Arc<dyn ChatClient>,
    resolver: ConversationResolver,
    agent: Arc<dyn AgentRunner>,
}

impl CampaignPostHandler {
    pub fn new(
        bot_id: impl Into<String>,
        client: Arc<dyn ChatClient>,
        resolver: ConversationResolver,
        agent: Arc<dyn AgentRunner>,
    ) -> Self {
        Self { bot_id: bot_id.into(), client, resolver, agent }
    }

    /// Text addressed to the bot with the mention removed, or `None` when the post is not
    /// for the bot.
    pub fn addressed_text(&self, event: &PostAddedEvent) -> Option<String> {
        if event.handled_by_extension || event.creator_id == self.bot_id {
            return None;
        }
        let mention = messages::mention(&self.bot_id);
        if !event.text.contains(&mention) {
            return None;
        }
        Some(event.text.replace(&mention, "").trim().to_owned())
    }

    async fn reply(&self, group_id: &str, text: &str) -> Result<(), EventHandlerError> {
        self.client.send_message(group_id, text).await.map_err(EventHandlerError::from)
    }
}

#[async_trait]
impl EventHandler for CampaignPostHandler {
    fn event_type(&self) -> ChatEventType {
        ChatEventType::PostAdded
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::PostAdded(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        let Some(text) = self.addressed_text(event) else {
            debug!(
                event_name = "chat.post.skipped",
                correlation_id = %ctx.correlation_id,
                group_id = %event.group_id,
                "post not addressed to bot"
            );
            return Ok(HandlerResult::Ignored);
        };
        let group_id = event.group_id.as_str();

        if is_identity_question(&text) {
            self.reply(group_id, &messages::identity()).await?;
            return Ok(HandlerResult::Replied { posts: 1 });
        }
        if is_help_request(&text) {
            self.reply(group_id, &messages::help(&self.bot_id)).await?;
            return Ok(HandlerResult::Replied { posts: 1 });
        }

        let Some(request) = self.resolver.resolve(group_id, &text) else {
            info!(
                event_name = "chat.post.no_campaign",
                correlation_id = %ctx.correlation_id,
                group_id,
                "mention carried no campaign id"
            );
            self.reply(group_id, &messages::need_campaign_id(&event.creator_id)).await?;
            return Ok(HandlerResult::Replied { posts: 1 });
        };

        info!(
            event_name = "chat.analysis.started",
            correlation_id = %ctx.correlation_id,
            group_id,
            campaign_id = %request.campaign_id,
            intent = request.intent.as_str(),
            follow_up = request.follow_up,
            "analyzing campaign"
        );
        self.reply(group_id, &messages::thinking(request.intent, &request.campaign_id)).await?;

        let response = self.agent.run(&request.message, request.intent).await;
        info!(
            event_name = "chat.analysis.finished",
            correlation_id = %ctx.correlation_id,
            group_id,
            campaign_id = %request.campaign_id,
            success = response.success,
            iterations = response.iterations,
            "campaign analysis finished"
        );
        self.reply(group_id, &messages::agent_reply(&response)).await?;
        Ok(HandlerResult::Replied { posts: 2 })
    }
}

/// Greets a group the bot has just been added to.
pub struct WelcomeHandler {
    bot_id: String,
    client: Arc<dyn ChatClient>,
}

impl WelcomeHandler {
    pub fn new(bot_id: impl Into<String>, client: Arc<dyn ChatClient>) -> Self {
        Self { bot_id: bot_id.into(), client }
    }
}

#[async_trait]
impl EventHandler for WelcomeHandler {
    fn event_type(&self) -> ChatEventType {
        ChatEventType::BotJoined
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::BotJoined(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        info!(
            event_name = "chat.group.joined",
            correlation_id = %ctx.correlation_id,
            group_id = %event.group_id,
            "bot joined group"
        );
        self.client.send_message(&event.group_id, &messages::welcome(&self.bot_id)).await?;
        Ok(HandlerResult::Replied { posts: 1 })
    }
}

pub fn campaign_dispatcher(
    bot_id: &str,
    client: Arc<dyn ChatClient>,
    resolver: ConversationResolver,
    agent: Arc<dyn AgentRunner>,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(CampaignPostHandler::new(bot_id, client.clone(), resolver, agent));
    dispatcher.register(WelcomeHandler::new(bot_id, client));
    dispatcher
}
