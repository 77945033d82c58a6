//! Campaign agent: the tool-calling loop that turns a chat question about a Salesforce
//! campaign into a sales-ready answer.
//!
//! # Flow
//!
//! 1. **Conversation rules** (`conversation`): campaign id extraction, follow-up resolution
//!    and keyword intent classification.
//! 2. **Planning** (`llm`, `openai`): a [`llm::Planner`] sees the transcript and either
//!    answers or requests tool calls.
//! 3. **Tools** (`tools`): fetch, enrich and describe, each returning a uniform
//!    `{success, ...}` JSON object.
//! 4. **Runtime** (`runtime`): runs the loop up to a fixed number of planner calls.
//! 5. **Assembly** (`assembly`): wires the above from `AppConfig`.
//!
//! The model only decides which tool to call next. Campaign data and field meanings come
//! from Salesforce and the static mapping table, never from the model.

pub mod assembly;
pub mod conversation;
pub mod description;
pub mod llm;
pub mod openai;
pub mod prompts;
pub mod runtime;
pub mod tools;

pub use assembly::{
    build_campaign_agent, conversation_resolver, conversation_store, AssemblyError,
};
pub use conversation::{
    classify_intent, ConversationResolver, ConversationStore, InMemoryConversationStore,
    ResolvedRequest,
};
pub use description::{DescriptionGenerator, LlmDescriptionGenerator, PromptType};
pub use llm::{LlmClient, LlmError, Planner, PlannerStep};
pub use openai::OpenAiChatClient;
pub use runtime::{AgentResponse, AgentRunner, CampaignAgent, DEFAULT_MAX_ITERATIONS};
pub use tools::{campaign_tools, ToolRegistry};
