//! Chat integration: RingCentral team messaging front end for the campaign agent.
//!
//! - **Events** (`events`): webhook notification parsing and the handler dispatcher
//! - **Handlers** (`handlers`): mention detection, identity/help replies, campaign analysis
//! - **Messages** (`messages`): every text the bot posts
//! - **Client** (`client`): outbound posts over the REST API, plus an in-memory recorder
//! - **Runner** (`runner`): the single queue-draining event pump
//!
//! # Architecture
//!
//! ```text
//! POST /webhook → EventSender → EventPump → EventDispatcher → Handlers → AgentRunner
//!                                                                 ↓
//!                                                     ChatClient::send_message
//! ```

pub mod client;
pub mod events;
pub mod handlers;
pub mod messages;
pub mod runner;

pub use client::{ChatClient, ChatClientError, RecordingChatClient, RingCentralChatClient};
pub use events::{ChatEnvelope, ChatEvent, EventDispatcher, EventParseError};
pub use handlers::campaign_dispatcher;
pub use runner::{EventPump, EventSender, DEFAULT_QUEUE_CAPACITY};
