use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::events::{ChatEnvelope, EventContext, EventDispatcher, HandlerResult};

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Sender half handed to the webhook endpoint.
pub type EventSender = mpsc::Sender<ChatEnvelope>;

/// Drains queued chat events one at a time, so a conversation's follow-ups see the campaign
/// remembered by the message before them.
pub struct EventPump {
    receiver: mpsc::Receiver<ChatEnvelope>,
    dispatcher: Arc<EventDispatcher>,
}

impl EventPump {
    pub fn new(receiver: mpsc::Receiver<ChatEnvelope>, dispatcher: EventDispatcher) -> Self {
        Self { receiver, dispatcher: Arc::new(dispatcher) }
    }

    pub fn channel(capacity: usize, dispatcher: EventDispatcher) -> (EventSender, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self::new(receiver, dispatcher))
    }

    /// Runs until every sender is dropped. Returns how many envelopes were handled.
    ///
    /// Each dispatch runs in its own task and is awaited before the next envelope, so a
    /// panicking handler loses only its own envelope.
    pub async fn run(mut self) -> usize {
        info!(
            event_name = "ingress.chat.pump_started",
            handlers = self.dispatcher.handler_count(),
            "chat event pump started"
        );
        let mut handled = 0_usize;

        while let Some(envelope) = self.receiver.recv().await {
            handled += 1;
            let group_id = envelope.event.group_id().unwrap_or("unknown").to_owned();
            info!(
                event_name = "ingress.chat.envelope_received",
                correlation_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                group_id = %group_id,
                "received chat envelope"
            );

            let envelope_id = envelope.envelope_id.clone();
            let context = EventContext { correlation_id: envelope_id.clone() };
            let dispatcher = Arc::clone(&self.dispatcher);
            let task =
                tokio::spawn(async move { dispatcher.dispatch(&envelope, &context).await });

            match task.await {
                Ok(Ok(HandlerResult::Replied { posts })) => debug!(
                    event_name = "ingress.chat.envelope_handled",
                    correlation_id = %envelope_id,
                    group_id = %group_id,
                    posts,
                    "chat envelope answered"
                ),
                Ok(Ok(HandlerResult::Ignored)) => debug!(
                    event_name = "ingress.chat.envelope_ignored",
                    correlation_id = %envelope_id,
                    group_id = %group_id,
                    "chat envelope ignored"
                ),
                Ok(Err(error)) => warn!(
                    event_name = "ingress.chat.dispatch_failed",
                    correlation_id = %envelope_id,
                    group_id = %group_id,
                    error = %error,
                    "event dispatch failed; continuing pump"
                ),
                Err(join_error) => error!(
                    event_name = "ingress.chat.dispatch_panicked",
                    correlation_id = %envelope_id,
                    group_id = %group_id,
                    error = %join_error,
                    "event handler panicked; continuing pump"
                ),
            }
        }

        info!(event_name = "ingress.chat.pump_stopped", handled, "chat event pump stopped");
        handled
    }
}
