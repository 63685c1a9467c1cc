//! Messaging collaborator seam: the `Messenger` trait and its event types.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::ChannelError;

/// An inbound text message.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Transport message id, if the transport provides one.
    pub message_id: Option<String>,
    /// Transport sender identity, e.g. `972501112222@s.whatsapp.net`.
    pub sender: String,
    /// Sender display name, if known.
    pub sender_name: Option<String>,
    /// Message body.
    pub content: String,
    /// Sent by the bot's own account (echo from another linked device).
    pub is_from_me: bool,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            message_id: None,
            sender: sender.into(),
            sender_name: None,
            content: content.into(),
            is_from_me: false,
            received_at: Utc::now(),
        }
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Mark as sent by our own account.
    pub fn from_me(mut self) -> Self {
        self.is_from_me = true;
        self
    }
}

/// Events delivered by a messenger. Only `Message` matters to the RSVP
/// flow; the rest are connection lifecycle notifications.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(IncomingMessage),
    Connected,
    Disconnected { reason: String },
    LoggedOut,
}

/// Stream of inbound events.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// Acknowledgement of a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReceipt {
    pub message_id: String,
    pub sent_at: DateTime<Utc>,
}

/// Result of a reachability check for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reachability {
    /// Identity as passed to `verify_reachable`.
    pub input: String,
    /// Whether the identity is registered on the network.
    pub reachable: bool,
    /// Identity to address messages to when reachable.
    pub resolved: Option<String>,
}

/// External messaging service. Connection lifecycle, pairing, and session
/// persistence belong to the implementation, never to callers.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Short channel name used in logs and errors.
    fn name(&self) -> &str;

    /// Begin receiving inbound events. Callable once.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Send a text message. Single attempt, no retry.
    async fn send_text(&self, recipient: &str, body: &str)
    -> Result<MessageReceipt, ChannelError>;

    /// Check which identities can receive messages. One entry per input,
    /// in input order.
    async fn verify_reachable(
        &self,
        identities: &[String],
    ) -> Result<Vec<Reachability>, ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
