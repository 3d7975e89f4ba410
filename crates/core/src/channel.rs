//! Channel trait — the abstraction over chat platforms.
//!
//! A Channel connects giftbot to a messaging platform (Discord, CLI, etc.).
//! It yields inbound text messages and command invocations, and delivers
//! outbound text to a conversation or directly to a user. The engine only
//! decides *when* and *what* to send; *how* is the channel's business.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::command::{CommandInvocation, CommandReply};
use crate::error::ChannelError;

/// Platform ids arrive as strings or as bare integers (older snapshots
/// stored Discord snowflakes as JSON numbers).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Identifier of a conversation (a chat channel). The unit of game-state
/// partitioning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer).map(|raw| ChannelId(raw.into_string()))
    }
}

/// Identifier of a platform user (message author, command invoker, winner).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer).map(|raw| UserId(raw.into_string()))
    }
}

/// A text message received from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The conversation this message was posted in
    pub channel_id: ChannelId,

    /// Author identifier (platform-specific user ID)
    pub sender_id: UserId,

    /// Human-readable author name (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    /// The text content
    pub content: String,

    /// Whether the author is a bot account
    #[serde(default)]
    pub is_bot: bool,
}

impl ChannelMessage {
    /// A plain human-authored message.
    pub fn text(channel_id: ChannelId, sender_id: UserId, content: impl Into<String>) -> Self {
        Self {
            channel_id,
            sender_id,
            sender_name: None,
            content: content.into(),
            is_bot: false,
        }
    }
}

/// Everything a channel can hand to the engine.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// Free text posted in a conversation; a potential guess.
    Message(ChannelMessage),
    /// A structured command invocation with named parameters.
    Command(CommandInvocation),
}

/// The core Channel trait.
///
/// Implementations handle platform-specific connection logic, message
/// formatting, and authentication.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "discord", "cli").
    fn name(&self) -> &str;

    /// Start listening for inbound events.
    ///
    /// Returns a receiver that yields messages and command invocations.
    /// The implementation handles polling or gateway connections internally.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<InboundEvent, ChannelError>>,
        ChannelError,
    >;

    /// Post text into a conversation.
    async fn send(&self, channel: &ChannelId, content: &str)
    -> std::result::Result<(), ChannelError>;

    /// Deliver text privately to a single user.
    ///
    /// Must return [`ChannelError::RecipientUnreachable`] when the platform
    /// refuses delivery to that user (e.g. direct messages disabled).
    async fn send_direct(&self, user: &UserId, content: &str)
    -> std::result::Result<(), ChannelError>;

    /// Answer a command invocation.
    ///
    /// Platforms without private replies post everything into the
    /// conversation.
    async fn respond(
        &self,
        invocation: &CommandInvocation,
        reply: &CommandReply,
    ) -> std::result::Result<(), ChannelError> {
        self.send(&invocation.channel_id, &reply.content).await
    }

    /// Render a reference to a user that the platform highlights.
    fn mention(&self, user: &UserId) -> String {
        format!("<@{user}>")
    }

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    /// Whether the channel is connected and operational.
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_message_creation() {
        let msg = ChannelMessage::text(ChannelId::new("123"), UserId::new("alice"), "I say 42");
        assert_eq!(msg.channel_id.as_str(), "123");
        assert_eq!(msg.content, "I say 42");
        assert!(!msg.is_bot);
    }

    #[test]
    fn ids_accept_numbers_and_strings() {
        let from_number: ChannelId = serde_json::from_str("1180012345678901234").unwrap();
        assert_eq!(from_number.as_str(), "1180012345678901234");

        let from_text: UserId = serde_json::from_str("\"u-7\"").unwrap();
        assert_eq!(from_text, UserId::new("u-7"));

        // Always written back as strings
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"1180012345678901234\"");
    }

    #[test]
    fn message_without_bot_flag_defaults_to_human() {
        let msg: ChannelMessage = serde_json::from_str(
            r#"{"channel_id": "c1", "sender_id": 7, "content": "hello"}"#,
        )
        .unwrap();
        assert!(!msg.is_bot);
        assert_eq!(msg.sender_id.as_str(), "7");
    }
}
