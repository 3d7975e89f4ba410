//! Discord channel adapter (stub).
//!
//! Implements the Channel trait for the Discord Bot API. In production this
//! would sit on a gateway client (slash command registration, DM channels).
//! Currently a stub: outbound traffic is logged, and inbound messages and
//! slash-command invocations are injected in-process.

use std::collections::HashSet;

use async_trait::async_trait;
use giftbot_config::DiscordConfig;
use giftbot_core::channel::{Channel, ChannelId, ChannelMessage, InboundEvent, UserId};
use giftbot_core::command::{CommandInvocation, CommandReply};
use giftbot_core::error::ChannelError;
use tokio::sync::{Mutex, mpsc};
use tracing::info;

type Inbound = mpsc::Sender<Result<InboundEvent, ChannelError>>;

/// Discord channel adapter.
pub struct DiscordChannel {
    config: DiscordConfig,
    inject_tx: Mutex<Option<Inbound>>,
    /// Users whose privacy settings refuse direct messages
    dms_closed: Mutex<HashSet<UserId>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            inject_tx: Mutex::new(None),
            dms_closed: Mutex::new(HashSet::new()),
        }
    }

    /// Whether `user` may run game commands regardless of their guild
    /// permissions. `["*"]` allows everyone.
    pub fn is_allowed(&self, user: &UserId) -> bool {
        self.config
            .allowed_users
            .iter()
            .any(|u| u == "*" || u == user.as_str())
    }

    /// Inject a message as if it came from Discord (for testing).
    pub async fn inject_message(&self, msg: ChannelMessage) -> Result<(), ChannelError> {
        self.inject(InboundEvent::Message(msg)).await
    }

    /// Inject a slash-command invocation. `authorized` carries the
    /// manage-messages permission; allow-listed users are always authorized.
    pub async fn inject_command(&self, mut invocation: CommandInvocation) -> Result<(), ChannelError> {
        invocation.authorized = invocation.authorized || self.is_allowed(&invocation.invoker_id);
        self.inject(InboundEvent::Command(invocation)).await
    }

    /// Simulate a user who refuses direct messages.
    pub async fn close_dms(&self, user: UserId) {
        self.dms_closed.lock().await.insert(user);
    }

    async fn inject(&self, event: InboundEvent) -> Result<(), ChannelError> {
        let guard = self.inject_tx.lock().await;
        if let Some(tx) = guard.as_ref() {
            tx.send(Ok(event))
                .await
                .map_err(|_| ChannelError::ConnectionLost("Message channel closed".into()))
        } else {
            Err(ChannelError::ConnectionLost("Channel not started".into()))
        }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<InboundEvent, ChannelError>>, ChannelError> {
        if self.config.bot_token.as_deref().is_none_or(str::is_empty) {
            return Err(ChannelError::NotConfigured(
                "discord.bot_token (or BOT_TOKEN) is not set".into(),
            ));
        }
        info!("Discord channel starting (stub mode)");
        let (tx, rx) = mpsc::channel(64);
        *self.inject_tx.lock().await = Some(tx);
        Ok(rx)
    }

    async fn send(&self, channel: &ChannelId, content: &str) -> Result<(), ChannelError> {
        info!(
            channel = %channel,
            content_len = content.len(),
            "Discord send (stub)"
        );
        Ok(())
    }

    async fn send_direct(&self, user: &UserId, content: &str) -> Result<(), ChannelError> {
        if self.dms_closed.lock().await.contains(user) {
            return Err(ChannelError::RecipientUnreachable {
                recipient: user.to_string(),
                reason: "Cannot send messages to this user".into(),
            });
        }
        info!(user = %user, content_len = content.len(), "Discord DM (stub)");
        Ok(())
    }

    async fn respond(
        &self,
        invocation: &CommandInvocation,
        reply: &CommandReply,
    ) -> Result<(), ChannelError> {
        info!(
            channel = %invocation.channel_id,
            command = %invocation.name,
            visibility = ?reply.visibility,
            content_len = reply.content.len(),
            "Discord interaction response (stub)"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Discord channel stopping");
        *self.inject_tx.lock().await = None;
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        Ok(self.inject_tx.lock().await.is_some())
    }
}
