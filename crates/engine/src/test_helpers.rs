//! Shared test helpers for engine tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use giftbot_core::channel::{Channel, ChannelId, InboundEvent, UserId};
use giftbot_core::error::ChannelError;
use giftbot_core::event::EventBus;
use giftbot_core::game::GameSettings;
use tokio::sync::mpsc;

use crate::lifecycle::RoundController;
use crate::registry::GameRegistry;

/// A channel that records everything sent through it.
///
/// Direct messages to users marked unreachable fail with
/// `RecipientUnreachable`; users marked failing get `DeliveryFailed`.
/// Posts into a channel marked crashing panic, like a buggy adapter.
#[derive(Default)]
pub struct RecordingChannel {
    posts: Mutex<Vec<(ChannelId, String)>>,
    direct: Mutex<Vec<(UserId, String)>>,
    unreachable: HashSet<String>,
    failing: HashSet<String>,
    crashing: HashSet<String>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(mut self, user: &str) -> Self {
        self.unreachable.insert(user.to_string());
        self
    }

    pub fn failing_direct(mut self, user: &str) -> Self {
        self.failing.insert(user.to_string());
        self
    }

    pub fn crashing_in(mut self, channel: &str) -> Self {
        self.crashing.insert(channel.to_string());
        self
    }

    /// Content of every channel post, in order.
    pub fn posts(&self) -> Vec<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub fn direct_messages(&self) -> Vec<(UserId, String)> {
        self.direct.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<InboundEvent, ChannelError>>, ChannelError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(&self, channel: &ChannelId, content: &str) -> Result<(), ChannelError> {
        if self.crashing.contains(channel.as_str()) {
            panic!("adapter crashed posting to {channel}");
        }
        self.posts
            .lock()
            .unwrap()
            .push((channel.clone(), content.to_string()));
        Ok(())
    }

    async fn send_direct(&self, user: &UserId, content: &str) -> Result<(), ChannelError> {
        if self.unreachable.contains(user.as_str()) {
            return Err(ChannelError::RecipientUnreachable {
                recipient: user.to_string(),
                reason: "direct messages disabled".into(),
            });
        }
        if self.failing.contains(user.as_str()) {
            return Err(ChannelError::DeliveryFailed {
                channel: "recording".into(),
                reason: "gateway error".into(),
            });
        }
        self.direct
            .lock()
            .unwrap()
            .push((user.clone(), content.to_string()));
        Ok(())
    }
}

/// A controller over a fresh registry in a temp dir. Keep the returned
/// `TempDir` alive for the duration of the test.
pub fn controller_with(
    channel: RecordingChannel,
) -> (RoundController, Arc<RecordingChannel>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let registry = GameRegistry::new(dir.path().join("game_state.json"), GameSettings::default());
    let channel = Arc::new(channel);
    let controller = RoundController::new(
        Arc::new(registry),
        channel.clone(),
        Arc::new(EventBus::default()),
    );
    (controller, channel, dir)
}
