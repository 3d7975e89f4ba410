//! Inbound routing — one ordered queue per conversation.
//!
//! Every channel gets a worker task that applies its messages and commands
//! strictly in arrival order, so a tie goes to whoever spoke first and a
//! guess sent after `pause` is never evaluated before it. Different
//! channels proceed in parallel.
//!
//! Each event runs in its own task awaited by the worker. A panic while
//! handling one event is logged and a command gets the generic failure
//! reply. A worker that does die is replaced on its channel's next event.

use std::collections::HashMap;
use std::sync::Arc;

use giftbot_core::channel::{ChannelId, InboundEvent};
use giftbot_core::error::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::commands::CommandHandler;

pub struct InboundRouter {
    commands: Arc<CommandHandler>,
    workers: HashMap<ChannelId, mpsc::UnboundedSender<InboundEvent>>,
    tasks: JoinSet<()>,
}

impl InboundRouter {
    pub fn new(commands: Arc<CommandHandler>) -> Self {
        Self {
            commands,
            workers: HashMap::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Queue `event` behind everything already received for its channel.
    pub fn route(&mut self, event: InboundEvent) {
        self.reap();
        let channel = channel_of(&event).clone();

        let event = match self.workers.get(&channel) {
            Some(tx) => match tx.send(event) {
                Ok(()) => return,
                Err(mpsc::error::SendError(event)) => {
                    warn!(channel = %channel, "Inbound worker gone, restarting it");
                    event
                }
            },
            None => event,
        };

        let tx = self.spawn_worker(&channel);
        if tx.send(event).is_err() {
            error!(channel = %channel, "Inbound worker exited before its first event");
        }
        self.workers.insert(channel, tx);
    }

    /// Channels that currently have a worker.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Stop accepting events and wait until every queued one is applied.
    pub async fn shutdown(mut self) {
        self.workers.clear();
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Inbound worker failed");
            }
        }
    }

    fn spawn_worker(&mut self, channel: &ChannelId) -> mpsc::UnboundedSender<InboundEvent> {
        debug!(channel = %channel, "Starting inbound worker");
        let (tx, rx) = mpsc::unbounded_channel();
        self.tasks.spawn(drain(self.commands.clone(), rx));
        tx
    }

    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                error!(error = %e, "Inbound worker failed");
            }
        }
    }
}

fn channel_of(event: &InboundEvent) -> &ChannelId {
    match event {
        InboundEvent::Message(message) => &message.channel_id,
        InboundEvent::Command(invocation) => &invocation.channel_id,
    }
}

async fn drain(commands: Arc<CommandHandler>, mut rx: mpsc::UnboundedReceiver<InboundEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            InboundEvent::Message(message) => {
                let channel = message.channel_id.clone();
                let controller = commands.controller().clone();
                let task = tokio::spawn(async move {
                    controller.handle_message(&message).await;
                });
                if let Err(e) = task.await {
                    error!(channel = %channel, error = %e, "Guess handling failed");
                }
            }
            InboundEvent::Command(invocation) => {
                let task = {
                    let commands = commands.clone();
                    let invocation = invocation.clone();
                    tokio::spawn(async move { commands.respond(&invocation).await })
                };
                if let Err(e) = task.await {
                    let failure = Error::Internal(format!("command task failed: {e}"));
                    let reply = CommandHandler::failure_reply(&invocation, &failure);
                    commands.deliver(&invocation, &reply).await;
                }
            }
        }
    }
}
