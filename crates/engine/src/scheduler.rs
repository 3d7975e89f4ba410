//! Timeout scheduler.
//!
//! Wakes on a fixed interval and finalizes every round whose deadline has
//! passed. Each channel is checked in its own task, so a failure in one
//! channel is logged and the rest of the tick carries on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::lifecycle::RoundController;

pub struct RoundScheduler {
    controller: Arc<RoundController>,
    interval: Duration,
}

impl RoundScheduler {
    pub fn new(controller: Arc<RoundController>, interval: Duration) -> Self {
        Self {
            controller,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one pass over every channel. Returns how many rounds were
    /// finalized.
    pub async fn tick(&self) -> usize {
        let channels = self.controller.registry().channel_ids().await;
        let mut checks = JoinSet::new();

        for channel in channels {
            let controller = self.controller.clone();
            checks.spawn(async move {
                let outcome = controller.finalize_if_expired(&channel).await;
                (channel, outcome)
            });
        }

        let mut finalized = 0;
        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok((channel, Some(outcome))) => {
                    debug!(channel = %channel, round = outcome.round, "Round timed out");
                    finalized += 1;
                }
                Ok((_, None)) => {}
                Err(e) => error!(error = %e, "Timeout check failed"),
            }
        }
        finalized
    }

    /// Spawn the background loop. It exits once `shutdown` changes or its
    /// sender is dropped; a tick in progress always runs to completion.
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "Round scheduler started");
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                    _ = shutdown.changed() => {
                        info!("Round scheduler stopping");
                        break;
                    }
                }
            }
        })
    }
}
