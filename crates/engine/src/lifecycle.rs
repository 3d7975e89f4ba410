//! Round lifecycle — start, resume, evaluate, finalize.
//!
//! ```text
//! Idle ──start──▶ Active ──pause──▶ Paused ──start──▶ Active
//!                   │
//!                   └─finalize (exact match | timeout)─▶ Active (next round)
//!                                                      └▶ Idle (all rounds done)
//! ```
//!
//! Every transition runs with the channel's lock held. `finalize` only acts
//! on an active round and leaves it inactive (or re-armed as the next
//! round), so of two racing triggers the second finds nothing to do.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use giftbot_core::channel::{Channel, ChannelId, ChannelMessage, UserId};
use giftbot_core::error::ChannelError;
use giftbot_core::event::{DomainEvent, EventBus};
use giftbot_core::game::{BestGuess, GameSettings, GameState};
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::announce;
use crate::evaluator::{self, IgnoreReason, Verdict};
use crate::registry::GameRegistry;

/// Upper bound on any single outbound call.
pub const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

/// What happens after a round is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// The given round started automatically
    NextRound(u32),
    /// That was the last round; the game reset to idle
    Completed,
}

/// Summary of one finalized round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub round: u32,
    pub total_rounds: u32,
    pub number: u64,
    pub winner: Option<BestGuess>,
    pub next: NextStep,
}

/// Drives rounds for every channel.
pub struct RoundController {
    registry: Arc<GameRegistry>,
    channel: Arc<dyn Channel>,
    events: Arc<EventBus>,
}

impl RoundController {
    pub fn new(registry: Arc<GameRegistry>, channel: Arc<dyn Channel>, events: Arc<EventBus>) -> Self {
        Self {
            registry,
            channel,
            events,
        }
    }

    pub fn registry(&self) -> &Arc<GameRegistry> {
        &self.registry
    }

    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Begin round 1 of a new game over the whole key pool.
    pub fn start_game(&self, state: &mut GameState) {
        state.total_rounds = state.keys.len() as u32;
        state.current_round = 0;
        self.start_round(state);
    }

    /// Advance to the next round with a fresh number and deadline.
    pub fn start_round(&self, state: &mut GameState) {
        let number = draw_number(&state.settings);
        state.begin_round(number, Utc::now());
        self.registry.commit(state);
        self.round_armed(state, false);
    }

    /// Restart the current (paused) round with a fresh number and deadline.
    pub fn resume_round(&self, state: &mut GameState) {
        let number = draw_number(&state.settings);
        state.restart_round(number, Utc::now());
        self.registry.commit(state);
        self.round_armed(state, true);
    }

    fn round_armed(&self, state: &GameState, resumed: bool) {
        info!(
            channel = %state.channel_id,
            round = state.current_round,
            total_rounds = state.total_rounds,
            resumed,
            "Round started"
        );
        debug!(channel = %state.channel_id, number = state.number, "Hidden number drawn");
        self.events.publish(DomainEvent::RoundStarted {
            channel: state.channel_id.clone(),
            round: state.current_round,
            total_rounds: state.total_rounds,
            resumed,
            timestamp: Utc::now(),
        });
    }

    /// Evaluate an inbound message as a guess and apply the verdict.
    ///
    /// Messages in channels without a game, and messages from bots, are
    /// ignored without creating state.
    pub async fn handle_message(&self, message: &ChannelMessage) -> Verdict {
        if message.is_bot {
            return Verdict::Ignored(IgnoreReason::BotAuthor);
        }
        let Some(handle) = self.registry.get(&message.channel_id).await else {
            return Verdict::Ignored(IgnoreReason::NotRunning);
        };

        let mut state = handle.lock().await;
        let verdict = evaluator::evaluate(&state, &message.content, Utc::now());

        match verdict {
            Verdict::Expired => {
                self.finalize(&mut state).await;
            }
            Verdict::Improved { offset, previous } => {
                info!(
                    channel = %state.channel_id,
                    previous = ?previous,
                    offset,
                    user = %message.sender_id,
                    name = message.sender_name.as_deref().unwrap_or(""),
                    "Game progressed"
                );
                state.record_best(offset, message.sender_id.clone());
                self.registry.commit(&state);
                self.events.publish(DomainEvent::GuessImproved {
                    channel: state.channel_id.clone(),
                    user: message.sender_id.clone(),
                    offset,
                    timestamp: Utc::now(),
                });

                if offset == 0 {
                    self.finalize(&mut state).await;
                }
            }
            Verdict::Ignored(_) | Verdict::NotImproved { .. } => {}
        }

        verdict
    }

    /// Finalize the channel's round if it is active and past its deadline.
    pub async fn finalize_if_expired(&self, channel: &ChannelId) -> Option<RoundOutcome> {
        let handle = self.registry.get(channel).await?;
        let mut state = handle.lock().await;
        if !state.is_expired(Utc::now()) {
            return None;
        }
        self.finalize(&mut state).await
    }

    /// End the active round: announce the outcome, hand out the reward,
    /// then start the next round or complete the game.
    ///
    /// The state transition is committed before any outbound call, so an
    /// adapter failing mid-announcement leaves memory and snapshot in
    /// agreement.
    ///
    /// Returns `None` without side effects when no round is active.
    pub async fn finalize(&self, state: &mut GameState) -> Option<RoundOutcome> {
        if !state.is_active() {
            return None;
        }

        let channel_id = state.channel_id.clone();
        let round = state.current_round;
        let total_rounds = state.total_rounds;
        let number = state.number;
        let winner = state.best.clone();

        let result = match &winner {
            Some(best) => {
                let mention = self.channel.mention(&best.user);
                announce::round_won(state, &mention, best.offset)
            }
            None => announce::round_no_winner(state),
        };
        let reward = state.current_key().map(|key| announce::reward(round, key));

        let next = if state.has_more_rounds() {
            state.begin_round(draw_number(&state.settings), Utc::now());
            NextStep::NextRound(state.current_round)
        } else {
            state.complete();
            NextStep::Completed
        };
        self.registry.commit(state);

        self.announce(&channel_id, &result).await;
        if let Some(best) = &winner {
            self.deliver_reward(&channel_id, round, &best.user, reward.as_deref())
                .await;
        }

        info!(
            channel = %channel_id,
            round,
            total_rounds,
            winner = ?winner.as_ref().map(|b| b.user.as_str()),
            offset = ?winner.as_ref().map(|b| b.offset),
            "Round finalized"
        );
        self.events.publish(DomainEvent::RoundFinalized {
            channel: channel_id.clone(),
            round,
            total_rounds,
            winner: winner.as_ref().map(|b| b.user.clone()),
            offset: winner.as_ref().map(|b| b.offset),
            timestamp: Utc::now(),
        });

        match next {
            NextStep::NextRound(_) => {
                self.round_armed(state, false);
                self.announce(&channel_id, &announce::round_started(state)).await;
            }
            NextStep::Completed => {
                self.announce(&channel_id, &announce::game_over()).await;
                self.events.publish(DomainEvent::GameCompleted {
                    channel: channel_id.clone(),
                    rounds_played: total_rounds,
                    timestamp: Utc::now(),
                });
            }
        }

        Some(RoundOutcome {
            round,
            total_rounds,
            number,
            winner,
            next,
        })
    }

    /// Send the finished round's key to the winner privately.
    ///
    /// Failures are announced in the channel; progression continues.
    async fn deliver_reward(
        &self,
        channel: &ChannelId,
        round: u32,
        winner: &UserId,
        content: Option<&str>,
    ) {
        let Some(content) = content else {
            warn!(channel = %channel, round, "No reward key for round");
            return;
        };

        let result = match tokio::time::timeout(
            OUTBOUND_TIMEOUT,
            self.channel.send_direct(winner, content),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ChannelError::DeliveryFailed {
                channel: self.channel.name().to_string(),
                reason: format!("timed out after {}s", OUTBOUND_TIMEOUT.as_secs()),
            }),
        };

        let Err(e) = result else {
            debug!(channel = %channel, user = %winner, "Reward delivered");
            return;
        };

        let mention = self.channel.mention(winner);
        let notice = match &e {
            ChannelError::RecipientUnreachable { .. } => {
                warn!(user = %winner, error = %e, "Failed to send DM: recipient unreachable");
                announce::reward_unreachable(&mention)
            }
            _ => {
                error!(user = %winner, error = %e, "Error sending reward");
                announce::reward_failed(&mention)
            }
        };
        self.announce(channel, &notice).await;
        self.events.publish(DomainEvent::RewardDeliveryFailed {
            channel: channel.clone(),
            user: winner.clone(),
            reason: e.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Best-effort post into a channel.
    pub async fn announce(&self, channel: &ChannelId, content: &str) {
        match tokio::time::timeout(OUTBOUND_TIMEOUT, self.channel.send(channel, content)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(channel = %channel, error = %e, "Announcement failed"),
            Err(_) => warn!(channel = %channel, "Announcement timed out"),
        }
    }
}

fn draw_number(settings: &GameSettings) -> u64 {
    rand::rng().random_range(settings.min_number..=settings.max_number)
}
