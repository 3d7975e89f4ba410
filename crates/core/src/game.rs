//! Per-channel game state.
//!
//! One [`GameState`] exists per conversation. It holds the range and timeout
//! configuration, the reward key pool, and the progress of the current
//! round. The round phase is an enum so that "active" and "paused" can never
//! both be set, and a deadline exists exactly while a round is active.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelId, UserId};
use crate::error::GameError;

/// Smallest allowed round duration in minutes.
pub const MIN_TIMEOUT_MINUTES: u32 = 1;
/// Largest allowed round duration in minutes.
pub const MAX_TIMEOUT_MINUTES: u32 = 60;

/// A reward payload: the key for one game, handed to one round's winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardKey {
    pub game_name: String,
    pub key: String,
}

impl RewardKey {
    pub fn new(game_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            key: key.into(),
        }
    }
}

/// The best guess seen so far in the current round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestGuess {
    /// Absolute distance to the hidden number
    pub offset: u64,
    /// Author of the guess
    pub user: UserId,
}

impl BestGuess {
    pub fn is_exact(&self) -> bool {
        self.offset == 0
    }
}

/// Where a channel's game is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No round running
    Idle,
    /// A round is collecting guesses until `ends_at`
    Active { ends_at: DateTime<Utc> },
    /// A round was interrupted and can be resumed with `start`
    Paused,
}

/// Range and timeout configuration of a channel's game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub min_number: u64,
    pub max_number: u64,
    pub timeout_minutes: u32,
}

impl GameSettings {
    /// Validate raw user input into settings.
    pub fn new(min_number: i64, max_number: i64, timeout_minutes: i64) -> Result<Self, GameError> {
        if min_number < 0 || max_number < min_number {
            return Err(GameError::InvalidRange {
                min: min_number,
                max: max_number,
            });
        }
        if timeout_minutes < i64::from(MIN_TIMEOUT_MINUTES)
            || timeout_minutes > i64::from(MAX_TIMEOUT_MINUTES)
        {
            return Err(GameError::InvalidTimeout(timeout_minutes));
        }
        Ok(Self {
            min_number: min_number as u64,
            max_number: max_number as u64,
            timeout_minutes: timeout_minutes as u32,
        })
    }

    /// Whether `guess` falls inside the inclusive range.
    pub fn contains(&self, guess: u64) -> bool {
        (self.min_number..=self.max_number).contains(&guess)
    }

    /// Round duration.
    pub fn round_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.timeout_minutes))
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            min_number: 0,
            max_number: 500,
            timeout_minutes: 10,
        }
    }
}

/// The state of a number-guessing game in one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub channel_id: ChannelId,
    pub phase: RoundPhase,
    /// Hidden target; meaningful only while a round is active
    pub number: u64,
    pub settings: GameSettings,
    pub best: Option<BestGuess>,
    /// Reward pool, consumed by index: round `r` pays out `keys[r - 1]`
    pub keys: Vec<RewardKey>,
    pub current_round: u32,
    pub total_rounds: u32,
}

impl GameState {
    /// A fresh idle game.
    pub fn new(channel_id: ChannelId, settings: GameSettings) -> Self {
        Self {
            channel_id,
            phase: RoundPhase::Idle,
            number: 0,
            settings,
            best: None,
            keys: Vec::new(),
            current_round: 0,
            total_rounds: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, RoundPhase::Active { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.phase, RoundPhase::Paused)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, RoundPhase::Idle)
    }

    /// Active or paused: a game whose rounds are not finished.
    pub fn in_progress(&self) -> bool {
        !self.is_idle()
    }

    /// Deadline of the running round.
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        match self.phase {
            RoundPhase::Active { ends_at } => Some(ends_at),
            _ => None,
        }
    }

    /// Whether an active round's deadline has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ends_at().is_some_and(|ends_at| now >= ends_at)
    }

    /// Time left in the active round, if any remains.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.ends_at()
            .map(|ends_at| ends_at - now)
            .filter(|left| *left > Duration::zero())
    }

    /// The reward for the current round.
    pub fn current_key(&self) -> Option<&RewardKey> {
        let index = self.current_round.checked_sub(1)?;
        self.keys.get(index as usize)
    }

    pub fn has_more_rounds(&self) -> bool {
        self.current_round < self.total_rounds
    }

    /// Advance to the next round with a new hidden number.
    pub fn begin_round(&mut self, number: u64, now: DateTime<Utc>) {
        self.current_round += 1;
        self.restart_round(number, now);
    }

    /// Restart the current round (same round number) with a new hidden
    /// number and a fresh deadline.
    pub fn restart_round(&mut self, number: u64, now: DateTime<Utc>) {
        self.number = number;
        self.best = None;
        self.phase = RoundPhase::Active {
            ends_at: now + self.settings.round_duration(),
        };
    }

    /// Record a new best guess.
    pub fn record_best(&mut self, offset: u64, user: UserId) {
        self.best = Some(BestGuess { offset, user });
    }

    /// Interrupt the active round.
    pub fn pause(&mut self) {
        self.phase = RoundPhase::Paused;
    }

    /// Return to idle and forget round progress. The key pool is kept.
    pub fn stop(&mut self) {
        self.phase = RoundPhase::Idle;
        self.best = None;
        self.current_round = 0;
        self.total_rounds = 0;
    }

    /// Return to idle after the final round: counters and key pool emptied.
    pub fn complete(&mut self) {
        self.stop();
        self.keys.clear();
    }
}
