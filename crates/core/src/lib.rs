//! # giftbot Core
//!
//! Domain types, traits, and error definitions for the giftbot
//! number-guessing engine. This crate has **no platform dependencies**: it
//! defines the game model and the seams (channels, commands, events) that
//! the engine and the platform adapters implement against.
//!
//! ## Layout
//!
//! - [`game`] — per-channel `GameState` and its round phase
//! - [`channel`] — the `Channel` trait over chat platforms
//! - [`command`] — platform-neutral command invocations and replies
//! - [`event`] — lifecycle events on a broadcast bus
//! - [`error`] — the error taxonomy shared by every crate

pub mod channel;
pub mod command;
pub mod error;
pub mod event;
pub mod game;

// Re-export key types at crate root for ergonomics
pub use channel::{Channel, ChannelId, ChannelMessage, InboundEvent, UserId};
pub use command::{CommandInvocation, CommandReply, Visibility};
pub use error::{ChannelError, Error, GameError, Result, StorageError};
pub use event::{DomainEvent, EventBus};
pub use game::{BestGuess, GameSettings, GameState, RewardKey, RoundPhase};
