//! Error types for the giftbot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;

use thiserror::Error;

/// The top-level error type for all giftbot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Game rule errors (validation + state conflicts) ---
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Persistence errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    /// A failure with no typed cause, such as a task that panicked.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Rejections raised at the command boundary.
///
/// Every variant renders as a message fit to show the invoking user, and
/// none of them is raised after state has been mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Invalid number range: {min} to {max}")]
    InvalidRange { min: i64, max: i64 },

    #[error("Timeout must be between 1 and 60 minutes (got {0})")]
    InvalidTimeout(i64),

    #[error("Missing parameter `{0}`")]
    MissingParameter(String),

    #[error("Invalid value for `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("You don't have permission to use this command! You need the Manage Messages permission.")]
    PermissionDenied,

    #[error("No keys added! Use `/game addkey` first.")]
    NoKeys,

    #[error("A game is already in progress!")]
    AlreadyActive,

    #[error("Cannot change settings while a game is active!")]
    ConfigureWhileActive,

    #[error("Cannot clear keys while a game is in progress!")]
    ClearWhileInProgress,

    #[error("No game is currently active!")]
    NotRunning,

    #[error("Game is already paused!")]
    AlreadyPaused,

    #[error("No valid `Game Name KEY` lines found")]
    NoValidKeyLines,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    /// The recipient cannot be reached at all (e.g. direct messages disabled).
    #[error("Recipient {recipient} is unreachable: {reason}")]
    RecipientUnreachable { recipient: String, reason: String },

    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),

    #[error("Invalid inbound payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Snapshot at {path} is not a channel map: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}
