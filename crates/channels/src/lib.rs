//! Chat platform adapters for giftbot.
//!
//! Each adapter implements the core `Channel` trait: it yields inbound
//! messages and command invocations, and delivers announcements, command
//! replies and private reward messages.
//!
//! Available channels:
//! - **CLI** — play from a terminal (stdin/stdout)
//! - **Discord** — Discord Bot API (stub, needs a gateway client in production)

pub mod cli;
pub mod discord;

use std::sync::Arc;

use giftbot_config::AppConfig;
use giftbot_core::channel::Channel;
use giftbot_core::error::ChannelError;

pub use cli::CliChannel;
pub use discord::DiscordChannel;

/// Build the channel named by `config.channel`.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn Channel>, ChannelError> {
    match config.channel.as_str() {
        "cli" => Ok(Arc::new(CliChannel::new())),
        "discord" => Ok(Arc::new(DiscordChannel::new(config.discord.clone()))),
        other => Err(ChannelError::NotConfigured(format!("unknown channel `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_configured_channel() {
        let mut config = AppConfig::default();
        assert_eq!(from_config(&config).unwrap().name(), "cli");

        config.channel = "discord".into();
        assert_eq!(from_config(&config).unwrap().name(), "discord");

        config.channel = "carrier-pigeon".into();
        assert!(from_config(&config).is_err());
    }
}
