//! Configuration loading, validation, and management for giftbot.
//!
//! Loads configuration from `~/.giftbot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use giftbot_core::game::GameSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`AppConfig::data_file`].
pub const DATA_FILE_ENV: &str = "DATA_FILE_PATH";
/// Environment variable overriding [`DiscordConfig::bot_token`].
pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";

/// The root configuration structure.
///
/// Maps directly to `~/.giftbot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the game snapshot is persisted
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Which platform adapter to run: "cli" or "discord"
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Timeout watchdog settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Settings applied to channels on first use
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Discord adapter settings
    #[serde(default)]
    pub discord: DiscordConfig,
}

fn default_data_file() -> PathBuf {
    PathBuf::from("game_state.json")
}
fn default_channel() -> String {
    "cli".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between timeout scans
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

fn default_tick_seconds() -> u64 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_min_number")]
    pub min_number: i64,

    #[serde(default = "default_max_number")]
    pub max_number: i64,

    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: i64,
}

fn default_min_number() -> i64 {
    0
}
fn default_max_number() -> i64 {
    500
}
fn default_timeout_minutes() -> i64 {
    10
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            min_number: default_min_number(),
            max_number: default_max_number(),
            timeout_minutes: default_timeout_minutes(),
        }
    }
}

impl DefaultsConfig {
    /// Validated game settings for newly created channels.
    pub fn settings(&self) -> Result<GameSettings, ConfigError> {
        GameSettings::new(self.min_number, self.max_number, self.timeout_minutes)
            .map_err(|e| ConfigError::ValidationError(format!("[defaults]: {e}")))
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token from the Discord Developer Portal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// User IDs that may run game commands without the platform
    /// permission. ["*"] = everyone.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field(
                "bot_token",
                &match self.bot_token {
                    Some(_) => "[REDACTED]",
                    None => "None",
                },
            )
            .field("allowed_users", &self.allowed_users)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.giftbot/config.toml).
    ///
    /// Environment overrides:
    /// - `DATA_FILE_PATH` replaces `data_file`
    /// - `BOT_TOKEN` replaces `discord.bot_token`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(DATA_FILE_ENV).filter(|v| !v.trim().is_empty()) {
            self.data_file = PathBuf::from(path);
        }
        if let Some(token) = lookup(BOT_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.discord.bot_token = Some(token);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".giftbot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.tick_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.tick_seconds must be at least 1".into(),
            ));
        }

        if !matches!(self.channel.as_str(), "cli" | "discord") {
            return Err(ConfigError::ValidationError(format!(
                "channel must be \"cli\" or \"discord\", got \"{}\"",
                self.channel
            )));
        }

        self.defaults.settings()?;
        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            channel: default_channel(),
            scheduler: SchedulerConfig::default(),
            defaults: DefaultsConfig::default(),
            discord: DiscordConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.data_file, PathBuf::from("game_state.json"));
        assert_eq!(config.scheduler.tick_seconds, 5);
        assert_eq!(config.defaults.settings().unwrap(), GameSettings::default());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_file, config.data_file);
        assert_eq!(parsed.scheduler.tick_seconds, config.scheduler.tick_seconds);
    }

    #[test]
    fn invalid_defaults_rejected() {
        let config = AppConfig {
            defaults: DefaultsConfig {
                min_number: 10,
                max_number: 5,
                timeout_minutes: 10,
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            defaults: DefaultsConfig {
                timeout_minutes: 120,
                ..DefaultsConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_tick_rejected() {
        let config = AppConfig {
            scheduler: SchedulerConfig { tick_seconds: 0 },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_channel_rejected() {
        let config = AppConfig {
            channel: "irc".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().channel, "cli");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "channel = \"discord\"\n[defaults]\nmax_number = 100\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.channel, "discord");
        assert_eq!(config.defaults.max_number, 100);
        assert_eq!(config.defaults.timeout_minutes, 10);
        assert_eq!(config.scheduler.tick_seconds, 5);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "channel = [").unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_overrides(|name| match name {
            DATA_FILE_ENV => Some("/var/lib/giftbot/state.json".into()),
            BOT_TOKEN_ENV => Some("secret-token".into()),
            _ => None,
        });
        assert_eq!(config.data_file, PathBuf::from("/var/lib/giftbot/state.json"));
        assert_eq!(config.discord.bot_token.as_deref(), Some("secret-token"));
    }

    #[test]
    fn debug_redacts_token() {
        let discord = DiscordConfig {
            bot_token: Some("super-secret".into()),
            allowed_users: vec![],
        };
        let rendered = format!("{discord:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("game_state.json"));
        assert!(toml_str.contains("tick_seconds"));
    }
}
