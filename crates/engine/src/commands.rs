//! Command adapter.
//!
//! Turns a platform-neutral [`CommandInvocation`] into a typed
//! [`GameCommand`], applies it to the channel's state under the channel
//! lock, and produces the reply. Rejections are [`GameError`]s and are
//! always raised before any state is touched.

use std::sync::Arc;

use chrono::Utc;
use giftbot_core::command::{CommandInvocation, CommandReply};
use giftbot_core::error::{Error, GameError, Result};
use giftbot_core::game::{GameSettings, GameState, RewardKey};
use tracing::{debug, error, info, warn};

use crate::announce;
use crate::lifecycle::{OUTBOUND_TIMEOUT, RoundController};

/// A parsed game command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameCommand {
    Init(GameSettings),
    AddKey(RewardKey),
    /// Raw `Game Name KEY` lines
    AddKeyMulti(String),
    ListKeys,
    ClearKeys,
    Start,
    Pause,
    Stop,
    Status,
}

impl GameCommand {
    /// Parse and validate an invocation's name and parameters.
    pub fn parse(invocation: &CommandInvocation) -> std::result::Result<Self, GameError> {
        let command = match invocation.name.as_str() {
            "init" => {
                let defaults = GameSettings::default();
                let min = int_param(invocation, "min_number")?
                    .unwrap_or(defaults.min_number as i64);
                let max = int_param(invocation, "max_number")?
                    .unwrap_or(defaults.max_number as i64);
                let timeout = int_param(invocation, "timeout_minutes")?
                    .unwrap_or(i64::from(defaults.timeout_minutes));
                GameCommand::Init(GameSettings::new(min, max, timeout)?)
            }
            "addkey" => GameCommand::AddKey(RewardKey::new(
                text_param(invocation, "game_name")?,
                text_param(invocation, "key")?,
            )),
            "addkeymulti" => {
                let content = invocation
                    .attachment
                    .clone()
                    .or_else(|| invocation.param("file").map(str::to_string))
                    .ok_or_else(|| GameError::MissingParameter("file".into()))?;
                GameCommand::AddKeyMulti(content)
            }
            "listkeys" => GameCommand::ListKeys,
            "clearkeys" => GameCommand::ClearKeys,
            "start" => GameCommand::Start,
            "pause" => GameCommand::Pause,
            "stop" => GameCommand::Stop,
            "status" => GameCommand::Status,
            other => return Err(GameError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

fn int_param(
    invocation: &CommandInvocation,
    name: &str,
) -> std::result::Result<Option<i64>, GameError> {
    invocation
        .param(name)
        .map(|raw| {
            raw.trim()
                .parse::<i64>()
                .map_err(|e| GameError::InvalidParameter {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
        })
        .transpose()
}

fn text_param(invocation: &CommandInvocation, name: &str) -> std::result::Result<String, GameError> {
    invocation
        .param(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| GameError::MissingParameter(name.to_string()))
}

/// Parse `Game Name KEY` lines: the key is everything after the last run of
/// whitespace. Blank lines and lines without both parts are skipped.
pub fn parse_key_lines(content: &str) -> Vec<RewardKey> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (name, key) = line.rsplit_once(char::is_whitespace)?;
            let (name, key) = (name.trim(), key.trim());
            if name.is_empty() || key.is_empty() {
                None
            } else {
                Some(RewardKey::new(name, key))
            }
        })
        .collect()
}

/// Executes game commands against the registry.
pub struct CommandHandler {
    controller: Arc<RoundController>,
}

impl CommandHandler {
    pub fn new(controller: Arc<RoundController>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<RoundController> {
        &self.controller
    }

    /// Execute an invocation. A rejection comes back as [`Error::Game`].
    pub async fn dispatch(&self, invocation: &CommandInvocation) -> Result<CommandReply> {
        if !invocation.authorized {
            return Err(GameError::PermissionDenied.into());
        }
        let command = GameCommand::parse(invocation)?;

        let handle = self
            .controller
            .registry()
            .get_or_create(&invocation.channel_id)
            .await;
        let mut state = handle.lock().await;
        debug!(channel = %invocation.channel_id, command = %invocation.name, "Executing command");

        let reply = match command {
            GameCommand::Init(settings) => self.init(&mut state, settings)?,
            GameCommand::AddKey(key) => self.add_key(&mut state, key),
            GameCommand::AddKeyMulti(content) => self.add_keys(&mut state, &content)?,
            GameCommand::ListKeys => list_keys(&state),
            GameCommand::ClearKeys => self.clear_keys(&mut state)?,
            GameCommand::Start => self.start(&mut state)?,
            GameCommand::Pause => self.pause(&mut state)?,
            GameCommand::Stop => self.stop(&mut state)?,
            GameCommand::Status => self.status(&state),
        };
        Ok(reply)
    }

    /// Execute an invocation and map every failure to a reply.
    pub async fn handle(&self, invocation: &CommandInvocation) -> CommandReply {
        match self.dispatch(invocation).await {
            Ok(reply) => reply,
            Err(e) => Self::failure_reply(invocation, &e),
        }
    }

    /// The reply for a failed invocation.
    ///
    /// Rejections are explained to the invoker only; anything else is
    /// logged and answered with a generic notice.
    pub fn failure_reply(invocation: &CommandInvocation, error: &Error) -> CommandReply {
        match error {
            Error::Game(e) => {
                debug!(
                    channel = %invocation.channel_id,
                    command = %invocation.name,
                    reason = %e,
                    "Command rejected"
                );
                CommandReply::ephemeral(format!("❌ {e}"))
            }
            e => {
                error!(
                    channel = %invocation.channel_id,
                    command = %invocation.name,
                    user = %invocation.invoker_id,
                    error = %e,
                    "Command failed"
                );
                CommandReply::ephemeral("❌ An error occurred while processing the command.")
            }
        }
    }

    /// Execute an invocation and deliver the reply through the channel.
    pub async fn respond(&self, invocation: &CommandInvocation) {
        let reply = self.handle(invocation).await;
        self.deliver(invocation, &reply).await;
    }

    /// Send `reply` to the invoker, bounded by the outbound timeout.
    pub async fn deliver(&self, invocation: &CommandInvocation, reply: &CommandReply) {
        let channel = self.controller.channel();
        match tokio::time::timeout(OUTBOUND_TIMEOUT, channel.respond(invocation, reply)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(channel = %invocation.channel_id, error = %e, "Failed to deliver command reply"),
            Err(_) => warn!(channel = %invocation.channel_id, "Command reply timed out"),
        }
    }

    fn init(&self, state: &mut GameState, settings: GameSettings) -> Result<CommandReply> {
        if state.is_active() {
            return Err(GameError::ConfigureWhileActive.into());
        }
        state.settings = settings;
        state.stop();
        self.controller.registry().commit(state);
        info!(
            channel = %state.channel_id,
            min = settings.min_number,
            max = settings.max_number,
            timeout_minutes = settings.timeout_minutes,
            "Game settings updated"
        );

        Ok(CommandReply::ephemeral(format!(
            "✅ Game settings updated!\n\
             📊 Number range: **{}** to **{}**\n\
             ⏱️ Timeout: **{}** minutes per round",
            settings.min_number, settings.max_number, settings.timeout_minutes
        )))
    }

    fn add_key(&self, state: &mut GameState, key: RewardKey) -> CommandReply {
        let game_name = key.game_name.clone();
        append_keys(state, vec![key]);
        self.controller.registry().commit(state);

        CommandReply::ephemeral(format!(
            "✅ Added key for **{game_name}**! Total keys: **{}**",
            state.keys.len()
        ))
    }

    fn add_keys(&self, state: &mut GameState, content: &str) -> Result<CommandReply> {
        let keys = parse_key_lines(content);
        if keys.is_empty() {
            return Err(GameError::NoValidKeyLines.into());
        }

        let names: Vec<String> = keys.iter().map(|k| format!("- {}", k.game_name)).collect();
        let added = keys.len();
        append_keys(state, keys);
        self.controller.registry().commit(state);
        info!(channel = %state.channel_id, added, total = state.keys.len(), "Keys added");

        Ok(CommandReply::ephemeral(format!(
            "✅ Added {added} keys! Total keys: **{}**\n{}",
            state.keys.len(),
            names.join("\n")
        )))
    }

    fn clear_keys(&self, state: &mut GameState) -> Result<CommandReply> {
        if state.in_progress() {
            return Err(GameError::ClearWhileInProgress.into());
        }
        let count = state.keys.len();
        state.keys.clear();
        self.controller.registry().commit(state);

        Ok(CommandReply::ephemeral(format!("🗑️ Cleared {count} key(s)!")))
    }

    fn start(&self, state: &mut GameState) -> Result<CommandReply> {
        if state.keys.is_empty() {
            return Err(GameError::NoKeys.into());
        }
        if state.is_paused() {
            self.controller.resume_round(state);
            return Ok(CommandReply::public(announce::round_resumed(state)));
        }
        if state.is_active() {
            return Err(GameError::AlreadyActive.into());
        }

        self.controller.start_game(state);
        Ok(CommandReply::public(announce::game_started(state)))
    }

    fn pause(&self, state: &mut GameState) -> Result<CommandReply> {
        if state.is_idle() {
            return Err(GameError::NotRunning.into());
        }
        if state.is_paused() {
            return Err(GameError::AlreadyPaused.into());
        }
        state.pause();
        self.controller.registry().commit(state);
        info!(channel = %state.channel_id, round = state.current_round, "Game paused");

        Ok(CommandReply::public(format!(
            "⏸️ **Game Paused!**\n\
             Current round ({}/{}) has been paused.\n\
             Use `/game start` to resume from round {}.",
            state.current_round, state.total_rounds, state.current_round
        )))
    }

    fn stop(&self, state: &mut GameState) -> Result<CommandReply> {
        if state.is_idle() {
            return Err(GameError::NotRunning.into());
        }
        state.stop();
        self.controller.registry().commit(state);
        info!(channel = %state.channel_id, "Game stopped");

        Ok(CommandReply::public("🛑 Game stopped!"))
    }

    fn status(&self, state: &GameState) -> CommandReply {
        let mut content = if state.is_idle() {
            format!(
                "📊 **Game Status: Inactive**\n\
                 Keys loaded: **{}**\n\
                 Settings: **{}** to **{}**, **{}** min timeout",
                state.keys.len(),
                state.settings.min_number,
                state.settings.max_number,
                state.settings.timeout_minutes
            )
        } else {
            let label = if state.is_paused() { "⏸️ Paused" } else { "▶️ Active" };
            let time_left = state
                .remaining(Utc::now())
                .map(|left| format!("\n⏱️ Time left: **{}**", announce::remaining(left)))
                .unwrap_or_default();
            format!(
                "📊 **Game Status: {label}**\n\
                 🏆 Round: **{}/{}**\n\
                 🎲 Range: **{}** to **{}**{time_left}",
                state.current_round,
                state.total_rounds,
                state.settings.min_number,
                state.settings.max_number
            )
        };

        if !self.controller.registry().is_durable() {
            content.push_str("\n⚠️ The last save failed; progress may be lost on restart.");
        }
        CommandReply::public(content)
    }
}

/// Append to the pool; a game in progress gains one round per key.
fn append_keys(state: &mut GameState, keys: Vec<RewardKey>) {
    if state.in_progress() {
        state.total_rounds += keys.len() as u32;
    }
    state.keys.extend(keys);
}

fn list_keys(state: &GameState) -> CommandReply {
    if state.keys.is_empty() {
        return CommandReply::ephemeral("📭 No keys added yet!");
    }
    let lines: Vec<String> = state
        .keys
        .iter()
        .enumerate()
        .map(|(i, k)| format!("{}. **{}**: `{}`", i + 1, k.game_name, k.key))
        .collect();

    CommandReply::ephemeral(format!(
        "🔑 **Game Keys ({} total):**\n{}",
        state.keys.len(),
        lines.join("\n")
    ))
}
