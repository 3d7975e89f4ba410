//! CLI channel — play the game from a terminal.
//!
//! Reads stdin, writes stdout. Every line is a message from the local user
//! in a single conversation named `cli`, except lines starting with
//! `/game`, which are command invocations:
//!
//! ```text
//! /game init min_number=0 max_number=10 timeout_minutes=1
//! /game addkey game_name="Half-Life 2" key=AAAA-BBBB
//! /game addkeymulti file=keys.txt
//! /game start
//! ```

use async_trait::async_trait;
use giftbot_core::channel::{Channel, ChannelId, ChannelMessage, InboundEvent, UserId};
use giftbot_core::command::{CommandInvocation, CommandReply, Visibility};
use giftbot_core::error::ChannelError;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

const COMMAND_PREFIX: &str = "/game";
const LOCAL_USER: &str = "local_user";

/// Interactive terminal channel.
pub struct CliChannel {
    id: ChannelId,
    user: UserId,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId::new("cli"),
            user: UserId::new(LOCAL_USER),
        }
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.id
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn one input line into an inbound event.
///
/// `file=<path>` on a command is read and handed over as the attachment.
pub async fn parse_line(
    line: &str,
    channel: &ChannelId,
    user: &UserId,
) -> Result<InboundEvent, ChannelError> {
    let command = line
        .strip_prefix(COMMAND_PREFIX)
        .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace));
    let Some(rest) = command else {
        let mut message = ChannelMessage::text(channel.clone(), user.clone(), line);
        message.sender_name = Some("You".into());
        return Ok(InboundEvent::Message(message));
    };

    let mut words = split_words(rest)?.into_iter();
    let name = words
        .next()
        .ok_or_else(|| ChannelError::InvalidPayload("usage: /game <command> [name=value ...]".into()))?;

    let mut invocation = CommandInvocation::new(channel.clone(), user.clone(), name);
    for word in words {
        let (key, value) = word.split_once('=').ok_or_else(|| {
            ChannelError::InvalidPayload(format!("expected name=value, got `{word}`"))
        })?;
        if key == "file" {
            let content = tokio::fs::read_to_string(value).await.map_err(|e| {
                ChannelError::InvalidPayload(format!("cannot read {value}: {e}"))
            })?;
            invocation = invocation.with_attachment(content);
        } else {
            invocation = invocation.with_param(key, value);
        }
    }
    Ok(InboundEvent::Command(invocation))
}

/// Split on whitespace, keeping double-quoted runs together.
fn split_words(input: &str) -> Result<Vec<String>, ChannelError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in input.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    words.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }

    if quoted {
        return Err(ChannelError::InvalidPayload("unterminated quote".into()));
    }
    if pending {
        words.push(current);
    }
    Ok(words)
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<InboundEvent, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let channel_id = self.id.clone();
        let user = self.user.clone();

        tokio::spawn(async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }

                        if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
                            break;
                        }

                        let event = parse_line(line, &channel_id, &user).await;
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
            debug!("CLI input closed");
        });

        Ok(rx)
    }

    async fn send(&self, _channel: &ChannelId, content: &str) -> Result<(), ChannelError> {
        println!("{content}\n");
        Ok(())
    }

    async fn send_direct(&self, user: &UserId, content: &str) -> Result<(), ChannelError> {
        println!("📩 Direct message to {}:\n{content}\n", self.mention(user));
        Ok(())
    }

    async fn respond(
        &self,
        _invocation: &CommandInvocation,
        reply: &CommandReply,
    ) -> Result<(), ChannelError> {
        match reply.visibility {
            Visibility::Public => println!("{}\n", reply.content),
            Visibility::Ephemeral => println!("(only you can see this)\n{}\n", reply.content),
        }
        Ok(())
    }

    fn mention(&self, user: &UserId) -> String {
        format!("@{user}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_ids() -> (ChannelId, UserId) {
        (ChannelId::new("cli"), UserId::new(LOCAL_USER))
    }

    #[test]
    fn cli_channel_properties() {
        let ch = CliChannel::new();
        assert_eq!(ch.name(), "cli");
        assert_eq!(ch.channel_id().as_str(), "cli");
        assert_eq!(ch.mention(&UserId::new("alice")), "@alice");
    }

    #[test]
    fn words_respect_quotes() {
        assert_eq!(
            split_words(r#" addkey game_name="Half-Life 2" key=AB "#).unwrap(),
            vec!["addkey", "game_name=Half-Life 2", "key=AB"]
        );
        assert!(split_words(r#"addkey game_name="oops"#).is_err());
    }

    #[tokio::test]
    async fn plain_lines_are_messages() {
        let (channel, user) = cli_ids();
        let InboundEvent::Message(message) = parse_line("I guess 42", &channel, &user).await.unwrap()
        else {
            panic!("expected a message");
        };
        assert_eq!(message.content, "I guess 42");
        assert_eq!(message.sender_id.as_str(), LOCAL_USER);
        assert!(!message.is_bot);
    }

    #[tokio::test]
    async fn game_lines_are_commands() {
        let (channel, user) = cli_ids();
        let event = parse_line("/game init min_number=1 max_number=9", &channel, &user)
            .await
            .unwrap();
        let InboundEvent::Command(invocation) = event else {
            panic!("expected a command");
        };
        assert_eq!(invocation.name, "init");
        assert_eq!(invocation.param("min_number"), Some("1"));
        assert_eq!(invocation.param("max_number"), Some("9"));
        assert!(invocation.authorized);
    }

    #[tokio::test]
    async fn file_param_becomes_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.txt");
        std::fs::write(&path, "Alpha K1\nBeta K2\n").unwrap();

        let (channel, user) = cli_ids();
        let line = format!("/game addkeymulti file={}", path.display());
        let InboundEvent::Command(invocation) = parse_line(&line, &channel, &user).await.unwrap()
        else {
            panic!("expected a command");
        };
        assert_eq!(invocation.attachment.as_deref(), Some("Alpha K1\nBeta K2\n"));
        assert!(invocation.param("file").is_none());

        let missing = parse_line("/game addkeymulti file=/no/such/file", &channel, &user).await;
        assert!(matches!(missing, Err(ChannelError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn malformed_commands_are_rejected() {
        let (channel, user) = cli_ids();
        assert!(parse_line("/game", &channel, &user).await.is_err());
        assert!(parse_line("/game init 5", &channel, &user).await.is_err());
        assert!(matches!(
            parse_line("/gamer 5", &channel, &user).await,
            Ok(InboundEvent::Message(_))
        ));
    }

    #[tokio::test]
    async fn send_and_direct_succeed() {
        let ch = CliChannel::new();
        assert!(ch.send(ch.channel_id(), "hello").await.is_ok());
        assert!(ch.send_direct(&UserId::new("alice"), "psst").await.is_ok());
    }
}
