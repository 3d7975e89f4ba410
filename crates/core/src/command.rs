//! Platform-neutral command invocations.
//!
//! Platforms parse and register their own command syntax (slash commands,
//! prefixed text, ...) and hand the engine a [`CommandInvocation`]: a name,
//! named string parameters, and whatever attachment text came with it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelId, UserId};

/// A single command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandInvocation {
    /// Conversation the command was issued in
    pub channel_id: ChannelId,

    /// Who issued it
    pub invoker_id: UserId,

    /// Command name without the group prefix (e.g. "init", "addkey")
    pub name: String,

    /// Named parameters as supplied by the platform
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// Text content of an attached file, already read by the platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,

    /// Whether the platform's permission check passed for the invoker
    #[serde(default)]
    pub authorized: bool,
}

impl CommandInvocation {
    /// An authorized invocation with no parameters.
    pub fn new(channel_id: ChannelId, invoker_id: UserId, name: impl Into<String>) -> Self {
        Self {
            channel_id,
            invoker_id,
            name: name.into(),
            params: BTreeMap::new(),
            attachment: None,
            authorized: true,
        }
    }

    /// Add a named parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Attach file content.
    pub fn with_attachment(mut self, content: impl Into<String>) -> Self {
        self.attachment = Some(content.into());
        self
    }

    /// Override the permission flag.
    pub fn with_authorized(mut self, authorized: bool) -> Self {
        self.authorized = authorized;
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Who gets to see a command reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Posted into the conversation
    Public,
    /// Shown only to the invoker
    Ephemeral,
}

/// The answer to a command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub content: String,
    pub visibility: Visibility,
}

impl CommandReply {
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            visibility: Visibility::Public,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            visibility: Visibility::Ephemeral,
        }
    }
}
