//! Logger commands as users issue them from chat.
//!
//! Translates `start-logger`, `stop-logger` and `current-loggers` into
//! tracker calls and renders the reply shown to the caller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vl_core::{ParticipantId, ResourceId, ResourceKey, ScopeId, Tracker};

use crate::feed::VoiceStates;

/// Kind of channel a command targets. Only voice channels can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    #[default]
    Voice,
    Stage,
    Text,
    Category,
}

/// Channel option passed to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub kind: ChannelKind,
}

/// A logger command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum Command {
    StartLogger { channel: ChannelRef },
    StopLogger { channel: ChannelRef },
    CurrentLoggers,
}

/// A command issued by `caller` in `scope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub scope: ScopeId,
    pub caller: ParticipantId,
    #[serde(flatten)]
    pub command: Command,
    /// When the command was issued; stamped on arrival when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
}

/// Message shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    /// Only visible to the caller.
    pub ephemeral: bool,
}

impl Reply {
    fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// Executes a command against the tracker.
///
/// `voice_states` supplies the members already connected when logging
/// starts.
pub fn handle(
    tracker: &Tracker,
    voice_states: &VoiceStates,
    invocation: &Invocation,
    at: DateTime<Utc>,
) -> Reply {
    let scope = &invocation.scope;
    match &invocation.command {
        Command::StartLogger { channel } => {
            if channel.kind != ChannelKind::Voice {
                return Reply::ephemeral("Please select a **voice channel**!");
            }
            let key = ResourceKey::new(scope.clone(), channel.id.clone());
            let present = voice_states.members(&key);
            match tracker.start(key, &channel.name, invocation.caller.clone(), present, at) {
                Ok(_) => Reply::public(format!("Started logging {}", channel.name)),
                // Starting only fails when the channel is already tracked.
                Err(_) => Reply::public(format!("{} is already being logged", channel.name)),
            }
        }
        Command::StopLogger { channel } => {
            let key = ResourceKey::new(scope.clone(), channel.id.clone());
            match tracker.stop(&key, &invocation.caller, at) {
                Ok(_) => Reply::public(format!("Stopped logging {}", channel.name)),
                Err(_) => {
                    Reply::ephemeral("Please select a channel that is currently being logged!")
                }
            }
        }
        Command::CurrentLoggers => {
            let labels: Vec<String> = tracker
                .list(scope)
                .into_iter()
                .map(|summary| summary.label)
                .collect();
            if labels.is_empty() {
                Reply::public("No loggers active")
            } else {
                Reply::public(format!("Current loggers: {}", labels.join(", ")))
            }
        }
    }
}
