//! JSONL feed of platform events.
//!
//! Each line is one [`FeedEntry`]: a presence change or a logger command.
//! Entries without an `at` timestamp are stamped when they are read.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use vl_core::{PresenceChange, PresentParticipant, ParticipantId, ResourceId, ResourceKey, ScopeId};

use crate::frontend::Invocation;

/// One line of the feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEntry {
    Presence(PresenceEntry),
    Command(Invocation),
}

/// A presence change as it appears in the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceEntry {
    pub participant: ParticipantId,
    pub scope: ScopeId,
    #[serde(default)]
    pub old_resource: Option<ResourceId>,
    #[serde(default)]
    pub new_resource: Option<ResourceId>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

impl PresenceEntry {
    pub fn into_change(self, now: DateTime<Utc>) -> PresenceChange {
        PresenceChange {
            participant: self.participant,
            scope: self.scope,
            old_resource: self.old_resource,
            new_resource: self.new_resource,
            display_name: self.display_name,
            at: self.at.unwrap_or(now),
        }
    }
}

#[derive(Debug, Clone)]
struct VoiceState {
    resource: ResourceId,
    display_name: Option<String>,
}

/// Who is connected where, as last reported by the feed.
///
/// Stands in for the platform's member cache when logging starts.
#[derive(Debug, Default)]
pub struct VoiceStates {
    states: BTreeMap<(ScopeId, ParticipantId), VoiceState>,
}

impl VoiceStates {
    pub fn apply(&mut self, change: &PresenceChange) {
        let slot = (change.scope.clone(), change.participant.clone());
        match &change.new_resource {
            Some(resource) => {
                let previous_name = self.states.remove(&slot).and_then(|state| state.display_name);
                self.states.insert(
                    slot,
                    VoiceState {
                        resource: resource.clone(),
                        display_name: change.display_name.clone().or(previous_name),
                    },
                );
            }
            None => {
                self.states.remove(&slot);
            }
        }
    }

    /// Participants connected to `key`, ordered by participant ID.
    pub fn members(&self, key: &ResourceKey) -> Vec<PresentParticipant> {
        self.states
            .iter()
            .filter(|((scope, _), state)| scope == &key.scope && state.resource == key.resource)
            .map(|((_, participant), state)| PresentParticipant {
                id: participant.clone(),
                display_name: state.display_name.clone(),
            })
            .collect()
    }
}
