//! Presence change routing.
//!
//! The platform reports a participant moving between resources as one
//! change with an optional old and new resource. The router splits it into
//! a leave for the old resource and a join for the new one and hands both
//! to the [`Tracker`], which ignores resources nobody is tracking.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::registry::TransitionOutcome;
use crate::tracker::Tracker;
use crate::types::{ParticipantId, ResourceId, ResourceKey, ScopeId};

/// A participant's presence moved, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChange {
    pub participant: ParticipantId,
    pub scope: ScopeId,
    pub old_resource: Option<ResourceId>,
    pub new_resource: Option<ResourceId>,
    /// Display name carried by the notification, if any.
    pub display_name: Option<String>,
    /// When the platform observed the change.
    pub at: DateTime<Utc>,
}

/// One join or leave derived from a [`PresenceChange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub key: ResourceKey,
    pub joined: bool,
}

impl PresenceChange {
    /// Splits the change into a leave (old resource) followed by a join
    /// (new resource). Staying in the same resource yields nothing.
    pub fn transitions(&self) -> Vec<Transition> {
        if self.old_resource == self.new_resource {
            return Vec::new();
        }
        let leave = self.old_resource.as_ref().map(|resource| Transition {
            key: ResourceKey::new(self.scope.clone(), resource.clone()),
            joined: false,
        });
        let join = self.new_resource.as_ref().map(|resource| Transition {
            key: ResourceKey::new(self.scope.clone(), resource.clone()),
            joined: true,
        });
        leave.into_iter().chain(join).collect()
    }
}

/// Applies a presence change to the tracker.
///
/// Returns how many transitions landed in a tracked resource.
pub fn route(tracker: &Tracker, change: &PresenceChange) -> usize {
    change
        .transitions()
        .into_iter()
        .map(|transition| {
            tracker.record(
                &transition.key,
                &change.participant,
                change.display_name.clone(),
                transition.joined,
                change.at,
            )
        })
        .filter(|outcome| !matches!(outcome, TransitionOutcome::Untracked))
        .count()
}

/// Drains presence changes from the platform into the tracker.
pub struct PresenceRouter {
    tracker: Tracker,
    rx: mpsc::UnboundedReceiver<PresenceChange>,
}

impl PresenceRouter {
    /// Creates a router and the sender the presence source publishes to.
    ///
    /// The channel is unbounded so a slow tracker never blocks the source.
    pub fn channel(tracker: Tracker) -> (mpsc::UnboundedSender<PresenceChange>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { tracker, rx })
    }

    /// Routes changes until every sender is dropped.
    ///
    /// Returns the number of changes processed.
    pub async fn run(mut self) -> usize {
        let mut processed = 0;
        while let Some(change) = self.rx.recv().await {
            let tracked = route(&self.tracker, &change);
            tracing::trace!(participant = %change.participant, tracked, "presence change routed");
            processed += 1;
        }
        processed
    }
}
