//! Registry of tracked resources.
//!
//! The registry is a plain owned value: callers that share it across tasks
//! wrap it in a lock (see [`Tracker`](crate::Tracker)). Every operation that
//! touches a resource key goes through `&mut self`, so a stop can never
//! interleave with a transition on the same resource.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::log::{LogError, ParticipantLog, PresenceEvent, Recorded};
use crate::types::{AlternationPolicy, ParticipantId, ResourceId, ResourceKey, ScopeId, SessionId};

/// Errors returned by session lifecycle operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackingError {
    /// A session already exists for the resource.
    #[error("{key} is already being tracked")]
    AlreadyTracking { key: ResourceKey },

    /// No session exists for the resource.
    #[error("{key} is not being tracked")]
    NotTracking { key: ResourceKey },
}

/// A participant found in the resource when tracking starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentParticipant {
    pub id: ParticipantId,
    /// Known display name, if the platform supplied one.
    pub display_name: Option<String>,
}

/// Returned by [`SessionRegistry::start_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: SessionId,
    pub key: ResourceKey,
    /// Seeded participants whose display name still has to be looked up.
    pub unresolved: Vec<ParticipantId>,
}

/// Result of [`SessionRegistry::record_transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The resource is not tracked; nothing was recorded.
    Untracked,
    Recorded {
        session: SessionId,
        recorded: Recorded,
        /// The participant got a new log without a resolved display name.
        needs_name: bool,
    },
    /// The alternation policy refused the event.
    Rejected { session: SessionId, error: LogError },
}

/// A resource listed by [`SessionRegistry::list_sessions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub resource: ResourceId,
    pub label: String,
}

/// One active tracking session.
#[derive(Debug, Clone)]
pub struct TrackedSession {
    id: SessionId,
    key: ResourceKey,
    label: String,
    initiator: ParticipantId,
    started_at: DateTime<Utc>,
    /// Registration order, used for stable listings.
    sequence: u64,
    logs: Vec<ParticipantLog>,
    index: HashMap<ParticipantId, usize>,
}

impl TrackedSession {
    pub const fn id(&self) -> SessionId {
        self.id
    }

    pub const fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub const fn initiator(&self) -> &ParticipantId {
        &self.initiator
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Logs in order of first appearance.
    pub fn logs(&self) -> &[ParticipantLog] {
        &self.logs
    }

    pub fn log(&self, participant: &ParticipantId) -> Option<&ParticipantLog> {
        self.index.get(participant).map(|&i| &self.logs[i])
    }

    fn log_mut(&mut self, participant: &ParticipantId) -> Option<&mut ParticipantLog> {
        self.index.get(participant).map(|&i| &mut self.logs[i])
    }

    fn insert_log(&mut self, log: ParticipantLog) {
        self.index.insert(log.participant().clone(), self.logs.len());
        self.logs.push(log);
    }
}

/// Immutable view of a stopped session, handed to the report reducer.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    id: SessionId,
    key: ResourceKey,
    label: String,
    initiator: ParticipantId,
    started_at: DateTime<Utc>,
    stopped_at: DateTime<Utc>,
    logs: Vec<ParticipantLog>,
}

impl SessionSnapshot {
    pub const fn id(&self) -> SessionId {
        self.id
    }

    pub const fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub const fn initiator(&self) -> &ParticipantId {
        &self.initiator
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub const fn stopped_at(&self) -> DateTime<Utc> {
        self.stopped_at
    }

    /// Closed logs in order of first appearance.
    pub fn logs(&self) -> &[ParticipantLog] {
        &self.logs
    }
}

/// Maps tracked resources to their sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    policy: AlternationPolicy,
    sessions: HashMap<ResourceKey, TrackedSession>,
    next_sequence: u64,
}

impl SessionRegistry {
    pub fn new(policy: AlternationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub const fn policy(&self) -> AlternationPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_tracking(&self, key: &ResourceKey) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn session(&self, key: &ResourceKey) -> Option<&TrackedSession> {
        self.sessions.get(key)
    }

    /// Starts tracking `key`.
    ///
    /// Everyone in `present` is seeded with a join at `at`. Fails without
    /// touching the existing session if `key` is already tracked.
    pub fn start_session(
        &mut self,
        key: ResourceKey,
        label: impl Into<String>,
        initiator: ParticipantId,
        present: impl IntoIterator<Item = PresentParticipant>,
        at: DateTime<Utc>,
    ) -> Result<SessionHandle, TrackingError> {
        let Entry::Vacant(slot) = self.sessions.entry(key.clone()) else {
            return Err(TrackingError::AlreadyTracking { key });
        };

        let mut session = TrackedSession {
            id: SessionId::generate(),
            key: key.clone(),
            label: label.into(),
            initiator,
            started_at: at,
            sequence: self.next_sequence,
            logs: Vec::new(),
            index: HashMap::new(),
        };
        self.next_sequence += 1;

        let mut unresolved = Vec::new();
        for participant in present {
            if session.index.contains_key(&participant.id) {
                continue;
            }
            let mut log = ParticipantLog::new(participant.id, participant.display_name);
            log.append(PresenceEvent::join(at));
            if !log.is_name_resolved() {
                unresolved.push(log.participant().clone());
            }
            session.insert_log(log);
        }

        tracing::debug!(
            resource = %key,
            session = %session.id,
            seeded = session.logs.len(),
            "session started"
        );

        let handle = SessionHandle {
            id: session.id,
            key,
            unresolved,
        };
        slot.insert(session);
        Ok(handle)
    }

    /// Records a join or leave for `participant` in `key`.
    ///
    /// Untracked resources are ignored. A participant's log is created on
    /// the first event the alternation policy accepts.
    pub fn record_transition(
        &mut self,
        key: &ResourceKey,
        participant: &ParticipantId,
        display_name: Option<String>,
        joined: bool,
        at: DateTime<Utc>,
    ) -> TransitionOutcome {
        let policy = self.policy;
        let Some(session) = self.sessions.get_mut(key) else {
            return TransitionOutcome::Untracked;
        };
        let event = PresenceEvent {
            timestamp: at,
            joined,
        };

        let (result, needs_name) = if let Some(log) = session.log_mut(participant) {
            (log.record(event, policy), false)
        } else {
            let mut log = ParticipantLog::new(participant.clone(), display_name);
            let result = log.record(event, policy);
            let needs_name = !log.is_name_resolved();
            if matches!(result, Ok(Recorded::Appended)) {
                session.insert_log(log);
                (result, needs_name)
            } else {
                (result, false)
            }
        };

        match result {
            Ok(recorded) => TransitionOutcome::Recorded {
                session: session.id,
                recorded,
                needs_name,
            },
            Err(error) => TransitionOutcome::Rejected {
                session: session.id,
                error,
            },
        }
    }

    /// Caches a resolved display name for a participant of `session`.
    ///
    /// Ignored if the session has ended, the resource is now tracked by a
    /// different session, or the name was already resolved.
    pub fn resolve_display_name(
        &mut self,
        key: &ResourceKey,
        session: SessionId,
        participant: &ParticipantId,
        name: String,
    ) -> bool {
        self.sessions
            .get_mut(key)
            .filter(|tracked| tracked.id == session)
            .and_then(|tracked| tracked.log_mut(participant))
            .is_some_and(|log| log.resolve_name(name))
    }

    /// Stops tracking `key`, closing every log at `at`.
    ///
    /// The session is removed from the registry; a stopped session cannot be
    /// resumed.
    pub fn stop_session(
        &mut self,
        key: &ResourceKey,
        at: DateTime<Utc>,
    ) -> Result<SessionSnapshot, TrackingError> {
        let Some(mut session) = self.sessions.remove(key) else {
            return Err(TrackingError::NotTracking { key: key.clone() });
        };

        let closed = session
            .logs
            .iter_mut()
            .map(|log| log.close(at))
            .filter(|&closed| closed)
            .count();

        tracing::debug!(
            resource = %key,
            session = %session.id,
            participants = session.logs.len(),
            closed,
            "session stopped"
        );

        Ok(SessionSnapshot {
            id: session.id,
            key: session.key,
            label: session.label,
            initiator: session.initiator,
            started_at: session.started_at,
            stopped_at: at,
            logs: session.logs,
        })
    }

    /// Lists tracked resources in `scope`, oldest session first.
    pub fn list_sessions(&self, scope: &ScopeId) -> Vec<SessionSummary> {
        let mut sessions: Vec<&TrackedSession> = self
            .sessions
            .values()
            .filter(|session| &session.key.scope == scope)
            .collect();
        sessions.sort_by_key(|session| session.sequence);
        sessions
            .into_iter()
            .map(|session| SessionSummary {
                resource: session.key.resource.clone(),
                label: session.label.clone(),
            })
            .collect()
    }
}
