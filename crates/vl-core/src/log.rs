//! Per-participant presence logs.
//!
//! A [`ParticipantLog`] is the ordered list of joins and leaves one
//! participant produced while a resource was being tracked. Totals are
//! computed by pairing events `(0, 1)`, `(2, 3)`, ... so a well-formed log
//! alternates join/leave and ends on a leave once [`ParticipantLog::close`]
//! has run.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::interval::elapsed;
use crate::types::{AlternationPolicy, ParticipantId};

/// A timestamped join or leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceEvent {
    pub timestamp: DateTime<Utc>,
    pub joined: bool,
}

impl PresenceEvent {
    pub const fn join(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            joined: true,
        }
    }

    pub const fn leave(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            joined: false,
        }
    }
}

/// Transitions refused under [`AlternationPolicy::Strict`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogError {
    /// The transition repeats the participant's current state.
    #[error("{participant} {} twice in a row", transition_verb(.joined))]
    RepeatedTransition {
        participant: ParticipantId,
        joined: bool,
    },

    /// The event is older than the last one in the log.
    #[error("event for {participant} at {at} precedes last event at {last}")]
    OutOfOrder {
        participant: ParticipantId,
        last: DateTime<Utc>,
        at: DateTime<Utc>,
    },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn transition_verb(joined: &bool) -> &'static str {
    if *joined { "joined" } else { "left" }
}

/// What [`ParticipantLog::record`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Appended,
    /// Dropped because it repeated the current state.
    Coalesced,
}

/// Presence history of one participant within one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantLog {
    participant: ParticipantId,
    display_name: String,
    name_resolved: bool,
    events: Vec<PresenceEvent>,
}

impl ParticipantLog {
    /// Creates an empty log.
    ///
    /// Without a known display name the participant ID is used as the label
    /// until [`resolve_name`](Self::resolve_name) supplies one.
    pub fn new(participant: ParticipantId, display_name: Option<String>) -> Self {
        let (display_name, name_resolved) = match display_name {
            Some(name) => (name, true),
            None => (participant.to_string(), false),
        };
        Self {
            participant,
            display_name,
            name_resolved,
            events: Vec::new(),
        }
    }

    pub const fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub const fn is_name_resolved(&self) -> bool {
        self.name_resolved
    }

    pub fn events(&self) -> &[PresenceEvent] {
        &self.events
    }

    /// Whether the last recorded event is a join.
    pub fn is_present(&self) -> bool {
        self.events.last().is_some_and(|event| event.joined)
    }

    /// Caches the resolved display name.
    ///
    /// Names are resolved once per log; returns `false` if one was already
    /// cached.
    pub fn resolve_name(&mut self, name: String) -> bool {
        if self.name_resolved {
            return false;
        }
        self.display_name = name;
        self.name_resolved = true;
        true
    }

    /// Appends an event without any validation.
    pub fn append(&mut self, event: PresenceEvent) {
        self.events.push(event);
    }

    /// Appends an event, applying `policy` to transitions that do not
    /// alternate.
    ///
    /// A leave as the very first event counts as a repeat: the participant
    /// was not present in the log yet.
    pub fn record(
        &mut self,
        event: PresenceEvent,
        policy: AlternationPolicy,
    ) -> Result<Recorded, LogError> {
        let last = self.events.last().copied();
        let repeats = last.map_or(!event.joined, |last| last.joined == event.joined);

        match policy {
            AlternationPolicy::Trust => {}
            AlternationPolicy::Coalesce => {
                if repeats {
                    return Ok(Recorded::Coalesced);
                }
            }
            AlternationPolicy::Strict => {
                if repeats {
                    return Err(LogError::RepeatedTransition {
                        participant: self.participant.clone(),
                        joined: event.joined,
                    });
                }
                if let Some(last) = last.filter(|last| event.timestamp < last.timestamp) {
                    return Err(LogError::OutOfOrder {
                        participant: self.participant.clone(),
                        last: last.timestamp,
                        at: event.timestamp,
                    });
                }
            }
        }

        self.append(event);
        Ok(Recorded::Appended)
    }

    /// Closes an open presence interval at `at`.
    ///
    /// Returns `true` if a closing leave was appended.
    pub fn close(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_present() {
            self.append(PresenceEvent::leave(at));
            true
        } else {
            false
        }
    }

    /// Sums the join/leave pairs of the log.
    ///
    /// Call [`close`](Self::close) first. A trailing unpaired event (only
    /// possible under [`AlternationPolicy::Trust`]) is ignored.
    pub fn total_connected_duration(&self) -> Duration {
        self.events
            .chunks_exact(2)
            .map(|pair| elapsed(pair[0].timestamp, pair[1].timestamp))
            .fold(Duration::zero(), |total, gap| total + gap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0)
            .single()
            .expect("valid test timestamp")
            + Duration::milliseconds(ms)
    }

    fn log() -> ParticipantLog {
        ParticipantLog::new(ParticipantId::new("42").unwrap(), None)
    }

    #[test]
    fn test_unresolved_log_uses_participant_id_as_label() {
        let log = log();
        assert_eq!(log.display_name(), "42");
        assert!(!log.is_name_resolved());
    }

    #[test]
    fn test_name_is_resolved_only_once() {
        let mut log = log();
        assert!(log.resolve_name("Ada".to_string()));
        assert!(!log.resolve_name("Grace".to_string()));
        assert_eq!(log.display_name(), "Ada");
    }

    #[test]
    fn test_seeded_name_counts_as_resolved() {
        let mut log = ParticipantLog::new(ParticipantId::new("7").unwrap(), Some("Lin".into()));
        assert!(log.is_name_resolved());
        assert!(!log.resolve_name("Other".to_string()));
    }

    #[test]
    fn test_total_sums_pairwise_gaps() {
        let mut log = log();
        log.append(PresenceEvent::join(ts(0)));
        log.append(PresenceEvent::leave(ts(1_000)));
        log.append(PresenceEvent::join(ts(5_000)));
        log.append(PresenceEvent::leave(ts(7_500)));
        log.append(PresenceEvent::join(ts(10_000)));
        log.close(ts(10_250));

        assert_eq!(log.events().len(), 6);
        assert_eq!(log.total_connected_duration(), Duration::milliseconds(3_750));
    }

    #[test]
    fn test_join_closed_at_same_instant_is_zero() {
        let mut log = log();
        log.append(PresenceEvent::join(ts(3_000)));
        assert!(log.close(ts(3_000)));
        assert_eq!(log.total_connected_duration(), Duration::zero());
    }

    #[test]
    fn test_close_is_noop_after_leave() {
        let mut log = log();
        log.append(PresenceEvent::join(ts(0)));
        log.append(PresenceEvent::leave(ts(2_000)));
        assert!(!log.close(ts(9_000)));
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.total_connected_duration(), Duration::milliseconds(2_000));
    }

    #[test]
    fn test_empty_log_totals_zero() {
        let mut log = log();
        assert!(!log.close(ts(1)));
        assert_eq!(log.total_connected_duration(), Duration::zero());
    }

    #[test]
    fn test_trailing_unpaired_event_is_ignored() {
        let mut log = log();
        log.append(PresenceEvent::join(ts(0)));
        log.append(PresenceEvent::leave(ts(1_000)));
        log.append(PresenceEvent::leave(ts(2_000)));
        assert_eq!(log.total_connected_duration(), Duration::milliseconds(1_000));
    }

    #[test]
    fn test_trust_policy_appends_repeats() {
        let mut log = log();
        let policy = AlternationPolicy::Trust;
        assert_eq!(log.record(PresenceEvent::leave(ts(0)), policy), Ok(Recorded::Appended));
        assert_eq!(log.record(PresenceEvent::join(ts(1)), policy), Ok(Recorded::Appended));
        assert_eq!(log.record(PresenceEvent::join(ts(2)), policy), Ok(Recorded::Appended));
        assert_eq!(log.events().len(), 3);
    }

    #[test]
    fn test_coalesce_policy_drops_repeats() {
        let mut log = log();
        let policy = AlternationPolicy::Coalesce;
        assert_eq!(log.record(PresenceEvent::leave(ts(0)), policy), Ok(Recorded::Coalesced));
        assert_eq!(log.record(PresenceEvent::join(ts(1_000)), policy), Ok(Recorded::Appended));
        assert_eq!(log.record(PresenceEvent::join(ts(2_000)), policy), Ok(Recorded::Coalesced));
        assert_eq!(log.record(PresenceEvent::leave(ts(4_000)), policy), Ok(Recorded::Appended));
        assert_eq!(log.record(PresenceEvent::leave(ts(5_000)), policy), Ok(Recorded::Coalesced));

        // The first join wins, so the interval is 1s..4s.
        assert_eq!(log.total_connected_duration(), Duration::milliseconds(3_000));
    }

    #[test]
    fn test_strict_policy_rejects_repeats() {
        let mut log = log();
        let policy = AlternationPolicy::Strict;
        log.record(PresenceEvent::join(ts(0)), policy).unwrap();

        let err = log.record(PresenceEvent::join(ts(1)), policy).unwrap_err();
        assert_eq!(
            err,
            LogError::RepeatedTransition {
                participant: ParticipantId::new("42").unwrap(),
                joined: true,
            }
        );
        assert_eq!(err.to_string(), "42 joined twice in a row");
        assert_eq!(log.events().len(), 1);
    }

    #[test]
    fn test_strict_policy_rejects_time_travel() {
        let mut log = log();
        let policy = AlternationPolicy::Strict;
        log.record(PresenceEvent::join(ts(5_000)), policy).unwrap();

        let err = log.record(PresenceEvent::leave(ts(4_000)), policy).unwrap_err();
        assert!(matches!(err, LogError::OutOfOrder { .. }));
        assert!(log.is_present());
    }
}
