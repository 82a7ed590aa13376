//! Attendance report reduction.
//!
//! Folds the closed logs of a stopped session into one row per participant.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::interval::format_duration;
use crate::registry::SessionSnapshot;
use crate::types::{ParticipantId, ResourceKey, SessionId};

/// Header line of the CSV rendering.
pub const REPORT_HEADER: &str = "nickname, time (h:m:s), userid, time (ms)";

/// Total connected time of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub display_name: String,
    /// `H:MM:SS` rendering of `total_duration_ms`.
    pub total_duration: String,
    pub participant_id: ParticipantId,
    pub total_duration_ms: i64,
}

/// Attendance report of one stopped session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub session: SessionId,
    pub resource: ResourceKey,
    pub label: String,
    pub initiator: ParticipantId,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    /// One row per participant, in order of first appearance.
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn row(&self, participant: &ParticipantId) -> Option<&ReportRow> {
        self.rows.iter().find(|row| &row.participant_id == participant)
    }

    /// Renders the report as the CSV attachment sent to users.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(REPORT_HEADER);
        for row in &self.rows {
            // Writing to a String cannot fail.
            let _ = write!(
                csv,
                "\n{}, {}, {}, {}",
                row.display_name, row.total_duration, row.participant_id, row.total_duration_ms
            );
        }
        csv
    }
}

/// Builds the report for a stopped session.
///
/// The snapshot's logs are already closed, so every open interval ends at
/// the stop instant.
pub fn build_report(snapshot: &SessionSnapshot) -> Report {
    let rows = snapshot
        .logs()
        .iter()
        .map(|log| {
            let total = log.total_connected_duration();
            ReportRow {
                display_name: log.display_name().to_string(),
                total_duration: format_duration(total),
                participant_id: log.participant().clone(),
                total_duration_ms: total.num_milliseconds(),
            }
        })
        .collect();

    Report {
        session: snapshot.id(),
        resource: snapshot.key().clone(),
        label: snapshot.label().to_string(),
        initiator: snapshot.initiator().clone(),
        started_at: snapshot.started_at(),
        stopped_at: snapshot.stopped_at(),
        rows,
    }
}
