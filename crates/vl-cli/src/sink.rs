//! Report sink that writes CSV files.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use vl_core::{DeliveryError, ParticipantId, Report, ReportSink};

/// Delivers each report as `<dir>/<recipient>/<resource>-<session>.csv`.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    dir: PathBuf,
}

/// Escapes an ID into a single path component.
///
/// Every byte outside `[A-Za-z0-9-]` becomes `_XX` (uppercase hex), so
/// distinct IDs never share a directory or file name.
fn path_component(id: &str) -> String {
    let mut component = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            component.push(char::from(byte));
        } else {
            // Writing to a String cannot fail.
            let _ = write!(component, "_{byte:02X}");
        }
    }
    component
}

impl FileReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the report for `recipient` is written.
    pub fn report_path(&self, recipient: &ParticipantId, report: &Report) -> PathBuf {
        self.dir.join(path_component(recipient.as_str())).join(format!(
            "{}-{}.csv",
            path_component(report.resource.resource.as_str()),
            report.session
        ))
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    async fn deliver(
        &self,
        recipient: &ParticipantId,
        report: &Report,
    ) -> Result<(), DeliveryError> {
        let path = self.report_path(recipient, report);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, report.to_csv()).await?;
        tracing::debug!(path = %path.display(), "report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use vl_core::{ResourceId, ResourceKey, ScopeId, SessionId};

    fn report(resource: &str) -> Report {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).single().unwrap();
        Report {
            session: SessionId::generate(),
            resource: ResourceKey::new(ScopeId::new("g").unwrap(), ResourceId::new(resource).unwrap()),
            label: "General".to_string(),
            initiator: ParticipantId::new("host").unwrap(),
            started_at: at,
            stopped_at: at,
            rows: Vec::new(),
        }
    }

    #[test]
    fn test_path_components_are_escaped() {
        assert_eq!(path_component("../etc"), "_2E_2E_2Fetc");
        assert_eq!(path_component("1234_ab-c"), "1234_5Fab-c");
        assert_eq!(path_component("Zoë"), "Zo_C3_AB");
    }

    #[test]
    fn test_distinct_recipients_get_distinct_paths() {
        let sink = FileReportSink::new("/tmp/reports");
        let report = report("v");
        let dotted = sink.report_path(&ParticipantId::new("a.b").unwrap(), &report);
        let underscored = sink.report_path(&ParticipantId::new("a_b").unwrap(), &report);
        let escaped = sink.report_path(&ParticipantId::new("a_2Eb").unwrap(), &report);

        assert_ne!(dotted, underscored);
        assert_ne!(dotted, escaped);
        assert_ne!(underscored, escaped);
    }

    #[tokio::test]
    async fn test_colliding_ids_keep_separate_reports() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileReportSink::new(dir.path());
        let mut first = report("v1");
        first.label = "first".to_string();
        let second = report("v1");

        sink.deliver(&ParticipantId::new("a.b").unwrap(), &first).await.unwrap();
        sink.deliver(&ParticipantId::new("a_b").unwrap(), &second).await.unwrap();

        let mut dirs: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        dirs.sort();
        assert_eq!(dirs, ["a_2Eb", "a_5Fb"]);
    }

    #[tokio::test]
    async fn test_deliver_writes_csv_per_recipient() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileReportSink::new(dir.path());
        let report = report("v1");
        let recipient = ParticipantId::new("u1").unwrap();

        sink.deliver(&recipient, &report).await.unwrap();

        let path = sink.report_path(&recipient, &report);
        assert!(path.starts_with(dir.path().join("u1")));
        assert_eq!(std::fs::read_to_string(path).unwrap(), vl_core::REPORT_HEADER);
    }

    #[tokio::test]
    async fn test_deliver_fails_when_directory_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let sink = FileReportSink::new(&blocker);

        let result = sink.deliver(&ParticipantId::new("u1").unwrap(), &report("v1")).await;
        assert!(matches!(result, Err(DeliveryError::Io(_))));
    }
}
