//! Run command: drives the tracker from a feed.
//!
//! Presence changes and commands are handled one line at a time on a single
//! task, so a stop never races a transition for the same channel. Reports
//! are delivered by a separate worker writing CSV files.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use vl_core::{DeliveryQueue, DeliveryStats, SessionRegistry, StaticNameResolver, Tracker, route};

use crate::Config;
use crate::feed::{FeedEntry, VoiceStates};
use crate::frontend;
use crate::sink::FileReportSink;

/// Counts from one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub entries: usize,
    pub skipped: usize,
    pub deliveries: DeliveryStats,
}

/// Processes the feed in `input`, or stdin when `None`.
///
/// A replayed file waits for pending name lookups after every entry so
/// reports come out the same on every run; a live stdin feed does not.
pub async fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    input: Option<&Path>,
    out_dir: &Path,
) -> Result<RunSummary> {
    match input {
        Some(path) => {
            let file = File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            process(BufReader::new(file), writer, config, out_dir, true).await
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            process(stdin, writer, config, out_dir, false).await
        }
    }
}

/// Processes feed lines from `reader`, writing command replies to `writer`.
pub async fn process<R, W>(
    reader: R,
    writer: &mut W,
    config: &Config,
    out_dir: &Path,
    settle: bool,
) -> Result<RunSummary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let sink = Arc::new(FileReportSink::new(out_dir));
    let (deliveries, worker) = DeliveryQueue::new(sink.clone(), config.delivery_queue_capacity);
    let worker = tokio::spawn(worker.run());

    let resolver = Arc::new(StaticNameResolver::new(config.names.clone()));
    let tracker = Tracker::new(
        SessionRegistry::new(config.alternation_policy),
        resolver,
        deliveries,
    );
    let mut voice_states = VoiceStates::default();
    let mut summary = RunSummary::default();

    let mut lines = reader.lines();
    let mut line_number = 0usize;
    while let Some(line) = lines.next_line().await.context("failed to read feed")? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let entry: FeedEntry = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(line = line_number, error = %err, "skipping malformed feed entry");
                summary.skipped += 1;
                continue;
            }
        };
        summary.entries += 1;

        let now = Utc::now();
        match entry {
            FeedEntry::Presence(entry) => {
                let change = entry.into_change(now);
                route(&tracker, &change);
                voice_states.apply(&change);
            }
            FeedEntry::Command(invocation) => {
                let at = invocation.at.unwrap_or(now);
                let reply = frontend::handle(&tracker, &voice_states, &invocation, at);
                writeln!(writer, "{reply}").context("failed to write reply")?;
            }
        }

        if settle {
            tracker.settle().await;
        }
    }

    tracker.settle().await;
    drop(tracker);
    summary.deliveries = worker.await.context("delivery worker panicked")?;

    tracing::info!(
        entries = summary.entries,
        skipped = summary.skipped,
        delivered = summary.deliveries.delivered,
        failed = summary.deliveries.failed,
        report_dir = %sink.dir().display(),
        "feed processed"
    );
    Ok(summary)
}
