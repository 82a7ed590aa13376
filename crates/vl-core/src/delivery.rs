//! Report delivery.
//!
//! Reports are handed to a bounded queue drained by a single
//! [`DeliveryWorker`]. Enqueueing never waits: a stopped session is final,
//! so a full queue drops the delivery and reports the failure instead of
//! holding up the caller. The worker logs sink failures and returns
//! [`DeliveryStats`] to whoever awaits it once every [`DeliveryQueue`]
//! handle is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::report::Report;
use crate::types::ParticipantId;

/// Report delivery errors. Logged, never retried.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The delivery queue has no free slot.
    #[error("delivery queue is full")]
    QueueFull,

    /// The delivery worker has shut down.
    #[error("delivery queue is closed")]
    QueueClosed,

    /// The sink could not send the report.
    #[error("failed to deliver report to {recipient}: {message}")]
    Sink {
        recipient: ParticipantId,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sends a finished report to a participant.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, recipient: &ParticipantId, report: &Report)
    -> Result<(), DeliveryError>;
}

/// A queued delivery.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub recipient: ParticipantId,
    pub report: Arc<Report>,
}

/// Outcome counts of a [`DeliveryWorker`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub delivered: usize,
    pub failed: usize,
}

/// Producer side of the delivery queue.
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    tx: mpsc::Sender<Delivery>,
}

impl DeliveryQueue {
    /// Creates a queue with room for `capacity` pending deliveries.
    pub fn new(sink: Arc<dyn ReportSink>, capacity: usize) -> (Self, DeliveryWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, DeliveryWorker { rx, sink })
    }

    /// Queues `report` for `recipient` without waiting.
    pub fn enqueue(&self, recipient: ParticipantId, report: Arc<Report>) -> Result<(), DeliveryError> {
        self.tx
            .try_send(Delivery { recipient, report })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DeliveryError::QueueClosed,
            })
    }
}

/// Consumer side of the delivery queue.
pub struct DeliveryWorker {
    rx: mpsc::Receiver<Delivery>,
    sink: Arc<dyn ReportSink>,
}

impl DeliveryWorker {
    /// Delivers queued reports until every producer is dropped.
    pub async fn run(mut self) -> DeliveryStats {
        let mut stats = DeliveryStats::default();
        while let Some(delivery) = self.rx.recv().await {
            match self.sink.deliver(&delivery.recipient, &delivery.report).await {
                Ok(()) => {
                    stats.delivered += 1;
                    tracing::info!(
                        recipient = %delivery.recipient,
                        session = %delivery.report.session,
                        "report delivered"
                    );
                }
                Err(err) => {
                    stats.failed += 1;
                    tracing::warn!(
                        recipient = %delivery.recipient,
                        session = %delivery.report.session,
                        error = %err,
                        "report delivery failed"
                    );
                }
            }
        }
        stats
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Sink that records deliveries and fails for selected recipients.
    #[derive(Default)]
    pub struct RecordingSink {
        pub delivered: Mutex<Vec<(ParticipantId, Arc<Report>)>>,
        pub failing: Vec<ParticipantId>,
    }

    impl RecordingSink {
        pub fn recipients(&self) -> Vec<String> {
            self.delivered
                .lock()
                .unwrap()
                .iter()
                .map(|(recipient, _)| recipient.to_string())
                .collect()
        }
    }

    #[async_trait]
    impl ReportSink for RecordingSink {
        async fn deliver(
            &self,
            recipient: &ParticipantId,
            report: &Report,
        ) -> Result<(), DeliveryError> {
            if self.failing.contains(recipient) {
                return Err(DeliveryError::Sink {
                    recipient: recipient.clone(),
                    message: "user has direct messages disabled".to_string(),
                });
            }
            self.delivered
                .lock()
                .unwrap()
                .push((recipient.clone(), Arc::new(report.clone())));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    use chrono::{TimeZone, Utc};

    use crate::types::{ResourceId, ResourceKey, ScopeId, SessionId};

    fn report() -> Arc<Report> {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).single().unwrap();
        Arc::new(Report {
            session: SessionId::generate(),
            resource: ResourceKey::new(ScopeId::new("g").unwrap(), ResourceId::new("v").unwrap()),
            label: "General".to_string(),
            initiator: ParticipantId::new("host").unwrap(),
            started_at: at,
            stopped_at: at,
            rows: Vec::new(),
        })
    }

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_worker_counts_failures_and_keeps_going() {
        let sink = Arc::new(RecordingSink {
            failing: vec![pid("blocked")],
            ..RecordingSink::default()
        });
        let (queue, worker) = DeliveryQueue::new(sink.clone(), 8);

        queue.enqueue(pid("a"), report()).unwrap();
        queue.enqueue(pid("blocked"), report()).unwrap();
        queue.enqueue(pid("b"), report()).unwrap();
        drop(queue);

        let stats = worker.run().await;
        assert_eq!(stats, DeliveryStats { delivered: 2, failed: 1 });
        assert_eq!(sink.recipients(), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_waiting() {
        let (queue, _worker) = DeliveryQueue::new(Arc::new(RecordingSink::default()), 1);

        queue.enqueue(pid("a"), report()).unwrap();
        assert!(matches!(
            queue.enqueue(pid("b"), report()),
            Err(DeliveryError::QueueFull)
        ));
    }

    #[tokio::test]
    async fn test_closed_queue_is_reported() {
        let (queue, worker) = DeliveryQueue::new(Arc::new(RecordingSink::default()), 4);
        drop(worker);

        assert!(matches!(
            queue.enqueue(pid("a"), report()),
            Err(DeliveryError::QueueClosed)
        ));
    }
}
