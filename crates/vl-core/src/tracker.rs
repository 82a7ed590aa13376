//! The attendance tracking engine.
//!
//! [`Tracker`] owns the [`SessionRegistry`] behind a mutex together with the
//! name resolver and the delivery queue. The mutex is only held for the
//! registry call itself; name lookups and report deliveries run on spawned
//! tasks, so nothing awaits while the registry is locked.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use crate::delivery::DeliveryQueue;
use crate::log::Recorded;
use crate::registry::{
    PresentParticipant, SessionRegistry, SessionSummary, TrackingError, TransitionOutcome,
};
use crate::report::{Report, build_report};
use crate::resolve::NameResolver;
use crate::types::{ParticipantId, ResourceKey, ScopeId, SessionId};

/// Counts name lookups that have not finished yet.
#[derive(Debug, Default)]
struct PendingLookups {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the pending lookup count when dropped.
struct LookupGuard(Arc<PendingLookups>);

impl LookupGuard {
    fn begin(pending: &Arc<PendingLookups>) -> Self {
        pending.count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(pending))
    }
}

impl Drop for LookupGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Shared handle to the tracking engine.
///
/// Cloning is cheap; all clones drive the same registry. Methods that look
/// up names must be called from within a tokio runtime.
#[derive(Clone)]
pub struct Tracker {
    registry: Arc<Mutex<SessionRegistry>>,
    resolver: Arc<dyn NameResolver>,
    deliveries: DeliveryQueue,
    lookups: Arc<PendingLookups>,
}

fn lock(registry: &Mutex<SessionRegistry>) -> MutexGuard<'_, SessionRegistry> {
    // Registry operations leave it consistent even if a holder panicked.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Tracker {
    pub fn new(
        registry: SessionRegistry,
        resolver: Arc<dyn NameResolver>,
        deliveries: DeliveryQueue,
    ) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
            resolver,
            deliveries,
            lookups: Arc::new(PendingLookups::default()),
        }
    }

    /// Starts tracking `key` and looks up names of unnamed participants.
    pub fn start(
        &self,
        key: ResourceKey,
        label: &str,
        initiator: ParticipantId,
        present: Vec<PresentParticipant>,
        at: DateTime<Utc>,
    ) -> Result<SessionId, TrackingError> {
        let handle = lock(&self.registry).start_session(key, label, initiator, present, at)?;
        tracing::info!(resource = %handle.key, session = %handle.id, label, "started logging");

        for participant in handle.unresolved {
            self.spawn_lookup(handle.key.clone(), handle.id, participant);
        }
        Ok(handle.id)
    }

    /// Records a join or leave. Untracked resources are ignored.
    pub fn record(
        &self,
        key: &ResourceKey,
        participant: &ParticipantId,
        display_name: Option<String>,
        joined: bool,
        at: DateTime<Utc>,
    ) -> TransitionOutcome {
        let outcome =
            lock(&self.registry).record_transition(key, participant, display_name, joined, at);

        match &outcome {
            TransitionOutcome::Untracked => {}
            TransitionOutcome::Recorded {
                session,
                recorded,
                needs_name,
            } => {
                if *recorded == Recorded::Coalesced {
                    tracing::debug!(
                        resource = %key,
                        %participant,
                        joined,
                        "dropped repeated transition"
                    );
                }
                if *needs_name {
                    self.spawn_lookup(key.clone(), *session, participant.clone());
                }
            }
            TransitionOutcome::Rejected { error, .. } => {
                tracing::warn!(resource = %key, error = %error, "rejected presence event");
            }
        }
        outcome
    }

    /// Stops tracking `key` and queues the report.
    ///
    /// The report goes to `requester` and, if someone else started the
    /// session, to its initiator as well. Delivery problems are logged; the
    /// session is gone either way.
    pub fn stop(
        &self,
        key: &ResourceKey,
        requester: &ParticipantId,
        at: DateTime<Utc>,
    ) -> Result<Arc<Report>, TrackingError> {
        let snapshot = lock(&self.registry).stop_session(key, at)?;
        let report = Arc::new(build_report(&snapshot));
        tracing::info!(
            resource = %key,
            session = %report.session,
            participants = report.rows.len(),
            "stopped logging"
        );

        self.dispatch(requester.clone(), &report);
        if snapshot.initiator() != requester {
            self.dispatch(snapshot.initiator().clone(), &report);
        }
        Ok(report)
    }

    /// Lists tracked resources in `scope`.
    pub fn list(&self, scope: &ScopeId) -> Vec<SessionSummary> {
        lock(&self.registry).list_sessions(scope)
    }

    /// Runs `f` against the registry under the lock.
    pub fn with_registry<T>(&self, f: impl FnOnce(&SessionRegistry) -> T) -> T {
        f(&lock(&self.registry))
    }

    /// Waits until every name lookup started so far has finished.
    pub async fn settle(&self) {
        loop {
            let idle = self.lookups.idle.notified();
            if self.lookups.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }

    fn dispatch(&self, recipient: ParticipantId, report: &Arc<Report>) {
        if let Err(err) = self.deliveries.enqueue(recipient.clone(), Arc::clone(report)) {
            tracing::warn!(%recipient, session = %report.session, error = %err, "could not queue report");
        }
    }

    fn spawn_lookup(&self, key: ResourceKey, session: SessionId, participant: ParticipantId) {
        let guard = LookupGuard::begin(&self.lookups);
        let registry = Arc::clone(&self.registry);
        let resolver = Arc::clone(&self.resolver);

        tokio::spawn(async move {
            let _guard = guard;
            match resolver.resolve(&key.scope, &participant).await {
                Ok(name) => {
                    let stored =
                        lock(&registry).resolve_display_name(&key, session, &participant, name);
                    tracing::debug!(resource = %key, %participant, stored, "display name resolved");
                }
                Err(err) => {
                    tracing::debug!(
                        resource = %key,
                        %participant,
                        error = %err,
                        "display name lookup failed, keeping participant id"
                    );
                }
            }
        });
    }
}
