//! Core attendance tracking for voice channels.
//!
//! This crate contains:
//! - Participant logs: join/leave history per participant
//! - The session registry: which resources are tracked
//! - Routing of platform presence changes into the registry
//! - Report reduction: total connected time per participant
//! - The [`Tracker`] engine tying these to name lookup and report delivery

pub mod delivery;
pub mod interval;
pub mod log;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod router;
mod tracker;
pub mod types;

pub use delivery::{DeliveryError, DeliveryQueue, DeliveryStats, DeliveryWorker, ReportSink};
pub use interval::{elapsed, format_duration};
pub use log::{LogError, ParticipantLog, PresenceEvent, Recorded};
pub use registry::{
    PresentParticipant, SessionRegistry, SessionSnapshot, SessionSummary, TrackingError,
    TransitionOutcome,
};
pub use report::{REPORT_HEADER, Report, ReportRow, build_report};
pub use resolve::{NameResolver, ResolveError, StaticNameResolver};
pub use router::{PresenceChange, PresenceRouter, route};
pub use tracker::Tracker;
pub use types::{
    AlternationPolicy, ParticipantId, ResourceId, ResourceKey, ScopeId, SessionId,
    ValidationError,
};
