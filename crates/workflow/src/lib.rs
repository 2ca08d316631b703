//! `stagecraft-workflow` — media-production job workflow domain.
//!
//! Pure types and rules: the tenant hierarchy, presets, jobs and their child
//! records, the transition table, audit events and reports. No IO.

pub mod audit;
pub mod job;
pub mod org;
pub mod preset;
pub mod report;
pub mod transition;

pub use audit::{AuditEntityType, AuditEvent, AuditEventType};
pub use job::{
    ApprovalDecision, AssetInput, AssetKind, Job, JobApproval, JobAsset, JobDelivery, JobRevision,
    JobStatus, NewJob, Priority,
};
pub use org::{Brokerage, Membership, MembershipScope, Office, Team, User};
pub use preset::{Preset, PresetDraft, PresetPatch, PresetScope};
pub use report::{ReportSummary, ReportType};
pub use transition::{
    TransitionActor, TransitionMetadata, TransitionRule, submission_route, validate_transition,
};
