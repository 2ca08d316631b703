//! Job state machine: the static transition table and its validator.
//!
//! `validate_transition` is pure. Given `(from, to, actor, metadata)` it returns
//! the matching rule or a typed failure, checked in this order:
//!
//! 1. pair absent from the table → `INVALID_TRANSITION`
//! 2. actor outside the rule's allowed set → `FORBIDDEN`
//! 3. unmet extra requirement (reason, outputs, revision category) → `VALIDATION_FAILED`

use serde::Serialize;

use stagecraft_auth::{Permission, Role};
use stagecraft_core::{AssetId, DomainError, DomainResult};

use crate::job::JobStatus;

/// Who performs a transition: a human role or the engine itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TransitionActor {
    Human(Role),
    System,
}

impl TransitionActor {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionActor::Human(role) => role.as_str(),
            TransitionActor::System => "System",
        }
    }
}

impl From<Role> for TransitionActor {
    fn from(role: Role) -> Self {
        TransitionActor::Human(role)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: JobStatus,
    pub to: JobStatus,
    pub allowed: &'static [TransitionActor],
    pub requires_reason: bool,
    pub requires_outputs: bool,
    pub requires_revision_category: bool,
    /// Permission a human caller needs to request this move. `None` for
    /// system-only moves.
    pub permission: Option<Permission>,
}

impl TransitionRule {
    const fn new(
        from: JobStatus,
        to: JobStatus,
        allowed: &'static [TransitionActor],
        permission: Option<Permission>,
    ) -> Self {
        Self {
            from,
            to,
            allowed,
            requires_reason: false,
            requires_outputs: false,
            requires_revision_category: false,
            permission,
        }
    }

    const fn reason(self) -> Self {
        Self {
            requires_reason: true,
            ..self
        }
    }

    const fn outputs(self) -> Self {
        Self {
            requires_outputs: true,
            ..self
        }
    }

    const fn revision_category(self) -> Self {
        Self {
            requires_revision_category: true,
            ..self
        }
    }

    pub fn allows(&self, actor: TransitionActor) -> bool {
        self.allowed.contains(&actor)
    }
}

/// Extra facts a transition may require.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionMetadata<'a> {
    pub reason: Option<&'a str>,
    pub output_asset_ids: &'a [AssetId],
    pub revision_reason_category: Option<&'a str>,
}

use JobStatus::*;
use TransitionActor::{Human, System};

const SUBMITTERS: &[TransitionActor] = &[
    Human(Role::Agent),
    Human(Role::OfficeAdmin),
    Human(Role::BrokerageAdmin),
];
const SYSTEM_ONLY: &[TransitionActor] = &[System];
const REVIEWERS: &[TransitionActor] = &[
    Human(Role::Reviewer),
    Human(Role::OfficeAdmin),
    Human(Role::TeamLead),
];
const PROCESS_STARTERS: &[TransitionActor] = &[
    Human(Role::MediaPartner),
    Human(Role::Reviewer),
    System,
];
const DELIVERERS: &[TransitionActor] = &[
    Human(Role::MediaPartner),
    Human(Role::Reviewer),
    Human(Role::OfficeAdmin),
];
const REVISION_REQUESTERS: &[TransitionActor] = &[
    Human(Role::Agent),
    Human(Role::TeamLead),
    Human(Role::OfficeAdmin),
    Human(Role::BrokerageAdmin),
];
const COMPLETERS: &[TransitionActor] = &[
    Human(Role::Agent),
    Human(Role::OfficeAdmin),
    Human(Role::BrokerageAdmin),
    System,
];
const REWORKERS: &[TransitionActor] = &[Human(Role::MediaPartner), Human(Role::Reviewer)];
const ADMIN_CANCELLERS: &[TransitionActor] = &[
    Human(Role::OfficeAdmin),
    Human(Role::BrokerageAdmin),
];
const SUBMITTED_CANCELLERS: &[TransitionActor] = &[
    Human(Role::OfficeAdmin),
    Human(Role::BrokerageAdmin),
    Human(Role::Agent),
];
const REOPENERS: &[TransitionActor] = &[Human(Role::Agent), Human(Role::OfficeAdmin)];

static TRANSITIONS: [TransitionRule; 15] = [
    TransitionRule::new(Draft, Submitted, SUBMITTERS, Some(Permission::CreateJob)),
    TransitionRule::new(Submitted, InReview, SYSTEM_ONLY, None),
    TransitionRule::new(Submitted, ApprovedForProcessing, SYSTEM_ONLY, None),
    TransitionRule::new(InReview, ApprovedForProcessing, REVIEWERS, Some(Permission::ApproveJob)),
    TransitionRule::new(InReview, Rejected, REVIEWERS, Some(Permission::ApproveJob)).reason(),
    TransitionRule::new(InReview, Draft, REVIEWERS, Some(Permission::ApproveJob)).reason(),
    TransitionRule::new(
        ApprovedForProcessing,
        Processing,
        PROCESS_STARTERS,
        Some(Permission::ProcessJob),
    ),
    TransitionRule::new(Processing, Delivered, DELIVERERS, Some(Permission::DeliverJob)).outputs(),
    TransitionRule::new(
        Delivered,
        RevisionRequested,
        REVISION_REQUESTERS,
        Some(Permission::RequestRevision),
    )
    .revision_category(),
    TransitionRule::new(Delivered, Completed, COMPLETERS, Some(Permission::CompleteJob)),
    TransitionRule::new(RevisionRequested, Processing, REWORKERS, Some(Permission::ProcessJob)),
    TransitionRule::new(
        RevisionRequested,
        Cancelled,
        ADMIN_CANCELLERS,
        Some(Permission::CancelJob),
    )
    .reason(),
    TransitionRule::new(
        Submitted,
        Cancelled,
        SUBMITTED_CANCELLERS,
        Some(Permission::CancelJob),
    )
    .reason(),
    TransitionRule::new(
        Processing,
        Cancelled,
        ADMIN_CANCELLERS,
        Some(Permission::CancelJob),
    )
    .reason(),
    TransitionRule::new(Rejected, Draft, REOPENERS, Some(Permission::CreateJob)),
];

/// The full transition table.
pub fn rules() -> &'static [TransitionRule] {
    &TRANSITIONS
}

pub fn find_rule(from: JobStatus, to: JobStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|r| r.from == from && r.to == to)
}

/// Where a freshly submitted job is routed by the system.
pub fn submission_route(approval_required: bool) -> JobStatus {
    if approval_required {
        InReview
    } else {
        ApprovedForProcessing
    }
}

fn blank(v: Option<&str>) -> bool {
    v.map(str::trim).is_none_or(str::is_empty)
}

pub fn validate_transition(
    from: JobStatus,
    to: JobStatus,
    actor: TransitionActor,
    metadata: &TransitionMetadata<'_>,
) -> DomainResult<&'static TransitionRule> {
    let Some(rule) = find_rule(from, to) else {
        return Err(DomainError::invalid_transition(format!("cannot move job from {from} to {to}"))
            .with_detail("from", from.as_str())
            .with_detail("to", to.as_str()));
    };

    if !rule.allows(actor) {
        return Err(DomainError::forbidden(format!(
            "{} may not move job from {from} to {to}",
            actor.as_str()
        ))
        .with_detail("role", actor.as_str())
        .with_detail("from", from.as_str())
        .with_detail("to", to.as_str()));
    }

    let missing = if rule.requires_reason && blank(metadata.reason) {
        Some("reason")
    } else if rule.requires_outputs && metadata.output_asset_ids.is_empty() {
        Some("outputAssetIds")
    } else if rule.requires_revision_category && blank(metadata.revision_reason_category) {
        Some("revisionReasonCategory")
    } else {
        None
    };

    if let Some(field) = missing {
        let message = format!("{field} is required to move job from {from} to {to}");
        return Err(DomainError::validation(message)
            .with_detail("field", field)
            .with_detail("from", from.as_str())
            .with_detail("to", to.as_str()));
    }

    Ok(rule)
}
