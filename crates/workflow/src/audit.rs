//! Append-only audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stagecraft_auth::{ActorContext, Role, ScopeTarget};
use stagecraft_core::{AuditEventId, BrokerageId, DomainError, Entity, OfficeId, TeamId, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    BootstrapCompleted,
    BrokerageUpdated,
    OfficeCreated,
    OfficeUpdated,
    TeamCreated,
    UserCreated,
    UserUpdated,
    MembershipCreated,
    PresetCreated,
    PresetUpdated,
    JobCreated,
    JobStatusChanged,
    JobApprovalDecision,
    JobDeliveryCreated,
    JobRevisionRequested,
    ReportExported,
}

impl core::str::FromStr for AuditEventType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(JsonValue::String(s.trim().to_ascii_uppercase())).map_err(|_| {
            DomainError::validation(format!("unknown audit event type '{s}'"))
                .with_detail("eventType", s)
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntityType {
    Brokerage,
    Office,
    Team,
    User,
    Membership,
    Preset,
    Job,
    JobApproval,
    JobDelivery,
    JobRevision,
    Report,
}

/// Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub event_type: AuditEventType,
    pub actor_user_id: UserId,
    pub actor_role: Role,
    pub brokerage_id: BrokerageId,
    pub office_id: Option<OfficeId>,
    pub team_id: Option<TeamId>,
    pub entity_type: AuditEntityType,
    pub entity_id: String,
    pub before_snapshot: Option<JsonValue>,
    pub after_snapshot: Option<JsonValue>,
    pub reason: Option<String>,
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
}

impl AuditEvent {
    /// Event attributed to `actor`, scoped to the actor's own tenant coordinates
    /// until [`AuditEvent::scoped`] narrows it to the target's.
    pub fn new(
        actor: &ActorContext,
        event_type: AuditEventType,
        entity_type: AuditEntityType,
        entity_id: impl ToString,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEventId::new(),
            event_type,
            actor_user_id: actor.user_id,
            actor_role: actor.role,
            brokerage_id: actor.brokerage_id,
            office_id: actor.office_id,
            team_id: actor.team_id,
            entity_type,
            entity_id: entity_id.to_string(),
            before_snapshot: None,
            after_snapshot: None,
            reason: None,
            note: None,
            timestamp: now,
            request_id: actor.request_id.clone(),
        }
    }

    pub fn scoped(mut self, target: ScopeTarget) -> Self {
        self.brokerage_id = target.brokerage_id;
        self.office_id = target.office_id;
        self.team_id = target.team_id;
        self
    }

    pub fn before<T: Serialize>(mut self, snapshot: &T) -> Self {
        self.before_snapshot = serde_json::to_value(snapshot).ok();
        self
    }

    pub fn after<T: Serialize>(mut self, snapshot: &T) -> Self {
        self.after_snapshot = serde_json::to_value(snapshot).ok();
        self
    }

    pub fn reason(mut self, reason: Option<&str>) -> Self {
        self.reason = reason.map(str::trim).filter(|r| !r.is_empty()).map(str::to_string);
        self
    }

    pub fn note(mut self, note: Option<&str>) -> Self {
        self.note = note.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
        self
    }
}

impl Entity for AuditEvent {
    type Id = AuditEventId;
    const KIND: &'static str = "audit";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
