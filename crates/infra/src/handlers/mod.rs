//! Request handlers: one async operation per workflow action.
//!
//! Each operation takes an already-resolved [`ActorContext`], checks permission
//! and tenant scope, loads what it needs from the [`EntityStore`], applies the
//! mutation, persists it and appends audit events. Transport concerns (headers,
//! envelopes, status codes) live in the api crate.

use chrono::{DateTime, Utc};

use stagecraft_auth::{ActorContext, Permission, ScopeTarget, assert_tenant_scope, has_permission};
use stagecraft_core::DomainResult;
use stagecraft_workflow::AuditEvent;

use crate::config::AppConfig;
use crate::store::EntityStore;

mod jobs;
mod org;
mod presets;
mod reports;

pub use jobs::{
    ApprovalInput, ApprovalResult, CreateJobInput, CreatedJob, DeliveryInput, DeliveryResult,
    JobDetail, RevisionInput, RevisionResult, TransitionInput,
};
pub use org::{
    BootstrapInput, BootstrapResult, BrokeragePatch, MembershipInput, OfficeInput, OfficePatch,
    TeamInput, UserInput, UserPatch,
};
pub use reports::{AuditQuery, CsvExport, ReportData, ReportOutput};

#[derive(Debug, Clone)]
struct BootstrapSettings {
    secret: Option<String>,
    allowed: bool,
}

#[derive(Debug, Clone)]
pub struct WorkflowHandlers {
    store: EntityStore,
    bootstrap: BootstrapSettings,
}

impl WorkflowHandlers {
    pub fn new(store: EntityStore, config: &AppConfig) -> Self {
        Self {
            store,
            bootstrap: BootstrapSettings {
                secret: config.bootstrap_secret.clone(),
                allowed: config.bootstrap_allowed(),
            },
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    async fn audit(&self, event: AuditEvent) -> DomainResult<()> {
        self.store.append_audit(&event).await
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

fn in_scope(actor: &ActorContext, target: &ScopeTarget) -> bool {
    assert_tenant_scope(actor, target).is_ok()
}

fn can(actor: &ActorContext, permission: Permission) -> bool {
    has_permission(actor.role, permission)
}

#[cfg(test)]
mod test_support;
