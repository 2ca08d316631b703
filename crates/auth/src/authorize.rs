//! Role-based permission checks and the tenant scope guard.
//!
//! - No IO
//! - No panics
//! - No business logic (pure policy checks)

use stagecraft_core::{BrokerageId, DomainError, DomainResult, OfficeId, TeamId};

use crate::{ActorContext, Permission, Role};

use Permission::*;

const BROKERAGE_ADMIN: &[Permission] = &[
    CreateJob,
    ApproveJob,
    ProcessJob,
    DeliverJob,
    RequestRevision,
    CompleteJob,
    CancelJob,
    ExportReport,
    ViewAudit,
    ManageOfficeUsers,
    ManageOfficePresets,
    ManageBrokeragePresets,
    ManageBrokerageUsers,
    ManageBrokerageOrg,
    ViewJobOwn,
    ViewJobOffice,
];

const OFFICE_ADMIN: &[Permission] = &[
    CreateJob,
    ApproveJob,
    ProcessJob,
    DeliverJob,
    RequestRevision,
    CompleteJob,
    CancelJob,
    ExportReport,
    ViewAudit,
    ManageOfficeUsers,
    ManageOfficePresets,
    ViewJobOwn,
    ViewJobOffice,
];

const TEAM_LEAD: &[Permission] = &[
    CreateJob,
    ApproveJob,
    RequestRevision,
    CompleteJob,
    ViewJobOwn,
    ViewJobOffice,
];

const AGENT: &[Permission] = &[CreateJob, RequestRevision, CompleteJob, CancelJob, ViewJobOwn];

const MEDIA_PARTNER: &[Permission] = &[ProcessJob, DeliverJob, ViewJobOffice];

const REVIEWER: &[Permission] = &[ApproveJob, ProcessJob, DeliverJob, ViewJobOffice];

/// The complete, hard-coded permission set of a role.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::BrokerageAdmin => BROKERAGE_ADMIN,
        Role::OfficeAdmin => OFFICE_ADMIN,
        Role::TeamLead => TEAM_LEAD,
        Role::Agent => AGENT,
        Role::MediaPartner => MEDIA_PARTNER,
        Role::Reviewer => REVIEWER,
    }
}

pub fn has_permission(role: Role, permission: Permission) -> bool {
    role_permissions(role).contains(&permission)
}

pub fn assert_permission(role: Role, permission: Permission) -> DomainResult<()> {
    if has_permission(role, permission) {
        Ok(())
    } else {
        Err(
            DomainError::forbidden(format!("role '{role}' lacks permission '{permission}'"))
                .with_detail("role", role.as_str())
                .with_detail("permission", permission.as_str()),
        )
    }
}

/// Passes when the role holds at least one of `permissions`.
pub fn assert_any_permission(role: Role, permissions: &[Permission]) -> DomainResult<()> {
    if permissions.iter().any(|p| has_permission(role, *p)) {
        return Ok(());
    }
    let wanted: Vec<&str> = permissions.iter().map(|p| p.as_str()).collect();
    Err(
        DomainError::forbidden(format!("role '{role}' lacks any of {wanted:?}"))
            .with_detail("role", role.as_str())
            .with_detail("permission", wanted.join("|")),
    )
}

/// Tenant coordinates of the entity being read or written.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScopeTarget {
    pub brokerage_id: BrokerageId,
    pub office_id: Option<OfficeId>,
    pub team_id: Option<TeamId>,
}

impl ScopeTarget {
    pub fn brokerage(brokerage_id: BrokerageId) -> Self {
        Self {
            brokerage_id,
            office_id: None,
            team_id: None,
        }
    }

    pub fn office(brokerage_id: BrokerageId, office_id: OfficeId) -> Self {
        Self {
            brokerage_id,
            office_id: Some(office_id),
            team_id: None,
        }
    }
}

/// Enforce the brokerage/office/team boundary.
///
/// Office and team comparisons only happen when both sides carry the id; when
/// either side omits it, that level passes.
pub fn assert_tenant_scope(actor: &ActorContext, target: &ScopeTarget) -> DomainResult<()> {
    if actor.brokerage_id != target.brokerage_id {
        return Err(DomainError::tenant_scope("target belongs to another brokerage")
            .with_detail("actorBrokerageId", actor.brokerage_id.to_string())
            .with_detail("targetBrokerageId", target.brokerage_id.to_string()));
    }

    match actor.role {
        Role::BrokerageAdmin => Ok(()),
        Role::OfficeAdmin | Role::Reviewer | Role::MediaPartner => {
            match (actor.office_id, target.office_id) {
                (Some(mine), Some(theirs)) if mine != theirs => {
                    Err(DomainError::tenant_scope("target belongs to another office")
                        .with_detail("role", actor.role.as_str())
                        .with_detail("actorOfficeId", mine.to_string())
                        .with_detail("targetOfficeId", theirs.to_string()))
                }
                _ => Ok(()),
            }
        }
        Role::TeamLead | Role::Agent => match (actor.team_id, target.team_id) {
            (Some(mine), Some(theirs)) if mine != theirs => {
                Err(DomainError::tenant_scope("target belongs to another team")
                    .with_detail("role", actor.role.as_str())
                    .with_detail("actorTeamId", mine.to_string())
                    .with_detail("targetTeamId", theirs.to_string()))
            }
            _ => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stagecraft_core::{ErrorCode, UserId};

    fn actor(
        role: Role,
        brokerage_id: BrokerageId,
        office: Option<OfficeId>,
        team: Option<TeamId>,
    ) -> ActorContext {
        ActorContext {
            user_id: UserId::new(),
            role,
            brokerage_id,
            office_id: office,
            team_id: team,
            request_id: "req-test".to_string(),
        }
    }

    #[test]
    fn office_admin_differs_from_brokerage_admin_only_in_brokerage_management() {
        let brokerage: Vec<_> = role_permissions(Role::BrokerageAdmin).to_vec();
        let office: Vec<_> = role_permissions(Role::OfficeAdmin).to_vec();
        let missing: Vec<_> = brokerage.iter().filter(|p| !office.contains(p)).copied().collect();
        assert_eq!(
            missing,
            vec![ManageBrokeragePresets, ManageBrokerageUsers, ManageBrokerageOrg]
        );
        assert!(office.iter().all(|p| brokerage.contains(p)));
    }

    #[test]
    fn missing_permission_reports_role_and_permission() {
        let err = assert_permission(Role::Agent, ApproveJob).unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(err.details["role"], "Agent");
        assert_eq!(err.details["permission"], "approve:job");
        assert!(assert_permission(Role::Reviewer, ApproveJob).is_ok());
    }

    #[test]
    fn any_permission_passes_on_single_match() {
        assert!(assert_any_permission(Role::Agent, &[ViewJobOffice, ViewJobOwn]).is_ok());
        assert!(assert_any_permission(Role::MediaPartner, &[ViewAudit, ExportReport]).is_err());
    }

    #[test]
    fn brokerage_admin_bypasses_office_and_team() {
        let b = BrokerageId::new();
        let a = actor(Role::BrokerageAdmin, b, Some(OfficeId::new()), Some(TeamId::new()));
        let target = ScopeTarget {
            brokerage_id: b,
            office_id: Some(OfficeId::new()),
            team_id: Some(TeamId::new()),
        };
        assert!(assert_tenant_scope(&a, &target).is_ok());
    }

    #[test]
    fn office_roles_are_fenced_to_their_office() {
        let b = BrokerageId::new();
        for role in [Role::OfficeAdmin, Role::Reviewer, Role::MediaPartner] {
            let a = actor(role, b, Some(OfficeId::new()), None);
            let err =
                assert_tenant_scope(&a, &ScopeTarget::office(b, OfficeId::new())).unwrap_err();
            assert_eq!(err.code, ErrorCode::TenantScopeViolation);
        }
    }

    #[test]
    fn team_roles_are_fenced_to_their_team() {
        let b = BrokerageId::new();
        let a = actor(Role::Agent, b, Some(OfficeId::new()), Some(TeamId::new()));
        let target = ScopeTarget {
            brokerage_id: b,
            office_id: Some(OfficeId::new()),
            team_id: Some(TeamId::new()),
        };
        let err = assert_tenant_scope(&a, &target).unwrap_err();
        assert_eq!(err.code, ErrorCode::TenantScopeViolation);
    }

    #[test]
    fn missing_ids_on_either_side_pass() {
        let b = BrokerageId::new();
        let no_office = actor(Role::OfficeAdmin, b, None, None);
        assert!(assert_tenant_scope(&no_office, &ScopeTarget::office(b, OfficeId::new())).is_ok());

        let with_office = actor(Role::Reviewer, b, Some(OfficeId::new()), None);
        assert!(assert_tenant_scope(&with_office, &ScopeTarget::brokerage(b)).is_ok());

        // Team roles never compare offices.
        let agent = actor(Role::Agent, b, Some(OfficeId::new()), None);
        assert!(assert_tenant_scope(&agent, &ScopeTarget::office(b, OfficeId::new())).is_ok());
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: no role ever crosses a brokerage boundary.
        #[test]
        fn cross_brokerage_access_is_never_permitted(
            role in any_role(),
            share_office in any::<bool>(),
            share_team in any::<bool>(),
        ) {
            let office = OfficeId::new();
            let team = TeamId::new();
            let a = actor(role, BrokerageId::new(), Some(office), Some(team));
            let target = ScopeTarget {
                brokerage_id: BrokerageId::new(),
                office_id: if share_office { Some(office) } else { Some(OfficeId::new()) },
                team_id: if share_team { Some(team) } else { None },
            };
            let err = assert_tenant_scope(&a, &target).unwrap_err();
            prop_assert_eq!(err.code, ErrorCode::TenantScopeViolation);
        }
    }
}
