//! Tenant hierarchy management: bootstrap, brokerage, offices, teams, users and
//! memberships.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use stagecraft_auth::{
    ActorContext, Permission, Role, ScopeTarget, assert_any_permission, assert_permission,
    assert_tenant_scope,
};
use stagecraft_core::{DomainError, DomainResult, OfficeId, TeamId, UserId};
use stagecraft_workflow::org::{normalize_email, required_text};
use stagecraft_workflow::{
    AuditEntityType, AuditEvent, AuditEventType, Brokerage, Membership, MembershipScope, Office,
    Team, User,
};

use super::{WorkflowHandlers, in_scope, now};
use crate::store::keys;

const BOOTSTRAP_LOCK_TTL: Duration = Duration::from_secs(30);
const USER_MANAGERS: &[Permission] = &[
    Permission::ManageOfficeUsers,
    Permission::ManageBrokerageUsers,
];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapInput {
    pub brokerage_name: String,
    pub office_name: String,
    pub admin_email: String,
    pub admin_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapResult {
    pub brokerage: Brokerage,
    pub office: Office,
    pub admin: User,
    pub membership: Membership,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokeragePatch {
    pub name: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeInput {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficePatch {
    pub name: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInput {
    pub office_id: OfficeId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipInput {
    pub user_id: UserId,
    pub role: Role,
    pub scope: MembershipScope,
    #[serde(default)]
    pub office_id: Option<OfficeId>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
}

impl WorkflowHandlers {
    /// Create a brokerage with its first office and admin.
    /// `secret` is the caller-supplied bootstrap secret.
    pub async fn bootstrap(
        &self,
        input: BootstrapInput,
        secret: Option<&str>,
        request_id: String,
    ) -> DomainResult<BootstrapResult> {
        let configured = self.bootstrap.secret.as_deref();
        let Some(expected) = configured.filter(|_| self.bootstrap.allowed) else {
            return Err(DomainError::forbidden("bootstrap is disabled"));
        };
        let supplied = secret.unwrap_or_default();
        if !bool::from(supplied.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(DomainError::forbidden("invalid bootstrap secret"));
        }

        let at = now();
        let brokerage = Brokerage::new(&input.brokerage_name, at)?;
        let office = Office::new(brokerage.id, &input.office_name, at)?;
        let admin = User::new(brokerage.id, &input.admin_email, &input.admin_name, at)?;
        let membership = Membership::new(
            &admin,
            Role::BrokerageAdmin,
            MembershipScope::Brokerage,
            None,
            None,
            at,
        )?;

        let kv = self.store.kv();
        let holders = kv.increment(keys::BOOTSTRAP_LOCK, 1).await?;
        // Every contender refreshes the TTL, so the lock lapses even when the
        // holder's own `expire` failed.
        kv.expire(keys::BOOTSTRAP_LOCK, BOOTSTRAP_LOCK_TTL).await?;
        if holders > 1 {
            return Err(DomainError::conflict("bootstrap already in progress"));
        }

        self.store.put(&brokerage).await?;
        self.store.insert(&office, &[keys::brokerage_offices(brokerage.id)]).await?;
        self.store.insert(&admin, &[keys::brokerage_users(brokerage.id)]).await?;
        kv.set(&keys::user_email(brokerage.id, &admin.email), admin.id.to_string(), None)
            .await?;
        self.store.insert(&membership, &[keys::user_memberships(admin.id)]).await?;

        let actor = ActorContext {
            user_id: admin.id,
            role: Role::BrokerageAdmin,
            brokerage_id: brokerage.id,
            office_id: None,
            team_id: None,
            request_id,
        };
        self.audit(
            AuditEvent::new(
                &actor,
                AuditEventType::BootstrapCompleted,
                AuditEntityType::Brokerage,
                brokerage.id,
                at,
            )
            .after(&brokerage),
        )
        .await?;

        tracing::info!(
            brokerage_id = %brokerage.id,
            request_id = %actor.request_id,
            "bootstrap completed"
        );
        Ok(BootstrapResult {
            brokerage,
            office,
            admin,
            membership,
        })
    }

    pub async fn get_brokerage(&self, actor: &ActorContext) -> DomainResult<Brokerage> {
        self.store.require(&actor.brokerage_id).await
    }

    pub async fn update_brokerage(
        &self,
        actor: &ActorContext,
        patch: BrokeragePatch,
    ) -> DomainResult<Brokerage> {
        assert_permission(actor.role, Permission::ManageBrokerageOrg)?;
        let mut brokerage: Brokerage = self.store.require(&actor.brokerage_id).await?;
        let before = brokerage.clone();

        if let Some(name) = patch.name {
            brokerage.name = required_text("name", &name)?;
        }
        if let Some(active) = patch.active {
            brokerage.active = active;
        }
        brokerage.updated_at = now();
        self.store.put(&brokerage).await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::BrokerageUpdated,
                AuditEntityType::Brokerage,
                brokerage.id,
                brokerage.updated_at,
            )
            .scoped(ScopeTarget::brokerage(brokerage.id))
            .before(&before)
            .after(&brokerage),
        )
        .await?;
        Ok(brokerage)
    }

    pub async fn create_office(
        &self,
        actor: &ActorContext,
        input: OfficeInput,
    ) -> DomainResult<Office> {
        assert_permission(actor.role, Permission::ManageBrokerageOrg)?;
        let office = Office::new(actor.brokerage_id, &input.name, now())?;
        self.store
            .insert(&office, &[keys::brokerage_offices(office.brokerage_id)])
            .await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::OfficeCreated,
                AuditEntityType::Office,
                office.id,
                office.created_at,
            )
            .scoped(office.scope())
            .after(&office),
        )
        .await?;
        Ok(office)
    }

    pub async fn list_offices(&self, actor: &ActorContext) -> DomainResult<Vec<Office>> {
        self.store.load_index(&keys::brokerage_offices(actor.brokerage_id)).await
    }

    pub async fn update_office(
        &self,
        actor: &ActorContext,
        office_id: OfficeId,
        patch: OfficePatch,
    ) -> DomainResult<Office> {
        assert_permission(actor.role, Permission::ManageBrokerageOrg)?;
        let mut office: Office = self.store.require(&office_id).await?;
        assert_tenant_scope(actor, &office.scope())?;
        let before = office.clone();

        if let Some(name) = patch.name {
            office.name = required_text("name", &name)?;
        }
        if let Some(active) = patch.active {
            office.active = active;
        }
        office.updated_at = now();
        self.store.put(&office).await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::OfficeUpdated,
                AuditEntityType::Office,
                office.id,
                office.updated_at,
            )
            .scoped(office.scope())
            .before(&before)
            .after(&office),
        )
        .await?;
        Ok(office)
    }

    pub async fn create_team(&self, actor: &ActorContext, input: TeamInput) -> DomainResult<Team> {
        assert_permission(actor.role, Permission::ManageOfficeUsers)?;
        let office: Office = self.store.require(&input.office_id).await?;
        assert_tenant_scope(actor, &office.scope())?;

        let team = Team::new(&office, &input.name, now())?;
        self.store
            .insert(
                &team,
                &[keys::office_teams(office.id), keys::brokerage_teams(office.brokerage_id)],
            )
            .await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::TeamCreated,
                AuditEntityType::Team,
                team.id,
                team.created_at,
            )
            .scoped(team.scope())
            .after(&team),
        )
        .await?;
        Ok(team)
    }

    /// Teams of one office, or every team in scope when `office_id` is absent.
    pub async fn list_teams(
        &self,
        actor: &ActorContext,
        office_id: Option<OfficeId>,
    ) -> DomainResult<Vec<Team>> {
        assert_permission(actor.role, Permission::ManageOfficeUsers)?;
        let teams: Vec<Team> = match office_id {
            Some(id) => {
                let office: Office = self.store.require(&id).await?;
                assert_tenant_scope(actor, &office.scope())?;
                self.store.load_index(&keys::office_teams(id)).await?
            }
            None => self.store.load_index(&keys::brokerage_teams(actor.brokerage_id)).await?,
        };
        Ok(teams.into_iter().filter(|t| in_scope(actor, &t.scope())).collect())
    }

    /// Another user of the same brokerage already holding `email`.
    async fn email_taken(&self, user: &User, email: &str) -> DomainResult<bool> {
        let key = keys::user_email(user.brokerage_id, email);
        let Some(holder) = self.store.kv().get(&key).await? else {
            return Ok(false);
        };
        if holder == user.id.to_string() {
            return Ok(false);
        }
        // A stale mapping left by an email change does not count.
        let Ok(holder_id) = holder.parse::<UserId>() else {
            return Ok(false);
        };
        Ok(self
            .store
            .get::<User>(&holder_id)
            .await?
            .is_some_and(|u| u.email == email))
    }

    pub async fn create_user(&self, actor: &ActorContext, input: UserInput) -> DomainResult<User> {
        assert_any_permission(actor.role, USER_MANAGERS)?;
        let user = User::new(actor.brokerage_id, &input.email, &input.name, now())?;
        if self.email_taken(&user, &user.email).await? {
            return Err(DomainError::conflict("email already in use")
                .with_detail("field", "email"));
        }

        self.store.insert(&user, &[keys::brokerage_users(user.brokerage_id)]).await?;
        self.store
            .kv()
            .set(&keys::user_email(user.brokerage_id, &user.email), user.id.to_string(), None)
            .await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::UserCreated,
                AuditEntityType::User,
                user.id,
                user.created_at,
            )
            .scoped(ScopeTarget::brokerage(user.brokerage_id))
            .after(&user),
        )
        .await?;
        Ok(user)
    }

    pub async fn list_users(&self, actor: &ActorContext) -> DomainResult<Vec<User>> {
        assert_any_permission(actor.role, USER_MANAGERS)?;
        self.store.load_index(&keys::brokerage_users(actor.brokerage_id)).await
    }

    pub async fn update_user(
        &self,
        actor: &ActorContext,
        user_id: UserId,
        patch: UserPatch,
    ) -> DomainResult<User> {
        assert_any_permission(actor.role, USER_MANAGERS)?;
        let mut user: User = self.store.require(&user_id).await?;
        assert_tenant_scope(actor, &ScopeTarget::brokerage(user.brokerage_id))?;
        let before = user.clone();

        let email = patch.email.as_deref().map(normalize_email).transpose()?;
        let name = patch.name.as_deref().map(|n| required_text("name", n)).transpose()?;
        if let Some(email) = &email {
            if self.email_taken(&user, email).await? {
                return Err(
                    DomainError::conflict("email already in use").with_detail("field", "email")
                );
            }
        }

        if let Some(email) = email {
            self.store
                .kv()
                .set(&keys::user_email(user.brokerage_id, &email), user.id.to_string(), None)
                .await?;
            user.email = email;
        }
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(active) = patch.active {
            user.active = active;
        }
        user.updated_at = now();
        self.store.put(&user).await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::UserUpdated,
                AuditEntityType::User,
                user.id,
                user.updated_at,
            )
            .scoped(ScopeTarget::brokerage(user.brokerage_id))
            .before(&before)
            .after(&user),
        )
        .await?;
        Ok(user)
    }

    pub async fn create_membership(
        &self,
        actor: &ActorContext,
        input: MembershipInput,
    ) -> DomainResult<Membership> {
        assert_any_permission(actor.role, USER_MANAGERS)?;
        if (input.role == Role::BrokerageAdmin || input.scope == MembershipScope::Brokerage)
            && actor.role != Role::BrokerageAdmin
        {
            return Err(DomainError::forbidden(
                "only a BrokerageAdmin may grant brokerage-wide roles",
            )
            .with_detail("role", actor.role.as_str())
            .with_detail("grantedRole", input.role.as_str()));
        }

        let user: User = self.store.require(&input.user_id).await?;
        assert_tenant_scope(actor, &ScopeTarget::brokerage(user.brokerage_id))?;

        if let Some(office_id) = input.office_id {
            let office = self.store.get::<Office>(&office_id).await?;
            match office {
                Some(o) if o.brokerage_id == user.brokerage_id => {
                    assert_tenant_scope(actor, &o.scope())?
                }
                _ => {
                    return Err(DomainError::validation("office does not belong to this brokerage")
                        .with_detail("officeId", office_id.to_string()));
                }
            }
        }
        if let Some(team_id) = input.team_id {
            let team = self.store.get::<Team>(&team_id).await?;
            if !team.is_some_and(|t| Some(t.office_id) == input.office_id) {
                return Err(DomainError::validation("team does not belong to the office")
                    .with_detail("teamId", team_id.to_string()));
            }
        }

        let membership = Membership::new(
            &user,
            input.role,
            input.scope,
            input.office_id,
            input.team_id,
            now(),
        )?;
        self.store
            .insert(&membership, &[keys::user_memberships(user.id)])
            .await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::MembershipCreated,
                AuditEntityType::Membership,
                membership.id,
                membership.created_at,
            )
            .scoped(membership.scope_target())
            .after(&membership),
        )
        .await?;
        Ok(membership)
    }

    pub async fn list_memberships(
        &self,
        actor: &ActorContext,
        user_id: UserId,
    ) -> DomainResult<Vec<Membership>> {
        assert_any_permission(actor.role, USER_MANAGERS)?;
        let user: User = self.store.require(&user_id).await?;
        assert_tenant_scope(actor, &ScopeTarget::brokerage(user.brokerage_id))?;
        self.store.load_index(&keys::user_memberships(user.id)).await
    }
}
