//! Tenant hierarchy: brokerage → office → team, plus users and their role grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stagecraft_auth::{Role, ScopeTarget};
use stagecraft_core::{
    BrokerageId, DomainError, DomainResult, Entity, MembershipId, OfficeId, TeamId, UserId,
};

/// Trimmed, non-empty text or `VALIDATION_FAILED` naming the field.
pub fn required_text(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(
            DomainError::validation(format!("{field} is required")).with_detail("field", field)
        );
    }
    Ok(trimmed.to_string())
}

/// Trimmed text, `None` when blank.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brokerage {
    pub id: BrokerageId,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Brokerage {
    pub fn new(name: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: BrokerageId::new(),
            name: required_text("name", name)?,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Entity for Brokerage {
    type Id = BrokerageId;
    const KIND: &'static str = "brokerage";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Office {
    pub id: OfficeId,
    pub brokerage_id: BrokerageId,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Office {
    pub fn new(brokerage_id: BrokerageId, name: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: OfficeId::new(),
            brokerage_id,
            name: required_text("name", name)?,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn scope(&self) -> ScopeTarget {
        ScopeTarget::office(self.brokerage_id, self.id)
    }
}

impl Entity for Office {
    type Id = OfficeId;
    const KIND: &'static str = "office";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub brokerage_id: BrokerageId,
    pub office_id: OfficeId,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn new(office: &Office, name: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        if !office.active {
            return Err(DomainError::validation("office is inactive")
                .with_detail("officeId", office.id.to_string()));
        }
        Ok(Self {
            id: TeamId::new(),
            brokerage_id: office.brokerage_id,
            office_id: office.id,
            name: required_text("name", name)?,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn scope(&self) -> ScopeTarget {
        ScopeTarget {
            brokerage_id: self.brokerage_id,
            office_id: Some(self.office_id),
            team_id: Some(self.id),
        }
    }
}

impl Entity for Team {
    type Id = TeamId;
    const KIND: &'static str = "team";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub brokerage_id: BrokerageId,
    /// Always lower-cased.
    pub email: String,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        brokerage_id: BrokerageId,
        email: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: UserId::new(),
            brokerage_id,
            email: normalize_email(email)?,
            name: required_text("name", name)?,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Entity for User {
    type Id = UserId;
    const KIND: &'static str = "user";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

pub fn normalize_email(email: &str) -> DomainResult<String> {
    let email = required_text("email", email)?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(DomainError::validation("email is malformed").with_detail("field", "email")),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipScope {
    Brokerage,
    Office,
    Team,
}

/// A role granted to a user at a brokerage, office or team scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub role: Role,
    pub scope: MembershipScope,
    pub brokerage_id: BrokerageId,
    pub office_id: Option<OfficeId>,
    pub team_id: Option<TeamId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// Office scope needs `office_id`; team scope needs both `office_id` and
    /// `team_id`. Ids the scope does not use are dropped.
    pub fn new(
        user: &User,
        role: Role,
        scope: MembershipScope,
        office_id: Option<OfficeId>,
        team_id: Option<TeamId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let (office_id, team_id) = match scope {
            MembershipScope::Brokerage => (None, None),
            MembershipScope::Office => (Some(office_id.ok_or_else(|| missing("officeId"))?), None),
            MembershipScope::Team => (
                Some(office_id.ok_or_else(|| missing("officeId"))?),
                Some(team_id.ok_or_else(|| missing("teamId"))?),
            ),
        };

        Ok(Self {
            id: MembershipId::new(),
            user_id: user.id,
            role,
            scope,
            brokerage_id: user.brokerage_id,
            office_id,
            team_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn scope_target(&self) -> ScopeTarget {
        ScopeTarget {
            brokerage_id: self.brokerage_id,
            office_id: self.office_id,
            team_id: self.team_id,
        }
    }
}

fn missing(field: &str) -> DomainError {
    DomainError::validation(format!("{field} is required for this membership scope"))
        .with_detail("field", field)
}

impl Entity for Membership {
    type Id = MembershipId;
    const KIND: &'static str = "membership";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_core::ErrorCode;

    #[test]
    fn email_is_lower_cased() {
        let user =
            User::new(BrokerageId::new(), "  Jane.Doe@Example.COM ", "Jane", Utc::now()).unwrap();
        assert_eq!(user.email, "jane.doe@example.com");
    }

    #[test]
    fn malformed_email_is_rejected() {
        let err = User::new(BrokerageId::new(), "jane", "Jane", Utc::now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn team_inherits_office_brokerage() {
        let office = Office::new(BrokerageId::new(), "Downtown", Utc::now()).unwrap();
        let team = Team::new(&office, "Luxury", Utc::now()).unwrap();
        assert_eq!(team.brokerage_id, office.brokerage_id);
        assert_eq!(team.scope().office_id, Some(office.id));
    }

    #[test]
    fn membership_scope_requires_ids() {
        let user = User::new(BrokerageId::new(), "a@b.co", "A", Utc::now()).unwrap();
        let err = Membership::new(
            &user,
            Role::Agent,
            MembershipScope::Team,
            Some(OfficeId::new()),
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.details["field"], "teamId");

        let m = Membership::new(
            &user,
            Role::BrokerageAdmin,
            MembershipScope::Brokerage,
            Some(OfficeId::new()),
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(m.office_id, None);
        assert_eq!(m.brokerage_id, user.brokerage_id);
    }
}
