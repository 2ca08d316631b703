use serde::{Deserialize, Serialize};

use stagecraft_core::{BrokerageId, DomainError, DomainResult, OfficeId, TeamId, UserId};

use crate::Role;

/// Identity of the caller, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorContext {
    pub user_id: UserId,
    pub role: Role,
    pub brokerage_id: BrokerageId,
    pub office_id: Option<OfficeId>,
    pub team_id: Option<TeamId>,
    pub request_id: String,
}

/// Raw identity header values, transport-agnostic.
///
/// Empty strings count as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHeaders<'a> {
    pub user_id: Option<&'a str>,
    pub role: Option<&'a str>,
    pub brokerage_id: Option<&'a str>,
    pub office_id: Option<&'a str>,
    pub team_id: Option<&'a str>,
    pub request_id: Option<&'a str>,
}

/// Correlation id from the caller, or a fresh one.
pub fn request_id_or_new(header: Option<&str>) -> String {
    present(header)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::now_v7().to_string())
}

fn present(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

/// Build an [`ActorContext`] from identity headers.
///
/// Missing user id, role or brokerage id is `FORBIDDEN`; an unrecognized role or an
/// unparsable id is `VALIDATION_FAILED`.
pub fn resolve_actor(headers: &IdentityHeaders<'_>) -> DomainResult<ActorContext> {
    let request_id = request_id_or_new(headers.request_id);

    let (Some(user_id), Some(role), Some(brokerage_id)) = (
        present(headers.user_id),
        present(headers.role),
        present(headers.brokerage_id),
    ) else {
        return Err(DomainError::forbidden("missing identity headers")
            .with_detail("required", "x-user-id, x-user-role, x-brokerage-id"));
    };

    let role: Role = role.parse()?;

    Ok(ActorContext {
        user_id: user_id.parse()?,
        role,
        brokerage_id: brokerage_id.parse()?,
        office_id: present(headers.office_id).map(str::parse::<OfficeId>).transpose()?,
        team_id: present(headers.team_id).map(str::parse::<TeamId>).transpose()?,
        request_id,
    })
}
