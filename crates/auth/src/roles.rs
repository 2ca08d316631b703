use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stagecraft_core::DomainError;

/// Human roles recognized by the engine.
///
/// The set is closed: a role string outside these six values is rejected when the
/// actor is resolved, so nothing downstream ever sees an unknown role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    BrokerageAdmin,
    OfficeAdmin,
    TeamLead,
    Agent,
    MediaPartner,
    Reviewer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::BrokerageAdmin,
        Role::OfficeAdmin,
        Role::TeamLead,
        Role::Agent,
        Role::MediaPartner,
        Role::Reviewer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::BrokerageAdmin => "BrokerageAdmin",
            Role::OfficeAdmin => "OfficeAdmin",
            Role::TeamLead => "TeamLead",
            Role::Agent => "Agent",
            Role::MediaPartner => "MediaPartner",
            Role::Reviewer => "Reviewer",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::BrokerageAdmin | Role::OfficeAdmin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                DomainError::validation(format!("unrecognized role '{s}'")).with_detail("role", s)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_core::ErrorCode;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("reviewer".parse::<Role>().unwrap(), Role::Reviewer);
        assert_eq!("BrokerageAdmin".parse::<Role>().unwrap(), Role::BrokerageAdmin);
    }

    #[test]
    fn unknown_role_is_validation_failure() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }
}
