//! Roles and principal kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an authenticated principal.
///
/// The closed set covers both backing collections: `candidate`, `admin` and
/// `guest` live in the users collection, `employer` is implied by the
/// employers collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Candidate,
    Employer,
    Admin,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Employer => "employer",
            Role::Admin => "admin",
            Role::Guest => "guest",
        }
    }

    /// Parse from a stored string, falling back to `Guest` for anything
    /// unrecognized so legacy records never escalate privileges.
    pub fn from_str_or_guest(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "candidate" => Role::Candidate,
            "employer" => Role::Employer,
            "admin" => Role::Admin,
            _ => Role::Guest,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which collection backs a principal.
///
/// Carried in the session token so the verifier knows where to re-fetch the
/// live record from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    Employer,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Employer => "employer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(PrincipalKind::User),
            "employer" => Some(PrincipalKind::Employer),
            _ => None,
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Candidate, Role::Employer, Role::Admin, Role::Guest] {
            assert_eq!(Role::from_str_or_guest(role.as_str()), role);
        }
    }

    #[test]
    fn test_unknown_role_falls_back_to_guest() {
        assert_eq!(Role::from_str_or_guest("superuser"), Role::Guest);
        assert_eq!(Role::from_str_or_guest(""), Role::Guest);
    }

    #[test]
    fn test_legacy_uppercase_roles_parse() {
        assert_eq!(Role::from_str_or_guest("CANDIDATE"), Role::Candidate);
        assert_eq!(Role::from_str_or_guest("Admin"), Role::Admin);
    }

    #[test]
    fn test_principal_kind_parse() {
        assert_eq!(PrincipalKind::parse("user"), Some(PrincipalKind::User));
        assert_eq!(PrincipalKind::parse("employer"), Some(PrincipalKind::Employer));
        assert_eq!(PrincipalKind::parse("admin"), None);
    }
}
