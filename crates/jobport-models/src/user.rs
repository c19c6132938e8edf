//! User account models (candidates, admins, guests).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::role::Role;

/// Unique identifier for a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A user account stored in the users collection.
///
/// The password hash never leaves the backend; response projections are
/// built by the API layer from the public fields only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,

    pub name: String,

    /// Lowercased, unique across the collection.
    pub email: String,

    pub phone: String,

    /// Argon2 PHC string.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    #[serde(default)]
    pub role: Role,

    /// Object-storage key of the profile picture, if uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_key: Option<String>,

    /// Object-storage key of the default resume, if uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub professional_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default)]
    pub skills: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Suspension flag; suspended accounts cannot authenticate.
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Outstanding password-reset token, if any.
    #[serde(skip_serializing, skip_deserializing)]
    pub reset_token: Option<String>,

    #[serde(skip_serializing, skip_deserializing)]
    pub reset_token_expires: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl UserAccount {
    /// Create a fresh account with the given credentials and role.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into().to_lowercase(),
            phone: phone.into(),
            password_hash: password_hash.into(),
            role,
            avatar_key: None,
            resume_key: None,
            professional_title: None,
            location: None,
            skills: Vec::new(),
            summary: None,
            is_active: true,
            reset_token: None,
            reset_token_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the stored reset token matches and has not expired.
    pub fn reset_token_valid(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.reset_token, self.reset_token_expires) {
            (Some(stored), Some(expires)) => stored == token && now < expires,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_generation() {
        let id1 = UserId::new();
        let id2 = UserId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_account_defaults() {
        let account = UserAccount::new("Ada", "Ada@Example.com", "555-0100", "$argon2id$x", Role::Candidate);
        assert_eq!(account.email, "ada@example.com");
        assert!(account.is_active);
        assert!(account.avatar_key.is_none());
        assert_eq!(account.role, Role::Candidate);
    }

    #[test]
    fn test_reset_token_validity() {
        let mut account =
            UserAccount::new("Ada", "ada@example.com", "555-0100", "$argon2id$x", Role::Candidate);
        let now = Utc::now();

        assert!(!account.reset_token_valid("tok", now));

        account.reset_token = Some("tok".to_string());
        account.reset_token_expires = Some(now + chrono::Duration::hours(1));
        assert!(account.reset_token_valid("tok", now));
        assert!(!account.reset_token_valid("other", now));
        assert!(!account.reset_token_valid("tok", now + chrono::Duration::hours(2)));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let account =
            UserAccount::new("Ada", "ada@example.com", "555-0100", "$argon2id$secret", Role::Candidate);
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }
}
