//! Employer profile models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an employer account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployerId(pub String);

impl EmployerId {
    /// Generate a new random employer ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EmployerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EmployerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EmployerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EmployerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An employer account stored in the employers collection.
///
/// Employers are standalone principals with their own credentials; their
/// role is always `employer`. Only verified employers may post jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployerProfile {
    pub id: EmployerId,

    pub company_name: String,

    /// Lowercased, unique across the collection.
    pub email: String,

    /// Argon2 PHC string.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub contact_phone: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_size: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Object-storage key of the company logo, if uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_key: Option<String>,

    /// Set by an admin; gates job posting.
    #[serde(default)]
    pub is_verified: bool,

    /// Suspension flag; suspended accounts cannot authenticate.
    #[serde(default = "default_true")]
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl EmployerProfile {
    /// Create a fresh, unverified employer account.
    pub fn new(
        company_name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        contact_phone: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EmployerId::new(),
            company_name: company_name.into(),
            email: email.into().to_lowercase(),
            password_hash: password_hash.into(),
            contact_phone: contact_phone.into(),
            industry: None,
            company_size: None,
            website: None,
            description: None,
            location: None,
            logo_key: None,
            is_verified: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_employer_is_unverified() {
        let employer =
            EmployerProfile::new("Acme Corp", "Jobs@Acme.example", "$argon2id$x", "555-0199");
        assert!(!employer.is_verified);
        assert!(employer.is_active);
        assert_eq!(employer.email, "jobs@acme.example");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let employer =
            EmployerProfile::new("Acme Corp", "jobs@acme.example", "$argon2id$secret", "555-0199");
        let json = serde_json::to_string(&employer).unwrap();
        assert!(!json.contains("argon2id"));
    }
}
