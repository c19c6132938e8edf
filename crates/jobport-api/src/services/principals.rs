//! Polymorphic principal lookup.
//!
//! Users and employers live in different collections; authorization wants
//! one shape. `PrincipalService` resolves `(kind, id)` to a normalized
//! record regardless of the backing collection.

use std::sync::Arc;

use jobport_firestore::{EmployerRepository, UserRepository};
use jobport_models::{EmployerId, PrincipalKind, Role, UserId};

use crate::error::ApiResult;

/// Normalized view of an authenticated account.
#[derive(Debug, Clone)]
pub struct ResolvedPrincipal {
    pub id: String,
    pub kind: PrincipalKind,
    pub role: Role,
    pub is_active: bool,
    /// Only meaningful for employers.
    pub is_verified: Option<bool>,
}

/// Resolves principals across the users and employers collections.
#[derive(Clone)]
pub struct PrincipalService {
    users: Arc<UserRepository>,
    employers: Arc<EmployerRepository>,
}

impl PrincipalService {
    pub fn new(users: Arc<UserRepository>, employers: Arc<EmployerRepository>) -> Self {
        Self { users, employers }
    }

    /// Fetch the live record behind a principal reference.
    ///
    /// Returns `Ok(None)` when the id is unknown; the caller decides
    /// whether that is a 401 (stale token) or a 404 (looked-up resource).
    pub async fn resolve(
        &self,
        kind: PrincipalKind,
        id: &str,
    ) -> ApiResult<Option<ResolvedPrincipal>> {
        match kind {
            PrincipalKind::User => {
                let user = self.users.get(&UserId::from(id)).await?;
                Ok(user.map(|u| ResolvedPrincipal {
                    id: u.id.to_string(),
                    kind: PrincipalKind::User,
                    role: u.role,
                    is_active: u.is_active,
                    is_verified: None,
                }))
            }
            PrincipalKind::Employer => {
                let employer = self.employers.get(&EmployerId::from(id)).await?;
                Ok(employer.map(|e| ResolvedPrincipal {
                    id: e.id.to_string(),
                    kind: PrincipalKind::Employer,
                    role: Role::Employer,
                    is_active: e.is_active,
                    is_verified: Some(e.is_verified),
                }))
            }
        }
    }
}
