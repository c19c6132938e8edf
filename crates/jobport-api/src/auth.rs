//! Session token issuing and verification.
//!
//! Tokens are HS256 JWTs carrying the principal id, its backing collection
//! (`kind`) and a role hint. Verification is strict about failure modes:
//! every rejection carries a stable code so clients can distinguish
//! "log in again" from "re-authenticate".
//!
//! Authorization never trusts the embedded role. After signature and
//! expiry checks, the principal is re-fetched from its collection and the
//! stored role and flags are what downstream code sees, so suspensions and
//! verification changes take effect on the next request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use jobport_models::{PrincipalKind, Role};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id.
    pub sub: String,
    /// Which collection backs the principal.
    pub kind: PrincipalKind,
    /// Role at issue time. A hint only; never used for authorization.
    pub role: Role,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Signing and verification keys plus the token lifetime.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    /// Token lifetime; also the revocation-registry entry TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for a principal.
    pub fn issue(&self, id: &str, kind: PrincipalKind, role: Role) -> ApiResult<String> {
        self.issue_with_ttl(id, kind, role, self.ttl)
    }

    fn issue_with_ttl(
        &self,
        id: &str,
        kind: PrincipalKind,
        role: Role,
        ttl: Duration,
    ) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: id.to_string(),
            kind,
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Token signing failed: {}", e)))
    }

    /// Verify signature and expiry. Expired and malformed tokens produce
    /// distinct codes.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::unauthorized(
                    "token_expired",
                    "Session expired, please log in again",
                ),
                _ => ApiError::unauthorized("token_invalid", "Invalid token"),
            })
    }
}

/// The authenticated principal attached to a request.
///
/// Role and flags come from the live store record, not the token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub kind: PrincipalKind,
    pub role: Role,
    pub is_active: bool,
    /// Only meaningful for employers.
    pub is_verified: Option<bool>,
    /// Raw bearer token, kept so logout can revoke it.
    pub token: String,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_verified_employer(&self) -> bool {
        self.role == Role::Employer && self.is_verified == Some(true)
    }

    /// Whether this principal is the given account or an admin.
    pub fn is_self_or_admin(&self, id: &str) -> bool {
        self.is_admin() || self.id == id
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::unauthorized("missing_token", "Access denied. No token provided.")
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::unauthorized("malformed_header", "Invalid Authorization header format")
        })?;

        if state.revoked.is_revoked(token).await {
            return Err(ApiError::unauthorized(
                "token_revoked",
                "Token has been invalidated",
            ));
        }

        let claims = state.tokens.verify(token)?;

        // Live lookup: the stored record is authoritative for role and
        // suspension state.
        let resolved = state
            .principals
            .resolve(claims.kind, &claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("unknown_principal", "Account no longer exists"))?;

        if !resolved.is_active {
            return Err(ApiError::forbidden(
                "account_suspended",
                "Your account has been suspended. Please contact support.",
            ));
        }

        Ok(Principal {
            id: resolved.id,
            kind: resolved.kind,
            role: resolved.role,
            is_active: resolved.is_active,
            is_verified: resolved.is_verified,
            token: token.to_string(),
        })
    }
}

/// Authorization gate: resolved role against the endpoint's allowed set.
pub fn require_role(principal: &Principal, allowed: &[Role]) -> ApiResult<()> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "insufficient_role",
            "Access denied. Insufficient permissions.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new("test-secret-that-is-long-enough-0123", 14)
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let keys = keys();
        let token = keys
            .issue("user-1", PrincipalKind::User, Role::Candidate)
            .unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.kind, PrincipalKind::User);
        assert_eq!(claims.role, Role::Candidate);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_token_has_distinct_code() {
        let keys = keys();
        // Well past the default validation leeway.
        let token = keys
            .issue_with_ttl("user-1", PrincipalKind::User, Role::Candidate, Duration::minutes(-10))
            .unwrap();

        match keys.verify(&token) {
            Err(ApiError::Unauthorized { code, .. }) => assert_eq!(code, "token_expired"),
            other => panic!("expected expired rejection, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let keys = keys();
        let token = keys
            .issue("user-1", PrincipalKind::User, Role::Candidate)
            .unwrap();
        let tampered = format!("{}x", token);

        match keys.verify(&tampered) {
            Err(ApiError::Unauthorized { code, .. }) => assert_eq!(code, "token_invalid"),
            other => panic!("expected invalid rejection, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = keys()
            .issue("user-1", PrincipalKind::User, Role::Candidate)
            .unwrap();
        let other_keys = TokenKeys::new("another-secret-that-is-long-enough-1", 14);

        assert!(matches!(
            other_keys.verify(&token),
            Err(ApiError::Unauthorized { code: "token_invalid", .. })
        ));
    }

    fn principal(role: Role) -> Principal {
        Principal {
            id: "p-1".to_string(),
            kind: PrincipalKind::User,
            role,
            is_active: true,
            is_verified: None,
            token: String::new(),
        }
    }

    #[test]
    fn test_require_role_gate() {
        let admin = principal(Role::Admin);
        let candidate = principal(Role::Candidate);

        assert!(require_role(&admin, &[Role::Admin]).is_ok());
        assert!(require_role(&candidate, &[Role::Admin]).is_err());
        assert!(require_role(&candidate, &[Role::Candidate, Role::Admin]).is_ok());
    }

    #[test]
    fn test_verified_employer_check() {
        let mut employer = principal(Role::Employer);
        employer.kind = PrincipalKind::Employer;
        employer.is_verified = Some(false);
        assert!(!employer.is_verified_employer());

        employer.is_verified = Some(true);
        assert!(employer.is_verified_employer());

        let candidate = principal(Role::Candidate);
        assert!(!candidate.is_verified_employer());
    }

    #[test]
    fn test_self_or_admin() {
        let candidate = principal(Role::Candidate);
        assert!(candidate.is_self_or_admin("p-1"));
        assert!(!candidate.is_self_or_admin("p-2"));

        let admin = principal(Role::Admin);
        assert!(admin.is_self_or_admin("p-2"));
    }
}
