//! Authentication handlers: registration, login, logout, password flows.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use jobport_firestore::ToFirestoreValue;
use jobport_models::{PrincipalKind, Role, UserAccount};

use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::response::Envelope;
use crate::security::{
    hash_password, normalize_email, sanitize_short, validate_password, verify_password,
};
use crate::state::AppState;

/// Reset tokens are valid for one hour.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 50))]
    pub phone: String,
    pub password: String,
    /// Optional; `candidate` (default) or `guest`. Admin accounts are
    /// seeded out of band, never self-registered.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RequestResetRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Public projection of a principal returned with a token.
#[derive(Debug, Serialize)]
pub struct AuthUserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AuthData {
    pub token: String,
    pub user: AuthUserInfo,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<AuthData>>)> {
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;
    validate_password(&request.password)?;

    let role = match request.role.as_deref() {
        None | Some("candidate") => Role::Candidate,
        Some("guest") => Role::Guest,
        Some(other) => {
            return Err(ApiError::validation(format!(
                "Role '{}' cannot be self-registered",
                other
            )))
        }
    };

    let email = normalize_email(&request.email);
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("User with this email already exists"));
    }

    let password_hash = hash_password(&request.password)?;
    let user = UserAccount::new(
        sanitize_short(&request.name),
        email.clone(),
        sanitize_short(&request.phone),
        password_hash,
        role,
    );
    state.users.create(&user).await?;

    state.mailer.send_welcome(&email, &user.name);

    let token = state
        .tokens
        .issue(user.id.as_str(), PrincipalKind::User, user.role)?;

    info!(user_id = %user.id, "Registered new user");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "User registered successfully",
            AuthData {
                token,
                user: AuthUserInfo {
                    id: user.id.to_string(),
                    name: user.name,
                    email: user.email,
                    role: user.role,
                    is_verified: None,
                },
            },
        )),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<Envelope<AuthData>>> {
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let email = normalize_email(&request.email);
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| invalid_credentials())?;

    if !user.is_active {
        return Err(ApiError::forbidden(
            "account_suspended",
            "Your account has been suspended. Please contact support.",
        ));
    }

    if !verify_password(&request.password, &user.password_hash) {
        metrics::record_auth_failure("bad_credentials");
        return Err(invalid_credentials());
    }

    let token = state
        .tokens
        .issue(user.id.as_str(), PrincipalKind::User, user.role)?;

    Ok(Json(Envelope::with_message(
        "Login successful",
        AuthData {
            token,
            user: AuthUserInfo {
                id: user.id.to_string(),
                name: user.name,
                email: user.email,
                role: user.role,
                is_verified: None,
            },
        },
    )))
}

/// POST /api/auth/logout
///
/// Revokes the presented token until its natural expiry.
pub async fn logout(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<Json<Envelope<()>>> {
    state.revoked.revoke(principal.token.clone()).await;
    metrics::record_token_revoked();

    info!(principal_id = %principal.id, "Logged out");

    Ok(Json(Envelope::message("Logout successful")))
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Envelope<()>>> {
    validate_password(&request.new_password)?;

    // The stored hash lives in whichever collection backs the principal.
    let stored_hash = match principal.kind {
        PrincipalKind::User => {
            state
                .users
                .get(&principal.id.as_str().into())
                .await?
                .ok_or_else(|| ApiError::not_found("User not found"))?
                .password_hash
        }
        PrincipalKind::Employer => {
            state
                .employers
                .get(&principal.id.as_str().into())
                .await?
                .ok_or_else(|| ApiError::not_found("Employer not found"))?
                .password_hash
        }
    };

    if !verify_password(&request.current_password, &stored_hash) {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }

    let new_hash = hash_password(&request.new_password)?;
    match principal.kind {
        PrincipalKind::User => {
            state
                .users
                .set_password(&principal.id.as_str().into(), &new_hash)
                .await?;
        }
        PrincipalKind::Employer => {
            let mut fields = std::collections::HashMap::new();
            fields.insert("password_hash".to_string(), new_hash.to_firestore_value());
            state
                .employers
                .update_fields(&principal.id.as_str().into(), fields)
                .await?;
        }
    }

    info!(principal_id = %principal.id, "Password changed");

    Ok(Json(Envelope::message("Password changed successfully")))
}

/// POST /api/auth/request-reset
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<RequestResetRequest>,
) -> ApiResult<Json<Envelope<()>>> {
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let email = normalize_email(&request.email);
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found with this email"))?;

    let reset_token = generate_reset_token();
    let expires = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
    state
        .users
        .set_reset_token(&user.id, &reset_token, expires)
        .await?;

    state.mailer.send_reset(&email, &reset_token);

    Ok(Json(Envelope::message("Password reset email sent")))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> ApiResult<Json<Envelope<()>>> {
    validate_password(&request.new_password)?;

    let user = state
        .users
        .find_by_reset_token(&request.token)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid or expired reset token"))?;

    let new_hash = hash_password(&request.new_password)?;
    // set_password also clears the reset token.
    state.users.set_password(&user.id, &new_hash).await?;

    info!(user_id = %user.id, "Password reset via token");

    Ok(Json(Envelope::message("Password reset successful")))
}

// ============================================================================
// Helpers
// ============================================================================

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("bad_credentials", "Invalid email or password")
}

/// 32 random bytes, hex-encoded.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_token_shape() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        // Two tokens must differ.
        assert_ne!(token, generate_reset_token());
    }

    #[test]
    fn test_register_request_validation() {
        let bad_email = RegisterRequest {
            name: "Ada".into(),
            email: "not-an-email".into(),
            phone: "555".into(),
            password: "long enough".into(),
            role: None,
        };
        assert!(bad_email.validate().is_err());

        let ok = RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "555".into(),
            password: "long enough".into(),
            role: None,
        };
        assert!(ok.validate().is_ok());
    }
}
