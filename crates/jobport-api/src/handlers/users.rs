//! User profile handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use jobport_firestore::ToFirestoreValue;
use jobport_models::{Role, UserAccount, UserId};

use crate::auth::{require_role, Principal};
use crate::error::{ApiError, ApiResult};
use crate::response::Envelope;
use crate::security::{is_valid_doc_id, sanitize_short, sanitize_text};
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub professional_title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleStatusRequest {
    pub is_active: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/users/:id: self or admin.
pub async fn get_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<UserAccount>>> {
    if !principal.is_self_or_admin(&id) {
        return Err(ApiError::forbidden(
            "not_owner",
            "You may only view your own profile",
        ));
    }

    let user = load_user(&state, &id).await?;
    Ok(Json(Envelope::data(user)))
}

/// PUT /api/users/:id: self or admin. Email, role and password are not
/// updatable through this path.
pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<Json<Envelope<UserAccount>>> {
    if !principal.is_self_or_admin(&id) {
        return Err(ApiError::forbidden(
            "not_owner",
            "You may only update your own profile",
        ));
    }

    let user_id = UserId::from(id.as_str());
    load_user(&state, &id).await?;

    let mut fields = std::collections::HashMap::new();
    if let Some(ref v) = request.name {
        fields.insert("name".to_string(), sanitize_short(v).to_firestore_value());
    }
    if let Some(ref v) = request.phone {
        fields.insert("phone".to_string(), sanitize_short(v).to_firestore_value());
    }
    if let Some(ref v) = request.professional_title {
        fields.insert(
            "professional_title".to_string(),
            sanitize_short(v).to_firestore_value(),
        );
    }
    if let Some(ref v) = request.location {
        fields.insert("location".to_string(), sanitize_short(v).to_firestore_value());
    }
    if let Some(ref v) = request.skills {
        let skills: Vec<String> = v.iter().map(|s| sanitize_short(s)).collect();
        fields.insert("skills".to_string(), skills.to_firestore_value());
    }
    if let Some(ref v) = request.summary {
        fields.insert("summary".to_string(), sanitize_text(v).to_firestore_value());
    }

    if fields.is_empty() {
        return Err(ApiError::validation("No updatable fields provided"));
    }

    state.users.update_fields(&user_id, fields).await?;

    let updated = load_user(&state, &id).await?;
    Ok(Json(Envelope::with_message("User updated successfully", updated)))
}

/// DELETE /api/users/:id: admin only.
pub async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    require_role(&principal, &[Role::Admin])?;

    let user = load_user(&state, &id).await?;
    state.users.delete(&user.id).await?;

    info!(user_id = %user.id, "User deleted");

    Ok(Json(Envelope::message("User deleted successfully")))
}

/// PATCH /api/users/:id/status: admin only; suspends or reinstates.
pub async fn toggle_user_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(request): Json<ToggleStatusRequest>,
) -> ApiResult<Json<Envelope<UserAccount>>> {
    require_role(&principal, &[Role::Admin])?;

    let user = load_user(&state, &id).await?;
    state.users.set_active(&user.id, request.is_active).await?;

    let updated = load_user(&state, &id).await?;

    info!(
        user_id = %updated.id,
        is_active = request.is_active,
        "User status toggled"
    );

    Ok(Json(Envelope::with_message(
        if request.is_active {
            "User reinstated"
        } else {
            "User suspended"
        },
        updated,
    )))
}

// ============================================================================
// Helpers
// ============================================================================

async fn load_user(state: &AppState, id: &str) -> ApiResult<UserAccount> {
    if !is_valid_doc_id(id) {
        return Err(ApiError::bad_request("Invalid user ID"));
    }
    state
        .users
        .get(&UserId::from(id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}
