//! Multipart upload handlers for resumes, avatars, and company logos.
//!
//! Files land in R2 under `{kind}/{principal_id}/{uuid}.{ext}`; the object
//! key is then saved on the owning principal document. Responses include a
//! short-lived presigned URL for immediate display.

use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use jobport_models::{PrincipalKind, Role};
use jobport_storage::{UploadKind, UploadValidation};

use crate::auth::{require_role, Principal};
use crate::error::{ApiError, ApiResult};
use crate::response::Envelope;
use crate::state::AppState;

/// Presigned URL lifetime for upload responses.
const PRESIGN_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Serialize)]
pub struct UploadData {
    pub key: String,
    /// Presigned GET URL, valid for an hour.
    pub url: String,
}

/// POST /api/uploads/avatar: any user account.
pub async fn upload_avatar(
    State(state): State<AppState>,
    principal: Principal,
    multipart: Multipart,
) -> ApiResult<Json<Envelope<UploadData>>> {
    if principal.kind != PrincipalKind::User {
        return Err(ApiError::forbidden(
            "wrong_principal",
            "Avatars belong to user accounts; employers upload logos",
        ));
    }

    let previous = state
        .users
        .get(&principal.id.as_str().into())
        .await?
        .and_then(|u| u.avatar_key);

    let stored = store_upload(&state, UploadKind::Avatar, &principal, multipart).await?;
    state
        .users
        .set_avatar_key(&principal.id.as_str().into(), &stored.key)
        .await?;

    discard_replaced(&state, previous).await;

    Ok(Json(Envelope::with_message("Avatar uploaded", stored)))
}

/// POST /api/uploads/resume: candidates only.
pub async fn upload_resume(
    State(state): State<AppState>,
    principal: Principal,
    multipart: Multipart,
) -> ApiResult<Json<Envelope<UploadData>>> {
    require_role(&principal, &[Role::Candidate])?;

    // The previous resume is kept: submitted applications may still
    // reference its key.
    let stored = store_upload(&state, UploadKind::Resume, &principal, multipart).await?;
    state
        .users
        .set_resume_key(&principal.id.as_str().into(), &stored.key)
        .await?;

    Ok(Json(Envelope::with_message("Resume uploaded", stored)))
}

/// POST /api/uploads/logo: employers only.
pub async fn upload_logo(
    State(state): State<AppState>,
    principal: Principal,
    multipart: Multipart,
) -> ApiResult<Json<Envelope<UploadData>>> {
    if principal.kind != PrincipalKind::Employer {
        return Err(ApiError::forbidden(
            "wrong_principal",
            "Logos belong to employer accounts",
        ));
    }

    let previous = state
        .employers
        .get(&principal.id.as_str().into())
        .await?
        .and_then(|e| e.logo_key);

    let stored = store_upload(&state, UploadKind::Logo, &principal, multipart).await?;
    state
        .employers
        .set_logo_key(&principal.id.as_str().into(), &stored.key)
        .await?;

    discard_replaced(&state, previous).await;

    Ok(Json(Envelope::with_message("Logo uploaded", stored)))
}

/// Best-effort removal of a replaced object; the new key is already
/// saved, so a failed delete only leaves an orphan behind.
async fn discard_replaced(state: &AppState, previous: Option<String>) {
    if let Some(key) = previous {
        if let Err(e) = state.storage.delete_object(&key).await {
            warn!(key = %key, error = %e, "Failed to delete replaced object");
        }
    }
}

/// Pull the first file field out of the multipart body, validate it, and
/// write it to the bucket.
async fn store_upload(
    state: &AppState,
    kind: UploadKind,
    principal: &Principal,
    mut multipart: Multipart,
) -> ApiResult<UploadData> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let content_type = field
        .content_type()
        .ok_or_else(|| ApiError::bad_request("Missing file content type"))?
        .to_string();

    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

    let validation = UploadValidation::check(kind, &principal.id, &content_type, data.len())?;

    state
        .storage
        .upload_bytes(data.to_vec(), &validation.key, &validation.content_type)
        .await?;

    let url = state.storage.presign_get(&validation.key, PRESIGN_TTL).await?;

    info!(
        principal_id = %principal.id,
        key = %validation.key,
        "Stored upload"
    );

    Ok(UploadData {
        key: validation.key,
        url,
    })
}
