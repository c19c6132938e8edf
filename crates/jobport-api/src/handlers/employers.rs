//! Employer handlers: registration, login, profile, verification.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use jobport_firestore::ToFirestoreValue;
use jobport_models::{EmployerId, EmployerProfile, PrincipalKind, Role};

use crate::auth::{require_role, Principal};
use crate::error::{ApiError, ApiResult};
use crate::handlers::auth::{AuthData, AuthUserInfo};
use crate::response::{paginate, Envelope, Paginated};
use crate::security::{
    hash_password, is_valid_doc_id, normalize_email, sanitize_short, sanitize_text,
    validate_password, verify_password,
};
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterEmployerRequest {
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, max = 50))]
    pub contact_phone: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmployerLoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployerRequest {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub company_size: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmployerRequest {
    pub is_verified: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// An employer plus its active job count, for the top-companies view.
#[derive(Debug, Serialize)]
pub struct RankedEmployer {
    #[serde(flatten)]
    pub employer: EmployerProfile,
    pub job_count: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/employers/register
pub async fn register_employer(
    State(state): State<AppState>,
    Json(request): Json<RegisterEmployerRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<AuthData>>)> {
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;
    validate_password(&request.password)?;

    let email = normalize_email(&request.email);
    if state.employers.find_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("Email already exists for this employer"));
    }

    let password_hash = hash_password(&request.password)?;
    let employer = EmployerProfile::new(
        sanitize_short(&request.company_name),
        email,
        password_hash,
        sanitize_short(&request.contact_phone),
    );
    state.employers.create(&employer).await?;

    state
        .mailer
        .send_welcome(&employer.email, &employer.company_name);

    let token = state
        .tokens
        .issue(employer.id.as_str(), PrincipalKind::Employer, Role::Employer)?;

    info!(employer_id = %employer.id, "Registered new employer");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Employer registered successfully",
            AuthData {
                token,
                user: AuthUserInfo {
                    id: employer.id.to_string(),
                    name: employer.company_name,
                    email: employer.email,
                    role: Role::Employer,
                    is_verified: Some(employer.is_verified),
                },
            },
        )),
    ))
}

/// POST /api/employers/login
pub async fn login_employer(
    State(state): State<AppState>,
    Json(request): Json<EmployerLoginRequest>,
) -> ApiResult<Json<Envelope<AuthData>>> {
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let email = normalize_email(&request.email);
    let employer = state
        .employers
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("bad_credentials", "Invalid email or password"))?;

    if !employer.is_active {
        return Err(ApiError::forbidden(
            "account_suspended",
            "Your account has been suspended. Please contact support.",
        ));
    }

    if !verify_password(&request.password, &employer.password_hash) {
        return Err(ApiError::unauthorized(
            "bad_credentials",
            "Invalid email or password",
        ));
    }

    let token = state
        .tokens
        .issue(employer.id.as_str(), PrincipalKind::Employer, Role::Employer)?;

    Ok(Json(Envelope::with_message(
        "Login successful",
        AuthData {
            token,
            user: AuthUserInfo {
                id: employer.id.to_string(),
                name: employer.company_name,
                email: employer.email,
                role: Role::Employer,
                is_verified: Some(employer.is_verified),
            },
        },
    )))
}

/// GET /api/employers: public listing.
pub async fn list_employers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Envelope<Paginated<EmployerProfile>>>> {
    let employers = state.employers.list(500, 0).await?;
    Ok(Json(Envelope::data(paginate(
        employers,
        query.page,
        query.limit,
    ))))
}

/// GET /api/employers/top: verified employers ranked by active jobs.
pub async fn top_employers(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<Vec<RankedEmployer>>>> {
    let verified = state.employers.list_verified(100).await?;

    let mut ranked = Vec::with_capacity(verified.len());
    for employer in verified {
        let job_count = state.jobs.count_active_by_employer(&employer.id).await?;
        if job_count > 0 {
            ranked.push(RankedEmployer {
                employer,
                job_count,
            });
        }
    }

    ranked.sort_by(|a, b| b.job_count.cmp(&a.job_count));
    ranked.truncate(10);

    Ok(Json(Envelope::data(ranked)))
}

/// GET /api/employers/:id
pub async fn get_employer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<EmployerProfile>>> {
    if !is_valid_doc_id(&id) {
        return Err(ApiError::bad_request("Invalid employer ID"));
    }

    let employer = state
        .employers
        .get(&EmployerId::from(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Employer not found"))?;

    Ok(Json(Envelope::data(employer)))
}

/// PUT /api/employers/:id: the employer itself or an admin.
pub async fn update_employer(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(request): Json<UpdateEmployerRequest>,
) -> ApiResult<Json<Envelope<EmployerProfile>>> {
    let is_self = principal.kind == PrincipalKind::Employer && principal.id == id;
    if !is_self && !principal.is_admin() {
        return Err(ApiError::forbidden(
            "not_owner",
            "You may only update your own profile",
        ));
    }

    let employer_id = EmployerId::from(id);
    state
        .employers
        .get(&employer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employer not found"))?;

    let mut fields = std::collections::HashMap::new();
    if let Some(ref v) = request.company_name {
        fields.insert("company_name".to_string(), sanitize_short(v).to_firestore_value());
    }
    if let Some(ref v) = request.contact_phone {
        fields.insert("contact_phone".to_string(), sanitize_short(v).to_firestore_value());
    }
    if let Some(ref v) = request.industry {
        fields.insert("industry".to_string(), sanitize_short(v).to_firestore_value());
    }
    if let Some(ref v) = request.company_size {
        fields.insert("company_size".to_string(), sanitize_short(v).to_firestore_value());
    }
    if let Some(ref v) = request.website {
        fields.insert("website".to_string(), sanitize_short(v).to_firestore_value());
    }
    if let Some(ref v) = request.description {
        fields.insert("description".to_string(), sanitize_text(v).to_firestore_value());
    }
    if let Some(ref v) = request.location {
        fields.insert("location".to_string(), sanitize_short(v).to_firestore_value());
    }

    if fields.is_empty() {
        return Err(ApiError::validation("No updatable fields provided"));
    }

    state.employers.update_fields(&employer_id, fields).await?;

    let updated = state
        .employers
        .get(&employer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employer not found"))?;

    Ok(Json(Envelope::with_message(
        "Employer updated successfully",
        updated,
    )))
}

/// PUT /api/employers/:id/verify: admin only.
pub async fn verify_employer(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(request): Json<VerifyEmployerRequest>,
) -> ApiResult<Json<Envelope<EmployerProfile>>> {
    require_role(&principal, &[Role::Admin])?;

    let employer_id = EmployerId::from(id);
    state
        .employers
        .get(&employer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employer not found"))?;

    state
        .employers
        .set_verified(&employer_id, request.is_verified)
        .await?;

    let updated = state
        .employers
        .get(&employer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employer not found"))?;

    info!(
        employer_id = %employer_id,
        is_verified = request.is_verified,
        "Employer verification updated"
    );

    Ok(Json(Envelope::with_message(
        "Employer verification updated",
        updated,
    )))
}

/// DELETE /api/employers/:id: admin only.
pub async fn delete_employer(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    require_role(&principal, &[Role::Admin])?;

    let employer_id = EmployerId::from(id);
    state
        .employers
        .get(&employer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employer not found"))?;

    state.employers.delete(&employer_id).await?;

    info!(employer_id = %employer_id, "Employer deleted");

    Ok(Json(Envelope::message("Employer deleted successfully")))
}
