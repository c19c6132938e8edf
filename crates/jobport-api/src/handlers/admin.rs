//! Admin moderation handlers. Every route here requires the admin role.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use jobport_models::{
    ApplicationId, EmployerId, EmployerProfile, JobApplication, JobPosting, Role, UserAccount,
    UserId,
};

use crate::auth::{require_role, Principal};
use crate::error::{ApiError, ApiResult};
use crate::response::Envelope;
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    #[serde(default = "default_limit")]
    pub limit: i32,
    #[serde(default)]
    pub offset: i32,
}

fn default_limit() -> i32 {
    100
}

/// A listing plus its total count, the shape admin dashboards consume.
#[derive(Debug, Serialize)]
pub struct Listing<T: Serialize> {
    pub count: usize,
    pub items: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub total_users: u64,
    pub total_employers: u64,
    pub total_jobs: u64,
    pub total_applications: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<AdminListQuery>,
) -> ApiResult<Json<Envelope<Listing<UserAccount>>>> {
    require_role(&principal, &[Role::Admin])?;

    let items = state.users.list(query.limit, query.offset).await?;
    Ok(Json(Envelope::data(Listing {
        count: items.len(),
        items,
    })))
}

/// GET /api/admin/employers
pub async fn list_employers(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<AdminListQuery>,
) -> ApiResult<Json<Envelope<Listing<EmployerProfile>>>> {
    require_role(&principal, &[Role::Admin])?;

    let items = state.employers.list(query.limit, query.offset).await?;
    Ok(Json(Envelope::data(Listing {
        count: items.len(),
        items,
    })))
}

/// GET /api/admin/jobs: includes inactive postings.
pub async fn list_jobs(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<AdminListQuery>,
) -> ApiResult<Json<Envelope<Listing<JobPosting>>>> {
    require_role(&principal, &[Role::Admin])?;

    let filters = jobport_firestore::jobs::JobQueryFilters::default();
    let items = state.jobs.query(&filters, query.limit, query.offset).await?;
    Ok(Json(Envelope::data(Listing {
        count: items.len(),
        items,
    })))
}

/// GET /api/admin/applications
pub async fn list_applications(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<AdminListQuery>,
) -> ApiResult<Json<Envelope<Listing<JobApplication>>>> {
    require_role(&principal, &[Role::Admin])?;

    let items = state.applications.list(query.limit, query.offset).await?;
    Ok(Json(Envelope::data(Listing {
        count: items.len(),
        items,
    })))
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    require_role(&principal, &[Role::Admin])?;

    let user_id = UserId::from(id);
    state
        .users
        .get(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    state.users.delete(&user_id).await?;

    info!(user_id = %user_id, admin = %principal.id, "Admin deleted user");

    Ok(Json(Envelope::message("User deleted successfully")))
}

/// DELETE /api/admin/employers/:id
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

    info!(employer_id = %employer_id, admin = %principal.id, "Admin deleted employer");

    Ok(Json(Envelope::message("Employer deleted successfully")))
}

/// DELETE /api/admin/applications/:id
pub async fn delete_application(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    require_role(&principal, &[Role::Admin])?;

    let application_id = ApplicationId::from(id);
    let application = state
        .applications
        .get(&application_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    state.applications.delete(&application_id).await?;

    if let Err(e) = state
        .jobs
        .adjust_application_count(&application.job_id, -1)
        .await
    {
        tracing::warn!(
            job_id = %application.job_id,
            error = %e,
            "Failed to decrement application counter"
        );
    }

    info!(application_id = %application_id, admin = %principal.id, "Admin deleted application");

    Ok(Json(Envelope::message("Application deleted successfully")))
}

/// GET /api/admin/stats: totals per collection.
pub async fn stats(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<Json<Envelope<StatsData>>> {
    require_role(&principal, &[Role::Admin])?;

    let total_users = state.users.count().await?;
    let total_employers = state.employers.count().await?;
    let total_jobs = state.jobs.count().await?;
    let total_applications = state.applications.count().await?;

    Ok(Json(Envelope::data(StatsData {
        total_users,
        total_employers,
        total_jobs,
        total_applications,
    })))
}
