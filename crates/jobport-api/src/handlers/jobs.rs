//! Job posting handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use jobport_firestore::jobs::JobQueryFilters;
use jobport_firestore::ToFirestoreValue;
use jobport_models::{EmployerId, JobCategory, JobId, JobPosting, JobType, PrincipalKind, Role};

use crate::auth::{require_role, Principal};
use crate::error::{ApiError, ApiResult};
use crate::response::{paginate, Envelope, Paginated};
use crate::security::{is_valid_doc_id, sanitize_short, sanitize_text};
use crate::state::AppState;

/// Upper bound on jobs fetched per listing query before in-memory
/// filtering; keyword/location matching happens over this window.
const LISTING_FETCH_LIMIT: i32 = 500;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
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

#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1, max = 200))]
    pub company: String,
    pub category: String,
    pub job_type: String,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub deadline: DateTime<Utc>,
    /// Only honored for admins; employers always post as themselves.
    #[serde(default)]
    pub employer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteJobQuery {
    /// `?soft=true` deactivates instead of deleting.
    #[serde(default)]
    pub soft: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/jobs: active jobs with AND-combined filters.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> ApiResult<Json<Envelope<Paginated<JobPosting>>>> {
    let jobs = fetch_filtered(&state, &query, Some(true)).await?;
    Ok(Json(Envelope::data(paginate(jobs, query.page, query.limit))))
}

/// GET /api/jobs/search: same contract as the listing, kept as its own
/// route for API compatibility.
pub async fn search_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> ApiResult<Json<Envelope<Paginated<JobPosting>>>> {
    let jobs = fetch_filtered(&state, &query, Some(true)).await?;
    Ok(Json(Envelope::data(paginate(jobs, query.page, query.limit))))
}

/// POST /api/jobs: verified employers (or admins) only.
pub async fn create_job(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<JobPosting>>)> {
    require_role(&principal, &[Role::Employer, Role::Admin])?;

    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let employer_id = match principal.role {
        Role::Employer => {
            if !principal.is_verified_employer() {
                return Err(ApiError::forbidden(
                    "employer_unverified",
                    "Only verified employers may post jobs",
                ));
            }
            EmployerId::from(principal.id.as_str())
        }
        _ => {
            // Admin posting on behalf of an employer.
            let id = request
                .employer_id
                .as_deref()
                .ok_or_else(|| ApiError::validation("employer_id is required"))?;
            let employer_id = EmployerId::from(id);
            state
                .employers
                .get(&employer_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Employer not found"))?;
            employer_id
        }
    };

    let category = JobCategory::parse(&request.category)
        .ok_or_else(|| ApiError::validation(format!("Unknown category '{}'", request.category)))?;
    let job_type = JobType::parse(&request.job_type)
        .ok_or_else(|| ApiError::validation(format!("Unknown job type '{}'", request.job_type)))?;

    if request.deadline <= Utc::now() {
        return Err(ApiError::validation("Deadline must be in the future"));
    }

    let now = Utc::now();
    let job = JobPosting {
        id: JobId::new(),
        title: sanitize_short(&request.title),
        description: sanitize_text(&request.description),
        company: sanitize_short(&request.company),
        category,
        job_type,
        location: sanitize_short(&request.location),
        salary: request.salary.as_deref().map(sanitize_short),
        experience: request.experience.as_deref().map(sanitize_short),
        education: request.education.as_deref().map(sanitize_short),
        requirements: request.requirements.iter().map(|s| sanitize_short(s)).collect(),
        responsibilities: request
            .responsibilities
            .iter()
            .map(|s| sanitize_short(s))
            .collect(),
        tags: request.tags.iter().map(|s| sanitize_short(s)).collect(),
        deadline: request.deadline,
        employer_id,
        views: 0,
        application_count: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.jobs.create(&job).await?;

    info!(job_id = %job.id, employer_id = %job.employer_id, "Job created");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("Job created successfully", job)),
    ))
}

/// GET /api/jobs/:id: job detail; bumps the view counter atomically.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<JobPosting>>> {
    if !is_valid_doc_id(&id) {
        return Err(ApiError::bad_request("Invalid job ID format"));
    }

    let job_id = JobId::from(id);
    let mut job = state
        .jobs
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    // The stored counter is the source of truth; the response reflects
    // this fetch having been counted.
    job.views = state.jobs.increment_views(&job_id).await?;

    Ok(Json(Envelope::data(job)))
}

/// PUT /api/jobs/:id: owning employer or admin.
pub async fn update_job(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(request): Json<UpdateJobRequest>,
) -> ApiResult<Json<Envelope<JobPosting>>> {
    let job_id = JobId::from(id);
    let job = state
        .jobs
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    ensure_owner_or_admin(&principal, &job)?;

    let mut fields = std::collections::HashMap::new();
    if let Some(ref title) = request.title {
        fields.insert("title".to_string(), sanitize_short(title).to_firestore_value());
    }
    if let Some(ref description) = request.description {
        fields.insert(
            "description".to_string(),
            sanitize_text(description).to_firestore_value(),
        );
    }
    if let Some(ref company) = request.company {
        fields.insert("company".to_string(), sanitize_short(company).to_firestore_value());
    }
    if let Some(ref category) = request.category {
        let parsed = JobCategory::parse(category)
            .ok_or_else(|| ApiError::validation(format!("Unknown category '{}'", category)))?;
        fields.insert("category".to_string(), parsed.as_str().to_firestore_value());
    }
    if let Some(ref job_type) = request.job_type {
        let parsed = JobType::parse(job_type)
            .ok_or_else(|| ApiError::validation(format!("Unknown job type '{}'", job_type)))?;
        fields.insert("job_type".to_string(), parsed.as_str().to_firestore_value());
    }
    if let Some(ref location) = request.location {
        fields.insert("location".to_string(), sanitize_short(location).to_firestore_value());
    }
    if let Some(ref salary) = request.salary {
        fields.insert("salary".to_string(), sanitize_short(salary).to_firestore_value());
    }
    if let Some(deadline) = request.deadline {
        fields.insert("deadline".to_string(), deadline.to_firestore_value());
    }
    if let Some(is_active) = request.is_active {
        fields.insert("is_active".to_string(), is_active.to_firestore_value());
    }

    if fields.is_empty() {
        return Err(ApiError::validation("No updatable fields provided"));
    }

    state.jobs.update_fields(&job_id, fields).await?;

    let updated = state
        .jobs
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(Envelope::with_message("Job updated successfully", updated)))
}

/// DELETE /api/jobs/:id: owning employer or admin. `?soft=true`
/// deactivates instead of removing the document.
pub async fn delete_job(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Query(query): Query<DeleteJobQuery>,
) -> ApiResult<Json<Envelope<()>>> {
    let job_id = JobId::from(id);
    let job = state
        .jobs
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    ensure_owner_or_admin(&principal, &job)?;

    if query.soft {
        state.jobs.set_active(&job_id, false).await?;
        info!(job_id = %job_id, "Job deactivated");
        Ok(Json(Envelope::message("Job deactivated successfully")))
    } else {
        state.jobs.delete(&job_id).await?;
        info!(job_id = %job_id, "Job deleted");
        Ok(Json(Envelope::message("Job deleted successfully")))
    }
}

/// GET /api/jobs/employer/:employer_id: all jobs for one employer.
pub async fn jobs_by_employer(
    State(state): State<AppState>,
    Path(employer_id): Path<String>,
) -> ApiResult<Json<Envelope<Vec<JobPosting>>>> {
    if !is_valid_doc_id(&employer_id) {
        return Err(ApiError::bad_request("Invalid employer ID"));
    }

    let jobs = state
        .jobs
        .list_by_employer(&EmployerId::from(employer_id))
        .await?;

    Ok(Json(Envelope::data(jobs)))
}

// ============================================================================
// Helpers
// ============================================================================

fn ensure_owner_or_admin(principal: &Principal, job: &JobPosting) -> ApiResult<()> {
    let owns = principal.kind == PrincipalKind::Employer
        && principal.id == job.employer_id.as_str();
    if owns || principal.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "not_owner",
            "Only the posting employer or an admin may modify this job",
        ))
    }
}

/// Exact filters go to the store; substring terms are applied here,
/// case-insensitively, AND-combined.
async fn fetch_filtered(
    state: &AppState,
    query: &JobListQuery,
    is_active: Option<bool>,
) -> ApiResult<Vec<JobPosting>> {
    let category = match query.category.as_deref() {
        Some(raw) => Some(
            JobCategory::parse(raw)
                .ok_or_else(|| ApiError::validation(format!("Unknown category '{}'", raw)))?,
        ),
        None => None,
    };
    let job_type = match query.job_type.as_deref() {
        Some(raw) => Some(
            JobType::parse(raw)
                .ok_or_else(|| ApiError::validation(format!("Unknown job type '{}'", raw)))?,
        ),
        None => None,
    };

    let filters = JobQueryFilters {
        category,
        job_type,
        employer_id: None,
        is_active,
    };

    let jobs = state.jobs.query(&filters, LISTING_FETCH_LIMIT, 0).await?;

    let keyword = query.keyword.as_deref().map(str::to_lowercase);
    let location = query.location.as_deref().map(str::to_lowercase);

    Ok(jobs
        .into_iter()
        .filter(|job| {
            let keyword_ok = keyword.as_deref().map_or(true, |kw| {
                job.title.to_lowercase().contains(kw)
                    || job.description.to_lowercase().contains(kw)
            });
            let location_ok = location
                .as_deref()
                .map_or(true, |loc| job.location.to_lowercase().contains(loc));
            keyword_ok && location_ok
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobport_models::UserId;

    fn job_owned_by(employer: &str) -> JobPosting {
        let now = Utc::now();
        JobPosting {
            id: JobId::new(),
            title: "Data Engineer".to_string(),
            description: "Pipelines".to_string(),
            company: "Acme".to_string(),
            category: JobCategory::Technology,
            job_type: JobType::FullTime,
            location: "Remote".to_string(),
            salary: None,
            experience: None,
            education: None,
            requirements: vec![],
            responsibilities: vec![],
            tags: vec![],
            deadline: now + chrono::Duration::days(10),
            employer_id: EmployerId::from(employer),
            views: 0,
            application_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn employer_principal(id: &str, verified: bool) -> Principal {
        Principal {
            id: id.to_string(),
            kind: PrincipalKind::Employer,
            role: Role::Employer,
            is_active: true,
            is_verified: Some(verified),
            token: String::new(),
        }
    }

    #[test]
    fn test_owner_gate() {
        let job = job_owned_by("emp-1");

        assert!(ensure_owner_or_admin(&employer_principal("emp-1", true), &job).is_ok());
        assert!(ensure_owner_or_admin(&employer_principal("emp-2", true), &job).is_err());

        let admin = Principal {
            id: UserId::new().to_string(),
            kind: PrincipalKind::User,
            role: Role::Admin,
            is_active: true,
            is_verified: None,
            token: String::new(),
        };
        assert!(ensure_owner_or_admin(&admin, &job).is_ok());
    }

    #[test]
    fn test_unverified_employer_cannot_post() {
        let principal = employer_principal("emp-1", false);
        assert!(!principal.is_verified_employer());
    }
}
