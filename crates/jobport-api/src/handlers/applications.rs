//! Application handlers: submission, review, and withdrawal.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use jobport_models::{
    ApplicationId, ApplicationStatus, EmployerId, JobApplication, JobId, PrincipalKind, Role,
    UserId,
};

use crate::auth::{require_role, Principal};
use crate::error::{ApiError, ApiResult};
use crate::response::Envelope;
use crate::security::{is_valid_doc_id, sanitize_text};
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitApplicationRequest {
    pub job_id: String,
    /// Defaults to the candidate's stored resume when omitted.
    #[serde(default)]
    pub resume_key: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/applications: candidates only.
///
/// The job's application counter is incremented after the submission
/// write; the two are separate operations with no rollback, so a counter
/// failure is logged and the submission stands.
pub async fn submit_application(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<SubmitApplicationRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<JobApplication>>)> {
    require_role(&principal, &[Role::Candidate])?;

    if !is_valid_doc_id(&request.job_id) {
        return Err(ApiError::bad_request("Invalid job ID"));
    }
    let job_id = JobId::from(request.job_id.as_str());
    let candidate_id = UserId::from(principal.id.as_str());

    // One application per (candidate, job). The deterministic document id
    // makes the create below fail on a race, but checking first gives the
    // specific conflict message.
    if state
        .applications
        .find_for_pair(&job_id, &candidate_id)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("You have already applied for this job"));
    }

    let job = state
        .jobs
        .get(&job_id)
        .await?
        .filter(|j| j.is_active)
        .ok_or_else(|| ApiError::not_found("Job not found or no longer active"))?;

    if Utc::now() > job.deadline {
        return Err(ApiError::bad_request("Application deadline has passed"));
    }

    let resume_key = match request.resume_key {
        Some(key) => key,
        None => state
            .users
            .get(&candidate_id)
            .await?
            .and_then(|u| u.resume_key)
            .ok_or_else(|| {
                ApiError::bad_request("No resume on file; upload one or provide resume_key")
            })?,
    };

    let application = JobApplication::new(
        job_id.clone(),
        candidate_id,
        job.employer_id.clone(),
        resume_key,
        request.cover_letter.as_deref().map(sanitize_text),
    );

    match state.applications.create(&application).await {
        Ok(()) => {}
        Err(jobport_firestore::FirestoreError::AlreadyExists(_)) => {
            return Err(ApiError::conflict("You have already applied for this job"));
        }
        Err(e) => return Err(e.into()),
    }

    if let Err(e) = state.jobs.adjust_application_count(&job_id, 1).await {
        warn!(job_id = %job_id, error = %e, "Failed to bump application counter");
    }

    info!(application_id = %application.id, "Application submitted");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Application submitted successfully",
            application,
        )),
    ))
}

/// GET /api/applications/:id: applicant, owning employer, or admin.
pub async fn get_application(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<JobApplication>>> {
    let application = load_application(&state, &id).await?;
    ensure_can_view(&principal, &application)?;
    Ok(Json(Envelope::data(application)))
}

/// GET /api/applications/job/:job_id: owning employer or admin.
pub async fn applications_by_job(
    State(state): State<AppState>,
    principal: Principal,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Envelope<Vec<JobApplication>>>> {
    if !is_valid_doc_id(&job_id) {
        return Err(ApiError::bad_request("Invalid job ID"));
    }
    let job_id = JobId::from(job_id);

    let job = state
        .jobs
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let owns = principal.kind == PrincipalKind::Employer
        && principal.id == job.employer_id.as_str();
    if !owns && !principal.is_admin() {
        return Err(ApiError::forbidden(
            "not_owner",
            "Only the posting employer or an admin may list these applications",
        ));
    }

    let applications = state.applications.list_by_job(&job_id).await?;
    Ok(Json(Envelope::data(applications)))
}

/// GET /api/applications/user/:user_id: that candidate or admin.
pub async fn applications_by_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Envelope<Vec<JobApplication>>>> {
    if !principal.is_self_or_admin(&user_id) {
        return Err(ApiError::forbidden(
            "not_owner",
            "You may only view your own applications",
        ));
    }

    let applications = state
        .applications
        .list_by_candidate(&UserId::from(user_id))
        .await?;
    Ok(Json(Envelope::data(applications)))
}

/// GET /api/applications/employer/:employer_id: that employer or admin.
pub async fn applications_by_employer(
    State(state): State<AppState>,
    principal: Principal,
    Path(employer_id): Path<String>,
) -> ApiResult<Json<Envelope<Vec<JobApplication>>>> {
    let is_self = principal.kind == PrincipalKind::Employer && principal.id == employer_id;
    if !is_self && !principal.is_admin() {
        return Err(ApiError::forbidden(
            "not_owner",
            "You may only view applications to your own jobs",
        ));
    }

    let applications = state
        .applications
        .list_by_employer(&EmployerId::from(employer_id))
        .await?;
    Ok(Json(Envelope::data(applications)))
}

/// PUT /api/applications/:id/status: owning employer or admin.
pub async fn update_application_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Envelope<JobApplication>>> {
    let status = ApplicationStatus::parse(&request.status)
        .ok_or_else(|| ApiError::validation(format!("Unknown status '{}'", request.status)))?;

    let application = load_application(&state, &id).await?;

    let owns = principal.kind == PrincipalKind::Employer
        && principal.id == application.employer_id.as_str();
    if !owns && !principal.is_admin() {
        return Err(ApiError::forbidden(
            "not_owner",
            "Only the receiving employer or an admin may update this application",
        ));
    }

    let notes = request.notes.as_deref().map(sanitize_text);
    state
        .applications
        .update_status(&application.id, status, notes.as_deref())
        .await?;

    let updated = load_application(&state, &id).await?;

    info!(application_id = %updated.id, status = %status, "Application status updated");

    Ok(Json(Envelope::with_message(
        "Application status updated successfully",
        updated,
    )))
}

/// DELETE /api/applications/:id: applicant or admin.
///
/// Decrements the parent job's application counter (never below zero).
pub async fn delete_application(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    let application = load_application(&state, &id).await?;

    let is_applicant = principal.kind == PrincipalKind::User
        && principal.id == application.candidate_id.as_str();
    if !is_applicant && !principal.is_admin() {
        return Err(ApiError::forbidden(
            "not_owner",
            "Only the applicant or an admin may delete this application",
        ));
    }

    state.applications.delete(&application.id).await?;

    if let Err(e) = state
        .jobs
        .adjust_application_count(&application.job_id, -1)
        .await
    {
        warn!(job_id = %application.job_id, error = %e, "Failed to decrement application counter");
    }

    info!(application_id = %application.id, "Application deleted");

    Ok(Json(Envelope::message("Application deleted successfully")))
}

// ============================================================================
// Helpers
// ============================================================================

async fn load_application(state: &AppState, id: &str) -> ApiResult<JobApplication> {
    if !is_valid_doc_id(id) {
        return Err(ApiError::bad_request("Invalid application ID"));
    }
    state
        .applications
        .get(&ApplicationId::from(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Application not found"))
}

fn ensure_can_view(principal: &Principal, application: &JobApplication) -> ApiResult<()> {
    let is_applicant = principal.kind == PrincipalKind::User
        && principal.id == application.candidate_id.as_str();
    let is_employer = principal.kind == PrincipalKind::Employer
        && principal.id == application.employer_id.as_str();

    if is_applicant || is_employer || principal.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "not_owner",
            "You are not a party to this application",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> JobApplication {
        JobApplication::new(
            JobId::from("job-1"),
            UserId::from("user-1"),
            EmployerId::from("emp-1"),
            "resumes/user-1/cv.pdf",
            None,
        )
    }

    fn principal(kind: PrincipalKind, role: Role, id: &str) -> Principal {
        Principal {
            id: id.to_string(),
            kind,
            role,
            is_active: true,
            is_verified: None,
            token: String::new(),
        }
    }

    #[test]
    fn test_view_access() {
        let app = application();

        let applicant = principal(PrincipalKind::User, Role::Candidate, "user-1");
        let other_user = principal(PrincipalKind::User, Role::Candidate, "user-2");
        let employer = principal(PrincipalKind::Employer, Role::Employer, "emp-1");
        let other_employer = principal(PrincipalKind::Employer, Role::Employer, "emp-2");
        let admin = principal(PrincipalKind::User, Role::Admin, "admin-1");

        assert!(ensure_can_view(&applicant, &app).is_ok());
        assert!(ensure_can_view(&employer, &app).is_ok());
        assert!(ensure_can_view(&admin, &app).is_ok());
        assert!(ensure_can_view(&other_user, &app).is_err());
        assert!(ensure_can_view(&other_employer, &app).is_err());
    }

    #[test]
    fn test_candidate_id_is_not_confused_with_employer() {
        // Same raw id in the wrong kind must not grant access.
        let app = application();
        let impostor = principal(PrincipalKind::User, Role::Candidate, "emp-1");
        assert!(ensure_can_view(&impostor, &app).is_err());
    }
}
