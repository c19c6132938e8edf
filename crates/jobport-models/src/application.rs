//! Job application models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::employer::EmployerId;
use crate::job::JobId;
use crate::user::UserId;

/// Identifier of an application document.
///
/// Deterministic: `{job_id}_{candidate_id}`. The store's create-conflict on
/// an existing document id is what enforces the one-application-per-
/// (candidate, job) invariant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    /// Derive the id for a (job, candidate) pair.
    pub fn for_pair(job_id: &JobId, candidate_id: &UserId) -> Self {
        Self(format!("{}_{}", job_id.as_str(), candidate_id.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ApplicationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ApplicationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Application review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Submitted,
    Reviewed,
    Shortlisted,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Hired => "hired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            // "pending" appears in legacy records
            "submitted" | "pending" => Some(ApplicationStatus::Submitted),
            "reviewed" => Some(ApplicationStatus::Reviewed),
            "shortlisted" => Some(ApplicationStatus::Shortlisted),
            "rejected" => Some(ApplicationStatus::Rejected),
            "hired" => Some(ApplicationStatus::Hired),
            _ => None,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An application linking a candidate, a job and the job's employer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: ApplicationId,

    pub job_id: JobId,
    pub candidate_id: UserId,
    pub employer_id: EmployerId,

    /// Object-storage key of the submitted resume.
    pub resume_key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,

    #[serde(default)]
    pub status: ApplicationStatus,

    /// Free-text notes from the reviewing employer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobApplication {
    /// Create a new submission for a (job, candidate) pair.
    pub fn new(
        job_id: JobId,
        candidate_id: UserId,
        employer_id: EmployerId,
        resume_key: impl Into<String>,
        cover_letter: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ApplicationId::for_pair(&job_id, &candidate_id),
            job_id,
            candidate_id,
            employer_id,
            resume_key: resume_key.into(),
            cover_letter,
            status: ApplicationStatus::Submitted,
            notes: None,
            submitted_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_id_is_deterministic() {
        let job = JobId::from("job-1");
        let user = UserId::from("user-1");
        let a = ApplicationId::for_pair(&job, &user);
        let b = ApplicationId::for_pair(&job, &user);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "job-1_user-1");
    }

    #[test]
    fn test_status_parse_accepts_legacy_pending() {
        assert_eq!(ApplicationStatus::parse("PENDING"), Some(ApplicationStatus::Submitted));
        assert_eq!(ApplicationStatus::parse("hired"), Some(ApplicationStatus::Hired));
        assert_eq!(ApplicationStatus::parse("archived"), None);
    }

    #[test]
    fn test_new_application_defaults() {
        let app = JobApplication::new(
            JobId::from("job-1"),
            UserId::from("user-1"),
            EmployerId::from("emp-1"),
            "resumes/user-1/cv.pdf",
            None,
        );
        assert_eq!(app.status, ApplicationStatus::Submitted);
        assert!(app.notes.is_none());
        assert_eq!(app.id.as_str(), "job-1_user-1");
    }
}
