//! Job posting models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::employer::EmployerId;

/// Unique identifier for a job posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobCategory {
    Technology,
    Healthcare,
    Finance,
    Education,
    Marketing,
    Sales,
    Engineering,
    #[default]
    Other,
}

impl JobCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobCategory::Technology => "technology",
            JobCategory::Healthcare => "healthcare",
            JobCategory::Finance => "finance",
            JobCategory::Education => "education",
            JobCategory::Marketing => "marketing",
            JobCategory::Sales => "sales",
            JobCategory::Engineering => "engineering",
            JobCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "technology" => Some(JobCategory::Technology),
            "healthcare" => Some(JobCategory::Healthcare),
            "finance" => Some(JobCategory::Finance),
            "education" => Some(JobCategory::Education),
            "marketing" => Some(JobCategory::Marketing),
            "sales" => Some(JobCategory::Sales),
            "engineering" => Some(JobCategory::Engineering),
            "other" => Some(JobCategory::Other),
            _ => None,
        }
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Employment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Internship,
    Remote,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "full_time",
            JobType::PartTime => "part_time",
            JobType::Contract => "contract",
            JobType::Internship => "internship",
            JobType::Remote => "remote",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "full_time" | "fulltime" => Some(JobType::FullTime),
            "part_time" | "parttime" => Some(JobType::PartTime),
            "contract" => Some(JobType::Contract),
            "internship" => Some(JobType::Internship),
            "remote" => Some(JobType::Remote),
            _ => None,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A job posting stored in the jobs collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,

    pub title: String,
    pub description: String,

    /// Display name of the hiring company.
    pub company: String,

    pub category: JobCategory,
    pub job_type: JobType,
    pub location: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,

    #[serde(default)]
    pub requirements: Vec<String>,

    #[serde(default)]
    pub responsibilities: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Applications past this instant are rejected.
    pub deadline: DateTime<Utc>,

    pub employer_id: EmployerId,

    /// Incremented on every detail fetch.
    #[serde(default)]
    pub views: u64,

    /// Maintained by application submit/delete.
    #[serde(default)]
    pub application_count: u64,

    #[serde(default = "default_true")]
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl JobPosting {
    /// Whether the application window is still open at `now`.
    pub fn accepts_applications(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now <= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job(deadline: DateTime<Utc>) -> JobPosting {
        let now = Utc::now();
        JobPosting {
            id: JobId::new(),
            title: "Backend Engineer".to_string(),
            description: "Build things".to_string(),
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
            deadline,
            employer_id: EmployerId::new(),
            views: 0,
            application_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_job_type_parses_legacy_forms() {
        assert_eq!(JobType::parse("Full-time"), Some(JobType::FullTime));
        assert_eq!(JobType::parse("part_time"), Some(JobType::PartTime));
        assert_eq!(JobType::parse("REMOTE"), Some(JobType::Remote));
        assert_eq!(JobType::parse("freelance"), None);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(JobCategory::parse("Technology"), Some(JobCategory::Technology));
        assert_eq!(JobCategory::parse("unknown"), None);
    }

    #[test]
    fn test_deadline_gates_applications() {
        let now = Utc::now();
        let open = sample_job(now + chrono::Duration::days(7));
        assert!(open.accepts_applications(now));

        let closed = sample_job(now - chrono::Duration::days(1));
        assert!(!closed.accepts_applications(now));

        let mut inactive = sample_job(now + chrono::Duration::days(7));
        inactive.is_active = false;
        assert!(!inactive.accepts_applications(now));
    }
}
