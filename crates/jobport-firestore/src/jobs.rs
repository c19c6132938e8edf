//! Typed repository for the jobs collection.
//!
//! Counter fields (`views`, `application_count`) are updated through an
//! optimistic-concurrency loop: read the document with its `updateTime`,
//! write the new value guarded by that time, and retry on a lost race.
//! Lost updates under concurrent traffic are therefore impossible; the
//! loop only gives up after several consecutive losses.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use jobport_models::{EmployerId, JobCategory, JobId, JobPosting, JobType};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_counter_conflict;
use crate::types::{Document, Filter, FromFirestoreValue, StructuredQuery, ToFirestoreValue, Value};

const COLLECTION: &str = "jobs";

/// Maximum retries for optimistic counter updates.
const MAX_COUNTER_RETRIES: u32 = 5;

/// Base delay between counter retries (milliseconds, scales linearly).
const COUNTER_RETRY_BASE_MS: u64 = 50;

/// Exact-match filters for job queries; substring matching on text fields
/// happens in the API layer over the fetched page.
#[derive(Debug, Clone, Default)]
pub struct JobQueryFilters {
    pub category: Option<JobCategory>,
    pub job_type: Option<JobType>,
    pub employer_id: Option<EmployerId>,
    /// `None` means no is_active constraint (admin views).
    pub is_active: Option<bool>,
}

/// Repository for job posting documents.
pub struct JobRepository {
    client: FirestoreClient,
}

impl JobRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, job: &JobPosting) -> FirestoreResult<()> {
        let fields = job_to_fields(job);
        self.client
            .create_document(COLLECTION, job.id.as_str(), fields)
            .await?;
        info!("Created job record: {}", job.id);
        Ok(())
    }

    pub async fn get(&self, id: &JobId) -> FirestoreResult<Option<JobPosting>> {
        let doc = self.client.get_document(COLLECTION, id.as_str()).await?;
        doc.map(|d| document_to_job(&d)).transpose()
    }

    /// Patch a subset of fields, always bumping `updated_at`.
    pub async fn update_fields(
        &self,
        id: &JobId,
        mut fields: HashMap<String, Value>,
    ) -> FirestoreResult<()> {
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        let mask: Vec<String> = fields.keys().cloned().collect();
        self.client
            .update_document(COLLECTION, id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }

    /// Soft delete: deactivate without removing the document.
    pub async fn set_active(&self, id: &JobId, is_active: bool) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("is_active".to_string(), is_active.to_firestore_value());
        self.update_fields(id, fields).await
    }

    pub async fn delete(&self, id: &JobId) -> FirestoreResult<()> {
        self.client.delete_document(COLLECTION, id.as_str()).await?;
        info!("Deleted job record: {}", id);
        Ok(())
    }

    /// Query jobs with exact-match filters, newest first.
    pub async fn query(
        &self,
        filters: &JobQueryFilters,
        limit: i32,
        offset: i32,
    ) -> FirestoreResult<Vec<JobPosting>> {
        let mut parts = Vec::new();
        if let Some(active) = filters.is_active {
            parts.push(Filter::eq("is_active", Value::BooleanValue(active)));
        }
        if let Some(category) = filters.category {
            parts.push(Filter::eq(
                "category",
                Value::StringValue(category.as_str().to_string()),
            ));
        }
        if let Some(job_type) = filters.job_type {
            parts.push(Filter::eq(
                "job_type",
                Value::StringValue(job_type.as_str().to_string()),
            ));
        }
        if let Some(ref employer_id) = filters.employer_id {
            parts.push(Filter::eq(
                "employer_id",
                Value::StringValue(employer_id.as_str().to_string()),
            ));
        }

        let mut query = StructuredQuery::collection(COLLECTION)
            .order_by_desc("created_at")
            .with_limit(limit)
            .with_offset(offset);
        if !parts.is_empty() {
            query = query.with_filter(Filter::and(parts));
        }

        let docs = self.client.run_query(query).await?;
        docs.iter().map(document_to_job).collect()
    }

    /// Jobs belonging to one employer, regardless of active flag.
    pub async fn list_by_employer(
        &self,
        employer_id: &EmployerId,
    ) -> FirestoreResult<Vec<JobPosting>> {
        let filters = JobQueryFilters {
            employer_id: Some(employer_id.clone()),
            ..Default::default()
        };
        self.query(&filters, 500, 0).await
    }

    /// Number of active jobs posted by an employer.
    pub async fn count_active_by_employer(&self, employer_id: &EmployerId) -> FirestoreResult<u64> {
        let query = StructuredQuery::collection(COLLECTION).with_filter(Filter::and(vec![
            Filter::eq(
                "employer_id",
                Value::StringValue(employer_id.as_str().to_string()),
            ),
            Filter::eq("is_active", Value::BooleanValue(true)),
        ]));
        self.client.count_documents(query).await
    }

    pub async fn count(&self) -> FirestoreResult<u64> {
        self.client
            .count_documents(StructuredQuery::collection(COLLECTION))
            .await
    }

    // =========================================================================
    // Counters
    // =========================================================================

    /// Atomically add one to the view counter. Returns the new value.
    pub async fn increment_views(&self, id: &JobId) -> FirestoreResult<u64> {
        self.adjust_counter(id, "views", 1).await
    }

    /// Atomically adjust the application counter. Negative deltas saturate
    /// at zero. Returns the new value.
    pub async fn adjust_application_count(&self, id: &JobId, delta: i64) -> FirestoreResult<u64> {
        self.adjust_counter(id, "application_count", delta).await
    }

    /// Compare-and-swap loop over the document's `updateTime`.
    async fn adjust_counter(&self, id: &JobId, field: &str, delta: i64) -> FirestoreResult<u64> {
        let mut last_error = None;

        for attempt in 0..MAX_COUNTER_RETRIES {
            let doc = self
                .client
                .get_document(COLLECTION, id.as_str())
                .await?
                .ok_or_else(|| FirestoreError::not_found(format!("jobs/{}", id)))?;

            let current = doc
                .field(field)
                .and_then(u64::from_firestore_value)
                .unwrap_or(0);

            let next = if delta >= 0 {
                current.saturating_add(delta as u64)
            } else {
                current.saturating_sub(delta.unsigned_abs())
            };

            let mut fields = HashMap::new();
            fields.insert(field.to_string(), next.to_firestore_value());
            fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

            match self
                .client
                .update_document_with_precondition(
                    COLLECTION,
                    id.as_str(),
                    fields,
                    Some(vec![field.to_string(), "updated_at".to_string()]),
                    doc.update_time.as_deref(),
                )
                .await
            {
                Ok(_) => return Ok(next),
                Err(e) if e.is_precondition_failed() => {
                    debug!(
                        job_id = %id,
                        field = field,
                        attempt = attempt + 1,
                        "Counter update lost the race, retrying"
                    );
                    record_counter_conflict(COLLECTION);
                    last_error = Some(e);
                    let delay =
                        Duration::from_millis(COUNTER_RETRY_BASE_MS * (attempt as u64 + 1));
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            job_id = %id,
            field = field,
            retries = MAX_COUNTER_RETRIES,
            error = ?last_error,
            "Counter update failed after retries"
        );
        Err(FirestoreError::request_failed(format!(
            "Failed to update {} after {} concurrent attempts",
            field, MAX_COUNTER_RETRIES
        )))
    }
}

// ============================================================================
// Field conversion
// ============================================================================

fn job_to_fields(job: &JobPosting) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), job.id.as_str().to_firestore_value());
    fields.insert("title".to_string(), job.title.to_firestore_value());
    fields.insert("description".to_string(), job.description.to_firestore_value());
    fields.insert("company".to_string(), job.company.to_firestore_value());
    fields.insert("category".to_string(), job.category.as_str().to_firestore_value());
    fields.insert("job_type".to_string(), job.job_type.as_str().to_firestore_value());
    fields.insert("location".to_string(), job.location.to_firestore_value());
    fields.insert("requirements".to_string(), job.requirements.to_firestore_value());
    fields.insert(
        "responsibilities".to_string(),
        job.responsibilities.to_firestore_value(),
    );
    fields.insert("tags".to_string(), job.tags.to_firestore_value());
    fields.insert("deadline".to_string(), job.deadline.to_firestore_value());
    fields.insert(
        "employer_id".to_string(),
        job.employer_id.as_str().to_firestore_value(),
    );
    fields.insert("views".to_string(), job.views.to_firestore_value());
    fields.insert(
        "application_count".to_string(),
        job.application_count.to_firestore_value(),
    );
    fields.insert("is_active".to_string(), job.is_active.to_firestore_value());
    fields.insert("created_at".to_string(), job.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), job.updated_at.to_firestore_value());

    if let Some(ref v) = job.salary {
        fields.insert("salary".to_string(), v.to_firestore_value());
    }
    if let Some(ref v) = job.experience {
        fields.insert("experience".to_string(), v.to_firestore_value());
    }
    if let Some(ref v) = job.education {
        fields.insert("education".to_string(), v.to_firestore_value());
    }

    fields
}

fn document_to_job(doc: &Document) -> FirestoreResult<JobPosting> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::invalid_response("Job document has no fields"))?;

    let get_string =
        |key: &str| -> Option<String> { fields.get(key).and_then(|v| String::from_firestore_value(v)) };

    let get_u64 = |key: &str| -> u64 {
        fields
            .get(key)
            .and_then(|v| u64::from_firestore_value(v))
            .unwrap_or(0)
    };

    let get_list = |key: &str| -> Vec<String> {
        fields
            .get(key)
            .and_then(|v| Vec::<String>::from_firestore_value(v))
            .unwrap_or_default()
    };

    let get_time = |key: &str| -> Option<DateTime<Utc>> {
        fields.get(key).and_then(|v| DateTime::from_firestore_value(v))
    };

    Ok(JobPosting {
        id: JobId::from(
            get_string("id")
                .or_else(|| doc.doc_id().map(String::from))
                .unwrap_or_default(),
        ),
        title: get_string("title").unwrap_or_default(),
        description: get_string("description").unwrap_or_default(),
        company: get_string("company").unwrap_or_default(),
        category: JobCategory::parse(&get_string("category").unwrap_or_default())
            .unwrap_or_default(),
        job_type: JobType::parse(&get_string("job_type").unwrap_or_default()).unwrap_or_default(),
        location: get_string("location").unwrap_or_default(),
        salary: get_string("salary"),
        experience: get_string("experience"),
        education: get_string("education"),
        requirements: get_list("requirements"),
        responsibilities: get_list("responsibilities"),
        tags: get_list("tags"),
        deadline: get_time("deadline").unwrap_or_else(Utc::now),
        employer_id: EmployerId::from(get_string("employer_id").unwrap_or_default()),
        views: get_u64("views"),
        application_count: get_u64("application_count"),
        is_active: fields
            .get("is_active")
            .and_then(|v| bool::from_firestore_value(v))
            .unwrap_or(true),
        created_at: get_time("created_at").unwrap_or_else(Utc::now),
        updated_at: get_time("updated_at").unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> JobPosting {
        let now = Utc::now();
        JobPosting {
            id: JobId::new(),
            title: "Platform Engineer".to_string(),
            description: "Own the deploy pipeline".to_string(),
            company: "Acme".to_string(),
            category: JobCategory::Engineering,
            job_type: JobType::Remote,
            location: "Berlin".to_string(),
            salary: Some("90-110k".to_string()),
            experience: None,
            education: None,
            requirements: vec!["rust".to_string()],
            responsibilities: vec!["ci/cd".to_string()],
            tags: vec!["infra".to_string()],
            deadline: now + chrono::Duration::days(30),
            employer_id: EmployerId::new(),
            views: 7,
            application_count: 2,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_job_field_round_trip() {
        let job = sample_job();
        let parsed = document_to_job(&Document::new(job_to_fields(&job))).unwrap();

        assert_eq!(parsed.id, job.id);
        assert_eq!(parsed.category, JobCategory::Engineering);
        assert_eq!(parsed.job_type, JobType::Remote);
        assert_eq!(parsed.views, 7);
        assert_eq!(parsed.application_count, 2);
        assert_eq!(parsed.requirements, job.requirements);
        assert_eq!(parsed.deadline.timestamp(), job.deadline.timestamp());
    }

    #[test]
    fn test_counters_default_to_zero() {
        let job = sample_job();
        let mut fields = job_to_fields(&job);
        fields.remove("views");
        fields.remove("application_count");
        let parsed = document_to_job(&Document::new(fields)).unwrap();
        assert_eq!(parsed.views, 0);
        assert_eq!(parsed.application_count, 0);
    }
}
