//! Typed repository for the applications collection.
//!
//! Application documents use the deterministic id
//! `{job_id}_{candidate_id}`, so the store's create-conflict is the
//! uniqueness check for the one-application-per-(candidate, job) invariant.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use jobport_models::{
    ApplicationId, ApplicationStatus, EmployerId, JobApplication, JobId, UserId,
};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, Filter, FromFirestoreValue, StructuredQuery, ToFirestoreValue, Value};

const COLLECTION: &str = "applications";

/// Repository for application documents.
pub struct ApplicationRepository {
    client: FirestoreClient,
}

impl ApplicationRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Create a submission. A second submission for the same
    /// (job, candidate) pair fails with `AlreadyExists`.
    pub async fn create(&self, application: &JobApplication) -> FirestoreResult<()> {
        let fields = application_to_fields(application);
        self.client
            .create_document(COLLECTION, application.id.as_str(), fields)
            .await?;
        info!("Created application record: {}", application.id);
        Ok(())
    }

    pub async fn get(&self, id: &ApplicationId) -> FirestoreResult<Option<JobApplication>> {
        let doc = self.client.get_document(COLLECTION, id.as_str()).await?;
        doc.map(|d| document_to_application(&d)).transpose()
    }

    /// The application of one candidate for one job, if any.
    pub async fn find_for_pair(
        &self,
        job_id: &JobId,
        candidate_id: &UserId,
    ) -> FirestoreResult<Option<JobApplication>> {
        self.get(&ApplicationId::for_pair(job_id, candidate_id)).await
    }

    pub async fn list_by_job(&self, job_id: &JobId) -> FirestoreResult<Vec<JobApplication>> {
        self.list_filtered(Filter::eq(
            "job_id",
            Value::StringValue(job_id.as_str().to_string()),
        ))
        .await
    }

    pub async fn list_by_candidate(
        &self,
        candidate_id: &UserId,
    ) -> FirestoreResult<Vec<JobApplication>> {
        self.list_filtered(Filter::eq(
            "candidate_id",
            Value::StringValue(candidate_id.as_str().to_string()),
        ))
        .await
    }

    pub async fn list_by_employer(
        &self,
        employer_id: &EmployerId,
    ) -> FirestoreResult<Vec<JobApplication>> {
        self.list_filtered(Filter::eq(
            "employer_id",
            Value::StringValue(employer_id.as_str().to_string()),
        ))
        .await
    }

    async fn list_filtered(&self, filter: Filter) -> FirestoreResult<Vec<JobApplication>> {
        let query = StructuredQuery::collection(COLLECTION)
            .with_filter(filter)
            .order_by_desc("submitted_at")
            .with_limit(500);

        let docs = self.client.run_query(query).await?;
        docs.iter().map(document_to_application).collect()
    }

    /// List all applications, newest first.
    pub async fn list(&self, limit: i32, offset: i32) -> FirestoreResult<Vec<JobApplication>> {
        let query = StructuredQuery::collection(COLLECTION)
            .order_by_desc("submitted_at")
            .with_limit(limit)
            .with_offset(offset);

        let docs = self.client.run_query(query).await?;
        docs.iter().map(document_to_application).collect()
    }

    /// Update review status and optional notes.
    pub async fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
        notes: Option<&str>,
    ) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), status.as_str().to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        if let Some(notes) = notes {
            fields.insert("notes".to_string(), notes.to_firestore_value());
        }

        let mask: Vec<String> = fields.keys().cloned().collect();
        self.client
            .update_document(COLLECTION, id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &ApplicationId) -> FirestoreResult<()> {
        self.client.delete_document(COLLECTION, id.as_str()).await?;
        info!("Deleted application record: {}", id);
        Ok(())
    }

    pub async fn count(&self) -> FirestoreResult<u64> {
        self.client
            .count_documents(StructuredQuery::collection(COLLECTION))
            .await
    }
}

// ============================================================================
// Field conversion
// ============================================================================

fn application_to_fields(application: &JobApplication) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), application.id.as_str().to_firestore_value());
    fields.insert(
        "job_id".to_string(),
        application.job_id.as_str().to_firestore_value(),
    );
    fields.insert(
        "candidate_id".to_string(),
        application.candidate_id.as_str().to_firestore_value(),
    );
    fields.insert(
        "employer_id".to_string(),
        application.employer_id.as_str().to_firestore_value(),
    );
    fields.insert(
        "resume_key".to_string(),
        application.resume_key.to_firestore_value(),
    );
    fields.insert(
        "status".to_string(),
        application.status.as_str().to_firestore_value(),
    );
    fields.insert(
        "submitted_at".to_string(),
        application.submitted_at.to_firestore_value(),
    );
    fields.insert(
        "updated_at".to_string(),
        application.updated_at.to_firestore_value(),
    );

    if let Some(ref v) = application.cover_letter {
        fields.insert("cover_letter".to_string(), v.to_firestore_value());
    }
    if let Some(ref v) = application.notes {
        fields.insert("notes".to_string(), v.to_firestore_value());
    }

    fields
}

fn document_to_application(doc: &Document) -> FirestoreResult<JobApplication> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::invalid_response("Application document has no fields"))?;

    let get_string =
        |key: &str| -> Option<String> { fields.get(key).and_then(|v| String::from_firestore_value(v)) };

    let get_time = |key: &str| -> Option<DateTime<Utc>> {
        fields.get(key).and_then(|v| DateTime::from_firestore_value(v))
    };

    Ok(JobApplication {
        id: ApplicationId::from(
            get_string("id")
                .or_else(|| doc.doc_id().map(String::from))
                .unwrap_or_default(),
        ),
        job_id: JobId::from(get_string("job_id").unwrap_or_default()),
        candidate_id: UserId::from(get_string("candidate_id").unwrap_or_default()),
        employer_id: EmployerId::from(get_string("employer_id").unwrap_or_default()),
        resume_key: get_string("resume_key").unwrap_or_default(),
        cover_letter: get_string("cover_letter"),
        status: ApplicationStatus::parse(&get_string("status").unwrap_or_default())
            .unwrap_or_default(),
        notes: get_string("notes"),
        submitted_at: get_time("submitted_at").unwrap_or_else(Utc::now),
        updated_at: get_time("updated_at").unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_field_round_trip() {
        let app = JobApplication::new(
            JobId::from("job-1"),
            UserId::from("user-1"),
            EmployerId::from("emp-1"),
            "resumes/user-1/cv.pdf",
            Some("Dear team".to_string()),
        );

        let parsed =
            document_to_application(&Document::new(application_to_fields(&app))).unwrap();

        assert_eq!(parsed.id, app.id);
        assert_eq!(parsed.job_id.as_str(), "job-1");
        assert_eq!(parsed.status, ApplicationStatus::Submitted);
        assert_eq!(parsed.cover_letter.as_deref(), Some("Dear team"));
    }

    #[test]
    fn test_legacy_status_parses() {
        let app = JobApplication::new(
            JobId::from("job-1"),
            UserId::from("user-1"),
            EmployerId::from("emp-1"),
            "resumes/user-1/cv.pdf",
            None,
        );
        let mut fields = application_to_fields(&app);
        fields.insert("status".to_string(), "PENDING".to_firestore_value());
        let parsed = document_to_application(&Document::new(fields)).unwrap();
        assert_eq!(parsed.status, ApplicationStatus::Submitted);
    }
}
