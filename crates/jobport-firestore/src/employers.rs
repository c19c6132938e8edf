//! Typed repository for the employers collection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use jobport_models::{EmployerId, EmployerProfile};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, Filter, FromFirestoreValue, StructuredQuery, ToFirestoreValue, Value};

const COLLECTION: &str = "employers";

/// Repository for employer account documents.
pub struct EmployerRepository {
    client: FirestoreClient,
}

impl EmployerRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, employer: &EmployerProfile) -> FirestoreResult<()> {
        let fields = employer_to_fields(employer);
        self.client
            .create_document(COLLECTION, employer.id.as_str(), fields)
            .await?;
        info!("Created employer record: {}", employer.id);
        Ok(())
    }

    pub async fn get(&self, id: &EmployerId) -> FirestoreResult<Option<EmployerProfile>> {
        let doc = self.client.get_document(COLLECTION, id.as_str()).await?;
        doc.map(|d| document_to_employer(&d)).transpose()
    }

    /// Look up an employer by (lowercased) email.
    pub async fn find_by_email(&self, email: &str) -> FirestoreResult<Option<EmployerProfile>> {
        let query = StructuredQuery::collection(COLLECTION)
            .with_filter(Filter::eq(
                "email",
                Value::StringValue(email.to_lowercase()),
            ))
            .with_limit(1);

        let docs = self.client.run_query(query).await?;
        docs.first().map(document_to_employer).transpose()
    }

    /// Patch a subset of fields, always bumping `updated_at`.
    pub async fn update_fields(
        &self,
        id: &EmployerId,
        mut fields: HashMap<String, Value>,
    ) -> FirestoreResult<()> {
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        let mask: Vec<String> = fields.keys().cloned().collect();
        self.client
            .update_document(COLLECTION, id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }

    /// Set the admin-controlled verification flag.
    pub async fn set_verified(&self, id: &EmployerId, is_verified: bool) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("is_verified".to_string(), is_verified.to_firestore_value());
        self.update_fields(id, fields).await
    }

    /// Flip the suspension flag.
    pub async fn set_active(&self, id: &EmployerId, is_active: bool) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("is_active".to_string(), is_active.to_firestore_value());
        self.update_fields(id, fields).await
    }

    /// Record the object-storage key of an uploaded company logo.
    pub async fn set_logo_key(&self, id: &EmployerId, key: &str) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("logo_key".to_string(), key.to_firestore_value());
        self.update_fields(id, fields).await
    }

    pub async fn delete(&self, id: &EmployerId) -> FirestoreResult<()> {
        self.client.delete_document(COLLECTION, id.as_str()).await?;
        info!("Deleted employer record: {}", id);
        Ok(())
    }

    /// List employers, newest first.
    pub async fn list(&self, limit: i32, offset: i32) -> FirestoreResult<Vec<EmployerProfile>> {
        let query = StructuredQuery::collection(COLLECTION)
            .order_by_desc("created_at")
            .with_limit(limit)
            .with_offset(offset);

        let docs = self.client.run_query(query).await?;
        docs.iter().map(document_to_employer).collect()
    }

    /// List verified employers only.
    pub async fn list_verified(&self, limit: i32) -> FirestoreResult<Vec<EmployerProfile>> {
        let query = StructuredQuery::collection(COLLECTION)
            .with_filter(Filter::eq("is_verified", Value::BooleanValue(true)))
            .with_limit(limit);

        let docs = self.client.run_query(query).await?;
        docs.iter().map(document_to_employer).collect()
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

fn employer_to_fields(employer: &EmployerProfile) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), employer.id.as_str().to_firestore_value());
    fields.insert(
        "company_name".to_string(),
        employer.company_name.to_firestore_value(),
    );
    fields.insert("email".to_string(), employer.email.to_firestore_value());
    fields.insert(
        "password_hash".to_string(),
        employer.password_hash.to_firestore_value(),
    );
    fields.insert(
        "contact_phone".to_string(),
        employer.contact_phone.to_firestore_value(),
    );
    fields.insert(
        "is_verified".to_string(),
        employer.is_verified.to_firestore_value(),
    );
    fields.insert(
        "is_active".to_string(),
        employer.is_active.to_firestore_value(),
    );
    fields.insert(
        "created_at".to_string(),
        employer.created_at.to_firestore_value(),
    );
    fields.insert(
        "updated_at".to_string(),
        employer.updated_at.to_firestore_value(),
    );

    if let Some(ref v) = employer.industry {
        fields.insert("industry".to_string(), v.to_firestore_value());
    }
    if let Some(ref v) = employer.company_size {
        fields.insert("company_size".to_string(), v.to_firestore_value());
    }
    if let Some(ref v) = employer.website {
        fields.insert("website".to_string(), v.to_firestore_value());
    }
    if let Some(ref v) = employer.description {
        fields.insert("description".to_string(), v.to_firestore_value());
    }
    if let Some(ref v) = employer.location {
        fields.insert("location".to_string(), v.to_firestore_value());
    }
    if let Some(ref v) = employer.logo_key {
        fields.insert("logo_key".to_string(), v.to_firestore_value());
    }

    fields
}

fn document_to_employer(doc: &Document) -> FirestoreResult<EmployerProfile> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::invalid_response("Employer document has no fields"))?;

    let get_string =
        |key: &str| -> Option<String> { fields.get(key).and_then(|v| String::from_firestore_value(v)) };

    let get_bool = |key: &str, default: bool| -> bool {
        fields
            .get(key)
            .and_then(|v| bool::from_firestore_value(v))
            .unwrap_or(default)
    };

    let get_time = |key: &str| -> Option<DateTime<Utc>> {
        fields.get(key).and_then(|v| DateTime::from_firestore_value(v))
    };

    Ok(EmployerProfile {
        id: EmployerId::from(
            get_string("id")
                .or_else(|| doc.doc_id().map(String::from))
                .unwrap_or_default(),
        ),
        company_name: get_string("company_name").unwrap_or_default(),
        email: get_string("email").unwrap_or_default(),
        password_hash: get_string("password_hash").unwrap_or_default(),
        contact_phone: get_string("contact_phone").unwrap_or_default(),
        industry: get_string("industry"),
        company_size: get_string("company_size"),
        website: get_string("website"),
        description: get_string("description"),
        location: get_string("location"),
        logo_key: get_string("logo_key"),
        is_verified: get_bool("is_verified", false),
        is_active: get_bool("is_active", true),
        created_at: get_time("created_at").unwrap_or_else(Utc::now),
        updated_at: get_time("updated_at").unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employer_field_round_trip() {
        let mut employer =
            EmployerProfile::new("Acme Corp", "jobs@acme.example", "$argon2id$x", "555-0199");
        employer.industry = Some("Manufacturing".to_string());
        employer.is_verified = true;

        let fields = employer_to_fields(&employer);
        let parsed = document_to_employer(&Document::new(fields)).unwrap();

        assert_eq!(parsed.id, employer.id);
        assert_eq!(parsed.company_name, "Acme Corp");
        assert!(parsed.is_verified);
        assert_eq!(parsed.industry.as_deref(), Some("Manufacturing"));
    }

    #[test]
    fn test_missing_verified_defaults_false() {
        let employer = EmployerProfile::new("Acme", "a@b.c", "h", "1");
        let mut fields = employer_to_fields(&employer);
        fields.remove("is_verified");
        let parsed = document_to_employer(&Document::new(fields)).unwrap();
        assert!(!parsed.is_verified);
    }
}
