//! Typed repository for the users collection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use jobport_models::{Role, UserAccount, UserId};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, Filter, FromFirestoreValue, StructuredQuery, ToFirestoreValue, Value};

const COLLECTION: &str = "users";

/// Repository for user account documents.
pub struct UserRepository {
    client: FirestoreClient,
}

impl UserRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Create a new account. The caller is expected to have checked email
    /// uniqueness first; an id collision still surfaces as `AlreadyExists`.
    pub async fn create(&self, user: &UserAccount) -> FirestoreResult<()> {
        let fields = user_to_fields(user);
        self.client
            .create_document(COLLECTION, user.id.as_str(), fields)
            .await?;
        info!("Created user record: {}", user.id);
        Ok(())
    }

    /// Get an account by id.
    pub async fn get(&self, id: &UserId) -> FirestoreResult<Option<UserAccount>> {
        let doc = self.client.get_document(COLLECTION, id.as_str()).await?;
        doc.map(|d| document_to_user(&d)).transpose()
    }

    /// Look up an account by (lowercased) email.
    pub async fn find_by_email(&self, email: &str) -> FirestoreResult<Option<UserAccount>> {
        let query = StructuredQuery::collection(COLLECTION)
            .with_filter(Filter::eq(
                "email",
                Value::StringValue(email.to_lowercase()),
            ))
            .with_limit(1);

        let docs = self.client.run_query(query).await?;
        docs.first().map(document_to_user).transpose()
    }

    /// Look up the account holding an unexpired reset token.
    pub async fn find_by_reset_token(&self, token: &str) -> FirestoreResult<Option<UserAccount>> {
        let query = StructuredQuery::collection(COLLECTION)
            .with_filter(Filter::eq(
                "reset_token",
                Value::StringValue(token.to_string()),
            ))
            .with_limit(1);

        let docs = self.client.run_query(query).await?;
        let user = docs.first().map(document_to_user).transpose()?;

        // Expiry is enforced here rather than in the query so that a stale
        // token behaves exactly like an unknown one.
        Ok(user.filter(|u| u.reset_token_valid(token, Utc::now())))
    }

    /// Patch a subset of fields, always bumping `updated_at`.
    pub async fn update_fields(
        &self,
        id: &UserId,
        mut fields: HashMap<String, Value>,
    ) -> FirestoreResult<()> {
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        let mask: Vec<String> = fields.keys().cloned().collect();
        self.client
            .update_document(COLLECTION, id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }

    /// Flip the suspension flag.
    pub async fn set_active(&self, id: &UserId, is_active: bool) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("is_active".to_string(), is_active.to_firestore_value());
        self.update_fields(id, fields).await
    }

    /// Store a new password hash and clear any outstanding reset token.
    pub async fn set_password(&self, id: &UserId, password_hash: &str) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(
            "password_hash".to_string(),
            password_hash.to_firestore_value(),
        );
        fields.insert("reset_token".to_string(), Value::NullValue(()));
        fields.insert("reset_token_expires".to_string(), Value::NullValue(()));
        self.update_fields(id, fields).await
    }

    /// Store a password-reset token with its expiry.
    pub async fn set_reset_token(
        &self,
        id: &UserId,
        token: &str,
        expires: DateTime<Utc>,
    ) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("reset_token".to_string(), token.to_firestore_value());
        fields.insert("reset_token_expires".to_string(), expires.to_firestore_value());
        self.update_fields(id, fields).await
    }

    /// Record the object-storage key of an uploaded avatar.
    pub async fn set_avatar_key(&self, id: &UserId, key: &str) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("avatar_key".to_string(), key.to_firestore_value());
        self.update_fields(id, fields).await
    }

    /// Record the object-storage key of an uploaded resume.
    pub async fn set_resume_key(&self, id: &UserId, key: &str) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("resume_key".to_string(), key.to_firestore_value());
        self.update_fields(id, fields).await
    }

    pub async fn delete(&self, id: &UserId) -> FirestoreResult<()> {
        self.client.delete_document(COLLECTION, id.as_str()).await?;
        info!("Deleted user record: {}", id);
        Ok(())
    }

    /// List accounts, newest first.
    pub async fn list(&self, limit: i32, offset: i32) -> FirestoreResult<Vec<UserAccount>> {
        let query = StructuredQuery::collection(COLLECTION)
            .order_by_desc("created_at")
            .with_limit(limit)
            .with_offset(offset);

        let docs = self.client.run_query(query).await?;
        docs.iter().map(document_to_user).collect()
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

fn user_to_fields(user: &UserAccount) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), user.id.as_str().to_firestore_value());
    fields.insert("name".to_string(), user.name.to_firestore_value());
    fields.insert("email".to_string(), user.email.to_firestore_value());
    fields.insert("phone".to_string(), user.phone.to_firestore_value());
    fields.insert(
        "password_hash".to_string(),
        user.password_hash.to_firestore_value(),
    );
    fields.insert("role".to_string(), user.role.as_str().to_firestore_value());
    fields.insert("is_active".to_string(), user.is_active.to_firestore_value());
    fields.insert("skills".to_string(), user.skills.to_firestore_value());
    fields.insert("created_at".to_string(), user.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), user.updated_at.to_firestore_value());

    if let Some(ref key) = user.avatar_key {
        fields.insert("avatar_key".to_string(), key.to_firestore_value());
    }
    if let Some(ref key) = user.resume_key {
        fields.insert("resume_key".to_string(), key.to_firestore_value());
    }
    if let Some(ref title) = user.professional_title {
        fields.insert("professional_title".to_string(), title.to_firestore_value());
    }
    if let Some(ref location) = user.location {
        fields.insert("location".to_string(), location.to_firestore_value());
    }
    if let Some(ref summary) = user.summary {
        fields.insert("summary".to_string(), summary.to_firestore_value());
    }
    if let Some(ref token) = user.reset_token {
        fields.insert("reset_token".to_string(), token.to_firestore_value());
    }
    if let Some(expires) = user.reset_token_expires {
        fields.insert("reset_token_expires".to_string(), expires.to_firestore_value());
    }

    fields
}

fn document_to_user(doc: &Document) -> FirestoreResult<UserAccount> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::invalid_response("User document has no fields"))?;

    let get_string =
        |key: &str| -> Option<String> { fields.get(key).and_then(|v| String::from_firestore_value(v)) };

    let get_time = |key: &str| -> Option<DateTime<Utc>> {
        fields.get(key).and_then(|v| DateTime::from_firestore_value(v))
    };

    Ok(UserAccount {
        id: UserId::from(
            get_string("id")
                .or_else(|| doc.doc_id().map(String::from))
                .unwrap_or_default(),
        ),
        name: get_string("name").unwrap_or_default(),
        email: get_string("email").unwrap_or_default(),
        phone: get_string("phone").unwrap_or_default(),
        password_hash: get_string("password_hash").unwrap_or_default(),
        role: Role::from_str_or_guest(&get_string("role").unwrap_or_default()),
        avatar_key: get_string("avatar_key"),
        resume_key: get_string("resume_key"),
        professional_title: get_string("professional_title"),
        location: get_string("location"),
        skills: fields
            .get("skills")
            .and_then(|v| Vec::<String>::from_firestore_value(v))
            .unwrap_or_default(),
        summary: get_string("summary"),
        is_active: fields
            .get("is_active")
            .and_then(|v| bool::from_firestore_value(v))
            .unwrap_or(true),
        reset_token: get_string("reset_token"),
        reset_token_expires: get_time("reset_token_expires"),
        created_at: get_time("created_at").unwrap_or_else(Utc::now),
        updated_at: get_time("updated_at").unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_field_round_trip() {
        let mut user = UserAccount::new(
            "Ada Lovelace",
            "ada@example.com",
            "555-0100",
            "$argon2id$v=19$m=19456,t=2,p=1$abc$def",
            Role::Candidate,
        );
        user.skills = vec!["rust".to_string(), "sql".to_string()];
        user.location = Some("London".to_string());

        let fields = user_to_fields(&user);
        let doc = Document::new(fields);
        let parsed = document_to_user(&doc).unwrap();

        assert_eq!(parsed.id, user.id);
        assert_eq!(parsed.email, "ada@example.com");
        assert_eq!(parsed.role, Role::Candidate);
        assert_eq!(parsed.skills, user.skills);
        assert_eq!(parsed.location.as_deref(), Some("London"));
        assert_eq!(parsed.password_hash, user.password_hash);
        assert!(parsed.is_active);
    }

    #[test]
    fn test_missing_is_active_defaults_true() {
        let user = UserAccount::new("A", "a@b.c", "1", "h", Role::Admin);
        let mut fields = user_to_fields(&user);
        fields.remove("is_active");
        let parsed = document_to_user(&Document::new(fields)).unwrap();
        assert!(parsed.is_active);
    }

    #[test]
    fn test_document_without_fields_is_invalid() {
        let doc = Document {
            name: None,
            fields: None,
            create_time: None,
            update_time: None,
        };
        assert!(document_to_user(&doc).is_err());
    }
}
