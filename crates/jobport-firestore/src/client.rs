//! Firestore REST API client.
//!
//! Production concerns handled here:
//! - Token caching with refresh margin (see [`crate::token_cache`])
//! - HTTP client tuning (pooling, timeouts)
//! - Re-authentication on mid-flight access token expiry
//! - Observability (tracing spans, metrics)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_request;
use crate::retry::RetryConfig;
use crate::token_cache::TokenCache;
use crate::types::{Document, RunQueryRequest, RunQueryResponse, StructuredQuery, Value};

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID").map_err(|_| {
            FirestoreError::auth_error("GCP_PROJECT_ID must be set to access Firestore")
        })?;

        if project_id.is_empty() {
            return Err(FirestoreError::auth_error("GCP_PROJECT_ID cannot be empty"));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }
}

/// Firestore REST API client.
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    token_cache: Arc<TokenCache>,
}

impl Clone for FirestoreClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
            base_url: self.base_url.clone(),
            token_cache: Arc::clone(&self.token_cache),
        }
    }
}

impl FirestoreClient {
    /// Create a new Firestore client.
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let auth = Self::create_auth_provider()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("jobport-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
            config.project_id, config.database_id
        );

        Ok(Self {
            http,
            config,
            base_url,
            token_cache: Arc::new(TokenCache::new(auth)),
        })
    }

    fn create_auth_provider() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            FirestoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> FirestoreResult<Self> {
        let config = FirestoreConfig::from_env()?;
        Self::new(config).await
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    /// Send a request with a bearer token, re-authenticating once if the
    /// cached access token expired while in flight.
    async fn send_authorized<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> FirestoreResult<Response> {
        let mut token = self.token_cache.get_token().await?;

        for attempt in 0..2 {
            let mut request = self.http.request(method.clone(), url).bearer_auth(&token);
            if let Some(b) = body {
                request = request.json(b);
            }

            let response = request.send().await?;

            if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                let text = response.text().await.unwrap_or_default();
                if Self::is_access_token_expired(&text) {
                    self.token_cache.invalidate().await;
                    token = self.token_cache.get_token().await?;
                    continue;
                }
                return Err(FirestoreError::from_http_status(
                    401,
                    format!("{} failed: {}", url, text),
                ));
            }

            return Ok(response);
        }

        Err(FirestoreError::auth_error(format!(
            "{} failed: access token rejected after refresh",
            url
        )))
    }

    // =========================================================================
    // CRUD operations
    // =========================================================================

    /// Get a document. `Ok(None)` when it does not exist.
    ///
    /// Reads are idempotent and retried on transient failures; writes are
    /// not, so a caller never observes a double-applied mutation.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), async {
            crate::retry::with_retry(&self.config.retry, "get_document", || async {
                let response = self.send_authorized::<()>(Method::GET, &url, None).await?;
                match response.status() {
                    StatusCode::OK => Ok(Some(response.json().await?)),
                    StatusCode::NOT_FOUND => Ok(None),
                    status => Err(Self::error_from_response(status, &url, response).await),
                }
            })
            .await
        })
        .await
    }

    /// Create a document; conflicts with an existing id become
    /// [`FirestoreError::AlreadyExists`].
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!("{}/{}?documentId={}", self.base_url, collection, doc_id);
        let body = Document::new(fields);

        self.execute_request("create_document", collection, Some(doc_id), async {
            let response = self.send_authorized(Method::POST, &url, Some(&body)).await?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Merge-update a document, optionally restricted to an update mask.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Option<Vec<String>>,
    ) -> FirestoreResult<Document> {
        let mut url = self.document_path(collection, doc_id);
        if let Some(mask) = update_mask {
            let params: Vec<String> = mask
                .iter()
                .map(|f| format!("updateMask.fieldPaths={}", f))
                .collect();
            url = format!("{}?{}", url, params.join("&"));
        }

        let body = Document::new(fields);

        self.execute_request("update_document", collection, Some(doc_id), async {
            let response = self.send_authorized(Method::PATCH, &url, Some(&body)).await?;
            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                StatusCode::NOT_FOUND => {
                    Err(FirestoreError::not_found(format!("{}/{}", collection, doc_id)))
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Merge-update guarded by the document's current `updateTime`.
    ///
    /// The optimistic-concurrency primitive behind counter updates: the
    /// write only lands if nobody else has written since `update_time` was
    /// read, otherwise [`FirestoreError::PreconditionFailed`] is returned
    /// and the caller re-reads and retries.
    pub async fn update_document_with_precondition(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Option<Vec<String>>,
        update_time: Option<&str>,
    ) -> FirestoreResult<Document> {
        let mut params: Vec<String> = Vec::new();
        if let Some(mask) = update_mask {
            params.extend(mask.iter().map(|f| format!("updateMask.fieldPaths={}", f)));
        }
        if let Some(ts) = update_time {
            params.push(format!(
                "currentDocument.updateTime={}",
                urlencoding::encode(ts)
            ));
        }

        let mut url = self.document_path(collection, doc_id);
        if !params.is_empty() {
            url = format!("{}?{}", url, params.join("&"));
        }

        let body = Document::new(fields);

        self.execute_request("update_document_precondition", collection, Some(doc_id), async {
            let response = self.send_authorized(Method::PATCH, &url, Some(&body)).await?;
            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => {
                    let text = response.text().await.unwrap_or_default();
                    Err(FirestoreError::PreconditionFailed(text))
                }
                StatusCode::NOT_FOUND => {
                    Err(FirestoreError::not_found(format!("{}/{}", collection, doc_id)))
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Delete a document. Deleting a missing document is idempotent.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()> {
        let url = self.document_path(collection, doc_id);

        self.execute_request("delete_document", collection, Some(doc_id), async {
            let response = self.send_authorized::<()>(Method::DELETE, &url, None).await?;
            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!("Document {}/{} already deleted", collection, doc_id);
                    Ok(())
                }
                status => Err(Self::error_from_response(status, &url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Run a structured query over a top-level collection.
    ///
    /// Queries are reads and follow the same retry policy as
    /// [`Self::get_document`].
    pub async fn run_query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.base_url);
        let collection = query
            .from
            .first()
            .map(|s| s.collection_id.clone())
            .unwrap_or_default();
        let request = RunQueryRequest {
            structured_query: query,
        };

        self.execute_request("run_query", &collection, None, async {
            crate::retry::with_retry(&self.config.retry, "run_query", || async {
                let response = self.send_authorized(Method::POST, &url, Some(&request)).await?;
                match response.status() {
                    StatusCode::OK => {
                        let body = response.text().await.unwrap_or_default();
                        // runQuery returns a JSON array of response elements
                        let responses: Vec<RunQueryResponse> =
                            serde_json::from_str(&body).map_err(|e| {
                                FirestoreError::invalid_response(format!(
                                    "Failed to parse runQuery response: {} (body prefix: {})",
                                    e,
                                    &body[..body.len().min(200)]
                                ))
                            })?;

                        Ok(responses.into_iter().filter_map(|r| r.document).collect())
                    }
                    status => Err(Self::error_from_response(status, &url, response).await),
                }
            })
            .await
        })
        .await
    }

    /// Count documents matching a query.
    ///
    /// Runs the query projected to document names only; the count is the
    /// number of results, so callers should bound large collections with a
    /// limit where an exact total is not required.
    pub async fn count_documents(&self, query: StructuredQuery) -> FirestoreResult<u64> {
        let docs = self.run_query(query.names_only()).await?;
        Ok(docs.len() as u64)
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    /// Wrap a request future with a tracing span and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = if let Some(id) = doc_id {
            info_span!("firestore_request", operation = %operation, collection = %collection, doc_id = %id)
        } else {
            info_span!("firestore_request", operation = %operation, collection = %collection)
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn error_from_response(
        status: StatusCode,
        url: &str,
        response: Response,
    ) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_from_env_requires_project_id() {
        std::env::remove_var("GCP_PROJECT_ID");
        assert!(FirestoreConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_config_default_values() {
        std::env::set_var("GCP_PROJECT_ID", "test-project");
        std::env::remove_var("FIRESTORE_CONNECT_TIMEOUT_SECS");
        let config = FirestoreConfig::from_env().unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.database_id, "(default)");
        std::env::remove_var("GCP_PROJECT_ID");
    }

    #[test]
    fn test_access_token_expiry_detection() {
        assert!(FirestoreClient::is_access_token_expired(
            r#"{"error":{"status":"UNAUTHENTICATED"}}"#
        ));
        assert!(FirestoreClient::is_access_token_expired("ACCESS_TOKEN_EXPIRED"));
        assert!(!FirestoreClient::is_access_token_expired("PERMISSION_DENIED"));
    }
}
