//! Firestore error types.

use thiserror::Error;

/// Result type for Firestore operations.
pub type FirestoreResult<T> = Result<T, FirestoreError>;

/// Errors that can occur during Firestore operations.
#[derive(Debug, Error)]
pub enum FirestoreError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FirestoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map an HTTP status to the matching error variant.
    pub fn from_http_status(status: u16, message: String) -> Self {
        match status {
            403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            409 => Self::AlreadyExists(message),
            412 => Self::PreconditionFailed(message),
            429 => Self::RateLimited(1000),
            500..=599 => Self::ServerError { status, message },
            _ => Self::RequestFailed(message),
        }
    }

    /// HTTP status this error corresponds to, for metrics labels.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::AuthError(_) => Some(401),
            Self::PermissionDenied(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::AlreadyExists(_) => Some(409),
            Self::PreconditionFailed(_) => Some(412),
            Self::RateLimited(_) => Some(429),
            Self::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if error is retryable (network trouble, throttling, 5xx).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FirestoreError::Network(_)
                | FirestoreError::RateLimited(_)
                | FirestoreError::ServerError { .. }
        )
    }

    /// Server-suggested backoff, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            FirestoreError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// True if the error was caused by a failed precondition
    /// (e.g., updateTime mismatch during an optimistic update).
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, FirestoreError::PreconditionFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            FirestoreError::from_http_status(404, "x".into()),
            FirestoreError::NotFound(_)
        ));
        assert!(matches!(
            FirestoreError::from_http_status(409, "x".into()),
            FirestoreError::AlreadyExists(_)
        ));
        assert!(matches!(
            FirestoreError::from_http_status(412, "x".into()),
            FirestoreError::PreconditionFailed(_)
        ));
        assert!(matches!(
            FirestoreError::from_http_status(503, "x".into()),
            FirestoreError::ServerError { status: 503, .. }
        ));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(FirestoreError::RateLimited(500).is_retryable());
        assert!(FirestoreError::ServerError { status: 500, message: String::new() }.is_retryable());
        assert!(!FirestoreError::NotFound("x".into()).is_retryable());
        assert!(!FirestoreError::PreconditionFailed("x".into()).is_retryable());
    }

    #[test]
    fn test_retry_after_only_for_rate_limit() {
        assert_eq!(FirestoreError::RateLimited(250).retry_after_ms(), Some(250));
        assert_eq!(FirestoreError::NotFound("x".into()).retry_after_ms(), None);
    }
}
