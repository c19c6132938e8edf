//! API error types.
//!
//! Every handler returns `ApiResult<T>`; errors render as the standard
//! response envelope `{ success: false, message }` plus a stable `code`
//! for the authentication/authorization failure modes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Unauthorized {
        /// Stable machine-readable code (`token_expired`, `token_revoked`, ...).
        code: &'static str,
        message: String,
    },

    #[error("{message}")]
    Forbidden {
        code: &'static str,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Duplicate email, duplicate application, and similar uniqueness
    /// violations. Rendered as 400 with a specific message.
    #[error("{0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] jobport_storage::StorageError),

    #[error("Firestore error: {0}")]
    Firestore(#[from] jobport_firestore::FirestoreError),
}

impl ApiError {
    pub fn unauthorized(code: &'static str, msg: impl Into<String>) -> Self {
        Self::Unauthorized {
            code,
            message: msg.into(),
        }
    }

    pub fn forbidden(code: &'static str, msg: impl Into<String>) -> Self {
        Self::Forbidden {
            code,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Conflict(_) | ApiError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Firestore(e) => match e {
                jobport_firestore::FirestoreError::NotFound(_) => StatusCode::NOT_FOUND,
                jobport_firestore::FirestoreError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Storage(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Unauthorized { code, .. } | ApiError::Forbidden { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 500s keep their detail server-side outside development.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", self);
            if std::env::var("ENVIRONMENT").unwrap_or_default() == "development" {
                self.to_string()
            } else {
                "An internal error occurred".to_string()
            }
        } else {
            match &self {
                ApiError::Firestore(jobport_firestore::FirestoreError::NotFound(_)) => {
                    "Resource not found".to_string()
                }
                ApiError::Firestore(jobport_firestore::FirestoreError::AlreadyExists(_)) => {
                    "Resource already exists".to_string()
                }
                _ => self.to_string(),
            }
        };

        let body = ErrorBody {
            success: false,
            message,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::unauthorized("token_expired", "x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::forbidden("account_suspended", "x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        // Conflicts are part of the 400 family on this API's wire contract.
        assert_eq!(ApiError::conflict("dup").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::internal("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_firestore_error_mapping() {
        let not_found: ApiError = jobport_firestore::FirestoreError::not_found("jobs/x").into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let exists: ApiError =
            jobport_firestore::FirestoreError::AlreadyExists("applications/x".into()).into();
        assert_eq!(exists.status_code(), StatusCode::BAD_REQUEST);

        let other: ApiError = jobport_firestore::FirestoreError::request_failed("boom").into();
        assert_eq!(other.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_errors_carry_codes() {
        assert_eq!(
            ApiError::unauthorized("token_revoked", "x").code(),
            Some("token_revoked")
        );
        assert_eq!(ApiError::not_found("x").code(), None);
    }
}
