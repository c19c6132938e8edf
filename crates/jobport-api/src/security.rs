//! Input validation, sanitization, and password hashing.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::{ApiError, ApiResult};

/// Maximum length for free-text fields (summaries, cover letters, notes).
pub const MAX_TEXT_LENGTH: usize = 5000;

/// Maximum length for short fields (names, titles, locations).
pub const MAX_SHORT_LENGTH: usize = 200;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalize an email for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Reject unusable passwords before hashing.
pub fn validate_password(password: &str) -> ApiResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > 128 {
        return Err(ApiError::validation("Password too long"));
    }
    Ok(())
}

/// Hash a password with argon2id and a fresh salt.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored PHC hash. An unparseable stored hash
/// counts as a mismatch, never as a server error.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Strip control characters and cap length for free-text storage.
pub fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .take(MAX_TEXT_LENGTH)
        .collect()
}

/// Trim and cap a short field.
pub fn sanitize_short(input: &str) -> String {
    input.trim().chars().take(MAX_SHORT_LENGTH).collect()
}

/// Validate a document id path segment.
///
/// UUIDs and `{uuid}_{uuid}` application ids pass; path metacharacters
/// do not.
pub fn is_valid_doc_id(id: &str) -> bool {
    if id.is_empty() || id.len() > 128 {
        return false;
    }
    id.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough password").is_ok());
        assert!(validate_password(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_verify_with_garbage_hash_is_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize_text("a\x00b\x07c"), "abc");
        assert_eq!(sanitize_text("line1\nline2\ttab"), "line1\nline2\ttab");
    }

    #[test]
    fn test_doc_id_validation() {
        assert!(is_valid_doc_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_valid_doc_id("job-1_user-1"));
        assert!(!is_valid_doc_id(""));
        assert!(!is_valid_doc_id("has/slash"));
        assert!(!is_valid_doc_id("has.dot"));
        assert!(!is_valid_doc_id(&"a".repeat(200)));
    }
}
