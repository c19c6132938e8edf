//! Upload kinds, key layout, and content validation.

use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Maximum accepted upload size in bytes (10 MB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Image content types accepted for avatars and logos.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Document content types accepted for resumes.
const DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
];

/// What an upload is for; determines key prefix and accepted types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Avatar,
    Resume,
    Logo,
}

impl UploadKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            UploadKind::Avatar => "avatars",
            UploadKind::Resume => "resumes",
            UploadKind::Logo => "logos",
        }
    }

    fn accepted_types(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            UploadKind::Avatar | UploadKind::Logo => IMAGE_TYPES,
            UploadKind::Resume => DOCUMENT_TYPES,
        }
    }
}

/// A validated upload ready to be written to the bucket.
#[derive(Debug, Clone)]
pub struct UploadValidation {
    /// Object key: `{prefix}/{owner_id}/{uuid}.{ext}`
    pub key: String,
    pub content_type: String,
}

impl UploadValidation {
    /// Validate size and content type, and derive the object key.
    pub fn check(
        kind: UploadKind,
        owner_id: &str,
        content_type: &str,
        size: usize,
    ) -> StorageResult<Self> {
        if size == 0 {
            return Err(StorageError::upload_failed("Empty file"));
        }
        if size > MAX_UPLOAD_BYTES {
            return Err(StorageError::TooLarge {
                size,
                limit: MAX_UPLOAD_BYTES,
            });
        }

        let content_type = content_type.to_ascii_lowercase();
        let ext = kind
            .accepted_types()
            .iter()
            .find(|(ty, _)| *ty == content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| StorageError::UnsupportedType(content_type.clone()))?;

        Ok(Self {
            key: format!("{}/{}/{}.{}", kind.prefix(), owner_id, Uuid::new_v4(), ext),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_accepts_images_only() {
        assert!(UploadValidation::check(UploadKind::Avatar, "u1", "image/png", 1024).is_ok());
        assert!(matches!(
            UploadValidation::check(UploadKind::Avatar, "u1", "application/pdf", 1024),
            Err(StorageError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_resume_accepts_documents_only() {
        assert!(UploadValidation::check(UploadKind::Resume, "u1", "application/pdf", 1024).is_ok());
        assert!(matches!(
            UploadValidation::check(UploadKind::Resume, "u1", "image/png", 1024),
            Err(StorageError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_size_limits() {
        assert!(matches!(
            UploadValidation::check(UploadKind::Logo, "e1", "image/png", MAX_UPLOAD_BYTES + 1),
            Err(StorageError::TooLarge { .. })
        ));
        assert!(matches!(
            UploadValidation::check(UploadKind::Logo, "e1", "image/png", 0),
            Err(StorageError::UploadFailed(_))
        ));
    }

    #[test]
    fn test_key_layout() {
        let v = UploadValidation::check(UploadKind::Resume, "user-1", "application/pdf", 10).unwrap();
        assert!(v.key.starts_with("resumes/user-1/"));
        assert!(v.key.ends_with(".pdf"));
    }

    #[test]
    fn test_content_type_case_insensitive() {
        let v = UploadValidation::check(UploadKind::Avatar, "u1", "IMAGE/PNG", 10).unwrap();
        assert_eq!(v.content_type, "image/png");
    }
}
