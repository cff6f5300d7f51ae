//! # Upload Action
//!
//! Validation and authorization of a single file upload.
//!
//! Validation runs entirely on the request, before the store or the blob
//! store is touched, and always in this order:
//!
//! 1. file present
//! 2. file non-empty and within [`MAX_UPLOAD_BYTES`]
//! 3. label non-empty after trimming and within [`MAX_LABEL_LENGTH`]
//! 4. uploader present
//! 5. target stage parses
//! 6. kind parses
//!
//! Authorization needs the submission's current stage and the uploader's
//! role, see [`authorize_upload`].

use crate::file::FileKind;
use crate::primitives::{MAX_LABEL_LENGTH, MAX_UPLOAD_BYTES};
use crate::submission::Role;
use crate::workflow::{Stage, can_upload_file};
use crate::{QuireError, ReviewRoundId, UserId};

/// File content and client-supplied metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// An upload request exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: Option<UploadedFile>,
    pub label: String,
    pub stage: String,
    pub kind: String,
    pub uploaded_by: Option<UserId>,
    pub version_label: Option<String>,
    pub round: Option<u32>,
    pub visible_to_authors: bool,
    pub review_round_id: Option<ReviewRoundId>,
}

/// An upload request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    pub file: UploadedFile,
    pub label: String,
    pub stage: Stage,
    pub kind: FileKind,
    pub uploaded_by: UserId,
    pub version_label: Option<String>,
    pub round: u32,
    pub visible_to_authors: bool,
    pub review_round_id: Option<ReviewRoundId>,
}

impl UploadRequest {
    /// Validate the request. Consumes it to avoid copying the file bytes.
    pub fn validate(self) -> Result<ValidatedUpload, QuireError> {
        let file = self
            .file
            .ok_or_else(|| QuireError::validation("file is required"))?;
        if file.bytes.is_empty() {
            return Err(QuireError::validation("file is empty"));
        }
        if file.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(QuireError::validation(format!(
                "file size {} exceeds maximum {} bytes",
                file.bytes.len(),
                MAX_UPLOAD_BYTES
            )));
        }

        let label = self.label.trim();
        if label.is_empty() {
            return Err(QuireError::validation("label is required"));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(QuireError::validation(format!(
                "label length {} exceeds maximum {} bytes",
                label.len(),
                MAX_LABEL_LENGTH
            )));
        }

        let uploaded_by = self.uploaded_by.ok_or(QuireError::Unauthenticated)?;
        let stage: Stage = self.stage.trim().parse()?;
        let kind = FileKind::parse(&self.kind)?;

        let version_label = self
            .version_label
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(ValidatedUpload {
            file,
            label: label.to_string(),
            stage,
            kind,
            uploaded_by,
            version_label,
            round: self.round.unwrap_or(1).max(1),
            visible_to_authors: self.visible_to_authors,
            review_round_id: self.review_round_id,
        })
    }
}

/// Check that a user with `role` may upload to `target` while the
/// submission sits in `current`.
///
/// - `target` ahead of `current`: [`QuireError::StageNotReached`]
/// - editorial roles: any reached stage
/// - authors: only while `current` accepts uploads
/// - anyone else: [`QuireError::Forbidden`]
pub fn authorize_upload(role: Option<Role>, target: Stage, current: Stage) -> Result<(), QuireError> {
    if target > current {
        return Err(QuireError::StageNotReached {
            requested: target,
            current,
        });
    }
    match role {
        Some(role) if role.is_editorial() => Ok(()),
        Some(Role::Author) => {
            if can_upload_file(current) {
                Ok(())
            } else {
                Err(QuireError::UploadNotPermitted(current))
            }
        }
        Some(other) => Err(QuireError::Forbidden(format!(
            "role {other} cannot upload files"
        ))),
        None => Err(QuireError::Forbidden(
            "not a participant of this submission".to_string(),
        )),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> UploadRequest {
        UploadRequest {
            file: Some(UploadedFile {
                name: "manuscript.docx".into(),
                mime_type: "application/msword".into(),
                bytes: b"PK\x03\x04".to_vec(),
            }),
            label: " Main text ".into(),
            stage: "submission".into(),
            kind: String::new(),
            uploaded_by: Some(UserId(3)),
            ..UploadRequest::default()
        }
    }

    #[test]
    fn valid_request() {
        let upload = request().validate().expect("valid");
        assert_eq!(upload.label, "Main text");
        assert_eq!(upload.stage, Stage::Submission);
        assert_eq!(upload.kind.as_str(), "manuscript");
        assert_eq!(upload.round, 1);
    }

    #[test]
    fn missing_file_checked_first() {
        let req = UploadRequest {
            file: None,
            label: String::new(),
            uploaded_by: None,
            ..request()
        };
        let err = req.validate().expect_err("no file");
        assert_eq!(err.to_string(), "file is required");
    }

    #[test]
    fn empty_label_checked_before_auth() {
        let req = UploadRequest {
            label: "   ".into(),
            uploaded_by: None,
            ..request()
        };
        let err = req.validate().expect_err("no label");
        assert_eq!(err.to_string(), "label is required");
    }

    #[test]
    fn anonymous_upload_is_unauthenticated() {
        let req = UploadRequest {
            uploaded_by: None,
            stage: "nowhere".into(),
            ..request()
        };
        assert!(matches!(
            req.validate().expect_err("anon"),
            QuireError::Unauthenticated
        ));
    }

    #[test]
    fn unknown_stage_and_kind() {
        let req = UploadRequest {
            stage: "archive".into(),
            ..request()
        };
        assert!(matches!(
            req.validate().expect_err("stage"),
            QuireError::InvalidStage(_)
        ));

        let req = UploadRequest {
            kind: "Final Draft".into(),
            ..request()
        };
        assert!(req.validate().expect_err("kind").is_validation());
    }

    #[test]
    fn empty_file_rejected() {
        let mut req = request();
        if let Some(file) = req.file.as_mut() {
            file.bytes.clear();
        }
        assert!(req.validate().is_err());
    }

    #[test]
    fn authorization_matrix() {
        assert!(authorize_upload(Some(Role::Editor), Stage::Submission, Stage::Production).is_ok());
        assert!(matches!(
            authorize_upload(Some(Role::Editor), Stage::Production, Stage::Review),
            Err(QuireError::StageNotReached { .. })
        ));
        assert!(authorize_upload(Some(Role::Author), Stage::Review, Stage::Review).is_ok());
        assert!(matches!(
            authorize_upload(Some(Role::Author), Stage::Production, Stage::Production),
            Err(QuireError::UploadNotPermitted(Stage::Production))
        ));
        assert!(matches!(
            authorize_upload(Some(Role::Reviewer), Stage::Review, Stage::Review),
            Err(QuireError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_upload(None, Stage::Review, Stage::Review),
            Err(QuireError::Forbidden(_))
        ));
    }
}
