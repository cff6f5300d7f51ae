//! # Files and Galleys
//!
//! Uploaded submission files, their kind tags and storage paths, and the
//! production galleys rendered from them.

use crate::primitives::{DEFAULT_FILE_KIND, MAX_FILE_KIND_LENGTH};
use crate::workflow::Stage;
use crate::{FileId, GalleyId, QuireError, ReviewRoundId, SubmissionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

// =============================================================================
// FILE KIND
// =============================================================================

/// File kind tag (`manuscript`, `review_attachment`, `copyedited`, ...).
///
/// Lowercase ASCII letters, digits, `_` and `-`, at most
/// [`MAX_FILE_KIND_LENGTH`] bytes. An empty tag means `manuscript`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileKind(String);

impl FileKind {
    /// Parse a kind tag, defaulting empty input to `manuscript`.
    pub fn parse(raw: &str) -> Result<Self, QuireError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }
        if raw.len() > MAX_FILE_KIND_LENGTH {
            return Err(QuireError::validation(format!(
                "kind length {} exceeds maximum {} bytes",
                raw.len(),
                MAX_FILE_KIND_LENGTH
            )));
        }
        let valid = raw
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
        if !valid {
            return Err(QuireError::validation(format!("Invalid file kind: {raw:?}")));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FileKind {
    fn default() -> Self {
        Self(DEFAULT_FILE_KIND.to_string())
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// SUBMISSION FILE
// =============================================================================

/// An uploaded file attached to one stage of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFile {
    pub id: FileId,
    pub submission_id: SubmissionId,
    pub stage: Stage,
    pub kind: FileKind,
    pub label: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
    pub storage_path: String,
    pub version_label: Option<String>,
    pub round: u32,
    pub review_round_id: Option<ReviewRoundId>,
    pub visible_to_authors: bool,
    pub uploaded_by: UserId,
    pub uploaded_at: Timestamp,
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
#[must_use]
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Extension of an uploaded file name, sanitised. `None` when there is none.
fn extension(original_name: &str) -> Option<String> {
    let (stem, ext) = original_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(sanitize_label(ext))
}

/// Blob key for an upload:
/// `submissions/{submission}/{stage}/{timestamp}-{file}-{label}[.{ext}]`.
///
/// The file id keeps keys unique when the same label is uploaded twice
/// within one second.
#[must_use]
pub fn storage_path(
    submission: SubmissionId,
    stage: Stage,
    now: Timestamp,
    file: FileId,
    label: &str,
    original_name: &str,
) -> String {
    let mut path = format!(
        "submissions/{}/{}/{}-{}-{}",
        submission,
        stage,
        now.secs(),
        file,
        sanitize_label(label)
    );
    if let Some(ext) = extension(original_name) {
        path.push('.');
        path.push_str(&ext);
    }
    path
}

// =============================================================================
// GALLEY
// =============================================================================

/// A production rendering (PDF, HTML, ...) of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Galley {
    pub id: GalleyId,
    pub submission_id: SubmissionId,
    pub label: String,
    pub locale: String,
    pub is_primary: bool,
    pub is_public: bool,
    pub sequence: u32,
    pub file_id: Option<FileId>,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_kind_defaults_to_manuscript() {
        assert_eq!(FileKind::parse("").expect("parse").as_str(), "manuscript");
        assert_eq!(FileKind::parse("  ").expect("parse"), FileKind::default());
    }

    #[test]
    fn kind_charset_is_enforced() {
        assert!(FileKind::parse("review_attachment").is_ok());
        assert!(FileKind::parse("galley-pdf2").is_ok());
        assert!(FileKind::parse("Manuscript").is_err());
        assert!(FileKind::parse("final draft").is_err());
        assert!(FileKind::parse(&"k".repeat(MAX_FILE_KIND_LENGTH + 1)).is_err());
    }

    #[test]
    fn label_sanitising() {
        assert_eq!(sanitize_label("Revised draft (v2).docx"), "Revised_draft__v2_.docx");
        assert_eq!(sanitize_label("données"), "donn_es");
    }

    #[test]
    fn storage_path_layout() {
        let path = storage_path(
            SubmissionId(12),
            Stage::Review,
            Timestamp(1_700_000_000),
            FileId(4),
            "Reviewer notes",
            "notes.final.pdf",
        );
        assert_eq!(path, "submissions/12/review/1700000000-4-Reviewer_notes.pdf");
    }

    #[test]
    fn storage_path_without_extension() {
        let at = |name| {
            storage_path(
                SubmissionId(3),
                Stage::Submission,
                Timestamp(5),
                FileId(1),
                "Cover",
                name,
            )
        };
        assert_eq!(at("README"), "submissions/3/submission/5-1-Cover");
        assert_eq!(at(".env"), "submissions/3/submission/5-1-Cover");
    }

    #[test]
    fn same_label_same_second_gets_distinct_paths() {
        let at = |file| {
            storage_path(
                SubmissionId(1),
                Stage::Submission,
                Timestamp(9),
                file,
                "Main Text",
                "m.pdf",
            )
        };
        assert_ne!(at(FileId(1)), at(FileId(2)));
    }
}
