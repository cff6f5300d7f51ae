//! # Core Type Definitions
//!
//! Identifiers, timestamps and the error type shared by every Quire module.
//!
//! - Row identifiers (`SubmissionId`, `FileId`, `QueryId`, ...)
//! - `Timestamp` (seconds since the Unix epoch, supplied by callers)
//! - `QuireError` and its two-way `ErrorClass`
//!
//! ## Determinism Guarantees
//!
//! All identifiers implement `Ord` so they can key `BTreeMap`/`BTreeSet`.
//! The core never reads the system clock; every operation that stamps a
//! row receives `now` from the caller.

use crate::workflow::Stage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl $name {
            /// Get the raw identifier value.
            #[must_use]
            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Identifier of a submission (manuscript + metadata).
    SubmissionId
);
row_id!(
    /// Identifier of a journal (the editorial context).
    JournalId
);
row_id!(
    /// Identifier of a user account. Resolution to a person happens outside Quire.
    UserId
);
row_id!(
    /// Identifier of an uploaded submission file.
    FileId
);
row_id!(
    /// Identifier of a production galley.
    GalleyId
);
row_id!(
    /// Identifier of a review round.
    ReviewRoundId
);
row_id!(
    /// Identifier of a single reviewer assignment.
    ReviewId
);
row_id!(
    /// Identifier of a discussion query.
    QueryId
);
row_id!(
    /// Identifier of a note inside a query.
    NoteId
);
row_id!(
    /// Identifier of an activity log entry.
    ActivityId
);
row_id!(
    /// Identifier of a journal section.
    SectionId
);
row_id!(
    /// Identifier of a journal category.
    CategoryId
);

// =============================================================================
// TIMESTAMP
// =============================================================================

/// Seconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp from raw seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Raw seconds value.
    #[must_use]
    pub const fn secs(self) -> u64 {
        self.0
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// The two user-facing failure classes.
///
/// Validation errors are caused by caller input and are shown inline next to
/// the offending field. Request failures are shown as a dismissible banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Validation,
    RequestFailed,
}

/// Errors that can occur in Quire.
///
/// - No silent failures: unknown stages are errors, never defaults
/// - Use `Result<T, QuireError>` for fallible operations
/// - Nothing here is fatal; callers report and carry on
#[derive(Debug, Error)]
pub enum QuireError {
    /// A stage value did not match any workflow stage.
    #[error("Invalid stage: {0:?}")]
    InvalidStage(String),

    /// A status value did not match any submission status.
    #[error("Invalid status: {0:?}")]
    InvalidStatus(String),

    /// A role value did not match any known role.
    #[error("Invalid role: {0:?}")]
    InvalidRole(String),

    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The caller did not identify itself.
    #[error("Unauthorized")]
    Unauthenticated,

    /// The caller is known but lacks the role for this action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The submission's current stage does not accept uploads.
    #[error("Uploads are closed while the submission is in {0}")]
    UploadNotPermitted(Stage),

    /// The requested stage is ahead of the submission's current stage.
    #[error("Stage {requested} has not been reached (current: {current})")]
    StageNotReached { requested: Stage, current: Stage },

    /// A workflow change would move the submission backwards.
    #[error("Cannot move from {from} back to {to}")]
    StageRegression { from: Stage, to: Stage },

    /// The query is closed and accepts no further changes.
    #[error("Query {0} is already closed")]
    QueryClosed(QueryId),

    /// The requested submission was not found.
    #[error("Submission not found: {0}")]
    SubmissionNotFound(SubmissionId),

    /// The requested file was not found on the submission.
    #[error("File not found: {0}")]
    FileNotFound(FileId),

    /// The requested query was not found on the submission.
    #[error("Query not found: {0}")]
    QueryNotFound(QueryId),

    /// The journal has no value for the requested setting.
    #[error("Setting not found: {name} (journal {journal})")]
    SettingNotFound { journal: JournalId, name: String },

    /// A detail was assembled from rows of different submissions.
    #[error("Inconsistent detail: {0}")]
    InconsistentDetail(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl QuireError {
    /// Classify this error for presentation.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            QuireError::InvalidStage(_)
            | QuireError::InvalidStatus(_)
            | QuireError::InvalidRole(_)
            | QuireError::Validation(_)
            | QuireError::StageNotReached { .. }
            | QuireError::StageRegression { .. }
            | QuireError::QueryClosed(_) => ErrorClass::Validation,
            QuireError::Unauthenticated
            | QuireError::Forbidden(_)
            | QuireError::UploadNotPermitted(_)
            | QuireError::SubmissionNotFound(_)
            | QuireError::FileNotFound(_)
            | QuireError::QueryNotFound(_)
            | QuireError::SettingNotFound { .. }
            | QuireError::InconsistentDetail(_)
            | QuireError::SerializationError(_)
            | QuireError::DeserializationError(_)
            | QuireError::IoError(_) => ErrorClass::RequestFailed,
        }
    }

    /// Shorthand for `self.class() == ErrorClass::Validation`.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.class() == ErrorClass::Validation
    }

    /// Build a validation error from any message.
    pub fn validation(msg: impl Into<String>) -> Self {
        QuireError::Validation(msg.into())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_numerically() {
        let mut ids = vec![SubmissionId(3), SubmissionId(1), SubmissionId(2)];
        ids.sort();
        assert_eq!(ids, vec![SubmissionId(1), SubmissionId(2), SubmissionId(3)]);
    }

    #[test]
    fn id_display_is_raw_number() {
        assert_eq!(FileId(42).to_string(), "42");
        assert_eq!(QueryId(7).value(), 7);
    }

    #[test]
    fn error_classes() {
        assert!(QuireError::InvalidStage("draft".into()).is_validation());
        assert!(QuireError::validation("label is required").is_validation());
        assert!(!QuireError::SubmissionNotFound(SubmissionId(1)).is_validation());
        assert_eq!(
            QuireError::IoError("disk".into()).class(),
            ErrorClass::RequestFailed
        );
    }

    #[test]
    fn error_messages_name_the_stage() {
        let err = QuireError::StageRegression {
            from: Stage::Production,
            to: Stage::Review,
        };
        assert_eq!(err.to_string(), "Cannot move from production back to review");
    }
}
