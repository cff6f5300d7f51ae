//! # Submissions and Participants
//!
//! The submission row, its status, and the people assigned to it.

use crate::primitives::MAX_TITLE_LENGTH;
use crate::workflow::Stage;
use crate::{JournalId, QuireError, SubmissionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// STATUS
// =============================================================================

/// Editorial status of a submission, independent of its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    InReview,
    Accepted,
    Scheduled,
    Published,
    Declined,
}

impl SubmissionStatus {
    /// All statuses.
    pub const ALL: [SubmissionStatus; 6] = [
        SubmissionStatus::Submitted,
        SubmissionStatus::InReview,
        SubmissionStatus::Accepted,
        SubmissionStatus::Scheduled,
        SubmissionStatus::Published,
        SubmissionStatus::Declined,
    ];

    /// Wire key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::InReview => "in_review",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::Scheduled => "scheduled",
            SubmissionStatus::Published => "published",
            SubmissionStatus::Declined => "declined",
        }
    }

    /// Whether the submission has left the editorial pipeline.
    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(
            self,
            SubmissionStatus::Published | SubmissionStatus::Declined
        )
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SubmissionStatus {
    type Err = QuireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "queued" is the legacy name of "submitted"
        if s == "queued" {
            return Ok(SubmissionStatus::Submitted);
        }
        SubmissionStatus::ALL
            .iter()
            .copied()
            .find(|status| status.key() == s)
            .ok_or_else(|| QuireError::InvalidStatus(s.to_string()))
    }
}

// =============================================================================
// SUBMISSION
// =============================================================================

/// A manuscript moving through the editorial workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub journal_id: JournalId,
    pub title: String,
    pub author_id: UserId,
    pub stage: Stage,
    pub status: SubmissionStatus,
    pub is_archived: bool,
    pub submitted_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    pub journal_id: JournalId,
    pub title: String,
    pub author_id: UserId,
}

impl SubmissionDraft {
    /// Validate the draft and return the trimmed title.
    pub fn validated_title(&self) -> Result<String, QuireError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(QuireError::validation("title is required"));
        }
        if title.len() > MAX_TITLE_LENGTH {
            return Err(QuireError::validation(format!(
                "title length {} exceeds maximum {} bytes",
                title.len(),
                MAX_TITLE_LENGTH
            )));
        }
        Ok(title.to_string())
    }
}

// =============================================================================
// ROLES
// =============================================================================

/// Role a user holds on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Editor,
    SectionEditor,
    Reviewer,
    Author,
    Copyeditor,
    LayoutEditor,
    Proofreader,
}

impl Role {
    /// All roles.
    pub const ALL: [Role; 9] = [
        Role::Admin,
        Role::Manager,
        Role::Editor,
        Role::SectionEditor,
        Role::Reviewer,
        Role::Author,
        Role::Copyeditor,
        Role::LayoutEditor,
        Role::Proofreader,
    ];

    /// Wire key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Editor => "editor",
            Role::SectionEditor => "section_editor",
            Role::Reviewer => "reviewer",
            Role::Author => "author",
            Role::Copyeditor => "copyeditor",
            Role::LayoutEditor => "layout_editor",
            Role::Proofreader => "proofreader",
        }
    }

    /// Admin, manager, editor or section editor.
    #[must_use]
    pub fn is_editorial(self) -> bool {
        matches!(
            self,
            Role::Admin | Role::Manager | Role::Editor | Role::SectionEditor
        )
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Role {
    type Err = QuireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.key() == s)
            .ok_or_else(|| QuireError::InvalidRole(s.to_string()))
    }
}

// =============================================================================
// PARTICIPANT
// =============================================================================

/// A user assigned to a submission. One record per (submission, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub submission_id: SubmissionId,
    pub user_id: UserId,
    pub role: Role,
    /// Stage at which the user was assigned.
    pub stage: Stage,
    pub assigned_at: Timestamp,
    pub name: Option<String>,
}

// =============================================================================
// TESTS
// =============================================================================
