//! # Activity Log
//!
//! Append-only log of what happened to a submission.

use crate::{ActivityId, SubmissionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// What an activity entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Submission,
    Files,
    Workflow,
    Discussion,
}

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: ActivityId,
    pub submission_id: SubmissionId,
    pub category: ActivityCategory,
    pub message: String,
    pub actor_id: Option<UserId>,
    pub created_at: Timestamp,
}

/// An entry before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub category: ActivityCategory,
    pub message: String,
    pub actor_id: Option<UserId>,
}

impl NewActivity {
    #[must_use]
    pub fn new(category: ActivityCategory, message: impl Into<String>, actor: UserId) -> Self {
        Self {
            category,
            message: message.into(),
            actor_id: Some(actor),
        }
    }

    /// Stamp the entry with an id and time.
    #[must_use]
    pub fn into_entry(
        self,
        id: ActivityId,
        submission_id: SubmissionId,
        now: Timestamp,
    ) -> ActivityEntry {
        ActivityEntry {
            id,
            submission_id,
            category: self.category,
            message: self.message,
            actor_id: self.actor_id,
            created_at: now,
        }
    }
}
