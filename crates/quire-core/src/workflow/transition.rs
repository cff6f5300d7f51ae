//! # Stage Transitions
//!
//! Editorial stage moves and status changes.
//!
//! A submission's stage index never decreases: a change that targets an
//! earlier stage is rejected with [`QuireError::StageRegression`] and leaves
//! the submission untouched. Staying in the current stage is allowed so that
//! a status-only change can name the stage it was made in.

use crate::primitives::MAX_NOTE_LENGTH;
use crate::submission::{Submission, SubmissionStatus};
use crate::workflow::Stage;
use crate::{QuireError, Timestamp};
use serde::{Deserialize, Serialize};

/// A requested change to a submission's workflow position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowChange {
    pub target_stage: Option<Stage>,
    pub status: Option<SubmissionStatus>,
    pub note: Option<String>,
}

/// The result of applying a [`WorkflowChange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The submission after the change.
    pub submission: Submission,
    /// Stage before the change.
    pub from: Stage,
    /// Message for the workflow activity entry.
    pub message: String,
}

impl WorkflowChange {
    /// Move one stage forward from `current`.
    pub fn advance_from(current: Stage) -> Result<Self, QuireError> {
        let next = current.next().ok_or_else(|| {
            QuireError::validation(format!("{current} is the last stage"))
        })?;
        Ok(Self {
            target_stage: Some(next),
            ..Self::default()
        })
    }

    fn trimmed_note(&self) -> Option<&str> {
        self.note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
    }

    /// Check the change carries at least one field and a bounded note.
    pub fn validate(&self) -> Result<(), QuireError> {
        let note = self.trimmed_note();
        if self.target_stage.is_none() && self.status.is_none() && note.is_none() {
            return Err(QuireError::validation(
                "a target stage, status or note is required",
            ));
        }
        if let Some(note) = note {
            if note.len() > MAX_NOTE_LENGTH {
                return Err(QuireError::validation(format!(
                    "note length {} exceeds maximum {} bytes",
                    note.len(),
                    MAX_NOTE_LENGTH
                )));
            }
        }
        Ok(())
    }

    /// Activity message: the note if given, otherwise a description of the change.
    #[must_use]
    pub fn activity_message(&self) -> String {
        if let Some(note) = self.trimmed_note() {
            return note.to_string();
        }
        let mut parts = Vec::new();
        if let Some(stage) = self.target_stage {
            parts.push(format!("Moved stage to {stage}."));
        }
        if let Some(status) = self.status {
            parts.push(format!("Status updated to {status}."));
        }
        parts.join(" ")
    }

    /// Apply the change to `submission`, stamping `now` as its update time.
    pub fn apply(&self, submission: &Submission, now: Timestamp) -> Result<Transition, QuireError> {
        self.validate()?;

        let from = submission.stage;
        if let Some(target) = self.target_stage {
            if target < from {
                return Err(QuireError::StageRegression { from, to: target });
            }
        }

        let mut updated = submission.clone();
        if let Some(target) = self.target_stage {
            updated.stage = target;
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        updated.updated_at = now;

        Ok(Transition {
            submission: updated,
            from,
            message: self.activity_message(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
