//! # Discussion Queries
//!
//! Stage-scoped discussion threads between editors and the other
//! participants of a submission.
//!
//! - A query belongs to one (submission, stage) pair and carries a `seq`
//!   that is unique and increasing within that pair
//! - Notes are kept in posting order
//! - A closed query accepts no notes

use crate::primitives::{MAX_NOTE_LENGTH, MAX_QUERY_PARTICIPANTS};
use crate::workflow::Stage;
use crate::{NoteId, QueryId, QuireError, SubmissionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

// =============================================================================
// ROWS
// =============================================================================

/// One message inside a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryNote {
    pub id: NoteId,
    pub query_id: QueryId,
    pub user_id: UserId,
    pub title: Option<String>,
    pub contents: String,
    pub created_at: Timestamp,
}

/// A discussion thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub id: QueryId,
    pub submission_id: SubmissionId,
    pub stage: Stage,
    pub seq: u32,
    pub posted_at: Timestamp,
    pub modified_at: Option<Timestamp>,
    pub closed: bool,
    /// Sorted, without duplicates.
    pub participants: Vec<UserId>,
    pub notes: Vec<QueryNote>,
}

impl Query {
    /// Whether `user` takes part in this query.
    #[must_use]
    pub fn is_participant(&self, user: UserId) -> bool {
        self.participants.binary_search(&user).is_ok()
    }

    /// Title of the thread (the first note's title).
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.notes.first().and_then(|note| note.title.as_deref())
    }
}

/// Next `seq` for a new query in `stage`: the highest existing seq plus one.
pub fn next_seq<'a>(existing: impl IntoIterator<Item = &'a Query>, stage: Stage) -> u32 {
    existing
        .into_iter()
        .filter(|query| query.stage == stage)
        .map(|query| query.seq)
        .max()
        .map_or(1, |seq| seq.saturating_add(1))
}

// =============================================================================
// INPUT
// =============================================================================

fn bounded(field: &str, value: &str) -> Result<String, QuireError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(QuireError::validation(format!("{field} is required")));
    }
    if value.len() > MAX_NOTE_LENGTH {
        return Err(QuireError::validation(format!(
            "{field} length {} exceeds maximum {} bytes",
            value.len(),
            MAX_NOTE_LENGTH
        )));
    }
    Ok(value.to_string())
}

fn optional_title(title: Option<&str>) -> Result<Option<String>, QuireError> {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => bounded("title", t).map(Some),
        None => Ok(None),
    }
}

/// Input for opening a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuery {
    pub stage: Stage,
    pub title: Option<String>,
    pub message: String,
    pub participants: Vec<UserId>,
}

/// Input for a new note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: Option<String>,
    pub contents: String,
}

/// A [`NewQuery`] that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub stage: Stage,
    pub title: Option<String>,
    pub message: String,
    /// Sorted, deduplicated, always containing the creator.
    pub participants: Vec<UserId>,
}

impl NewQuery {
    /// Validate the input on behalf of `creator`.
    pub fn validate(&self, creator: UserId) -> Result<ValidatedQuery, QuireError> {
        let message = bounded("message", &self.message)?;
        let title = optional_title(self.title.as_deref())?;

        if self.participants.is_empty() {
            return Err(QuireError::validation("at least one participant is required"));
        }
        let mut participants = self.participants.clone();
        participants.push(creator);
        participants.sort_unstable();
        participants.dedup();
        if participants.len() > MAX_QUERY_PARTICIPANTS {
            return Err(QuireError::validation(format!(
                "{} participants exceeds maximum {}",
                participants.len(),
                MAX_QUERY_PARTICIPANTS
            )));
        }

        Ok(ValidatedQuery {
            stage: self.stage,
            title,
            message,
            participants,
        })
    }
}

impl NewNote {
    /// Validate and return `(title, contents)`.
    pub fn validate(&self) -> Result<(Option<String>, String), QuireError> {
        Ok((
            optional_title(self.title.as_deref())?,
            bounded("contents", &self.contents)?,
        ))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn query(id: u64, stage: Stage, seq: u32) -> Query {
        Query {
            id: QueryId(id),
            submission_id: SubmissionId(1),
            stage,
            seq,
            posted_at: Timestamp(1),
            modified_at: None,
            closed: false,
            participants: vec![UserId(1), UserId(4)],
            notes: Vec::new(),
        }
    }

    #[test]
    fn seq_is_per_stage() {
        let existing = vec![
            query(1, Stage::Review, 1),
            query(2, Stage::Review, 2),
            query(3, Stage::Submission, 1),
        ];
        assert_eq!(next_seq(&existing, Stage::Review), 3);
        assert_eq!(next_seq(&existing, Stage::Submission), 2);
        assert_eq!(next_seq(&existing, Stage::Copyediting), 1);
    }

    #[test]
    fn participant_lookup() {
        let q = query(1, Stage::Review, 1);
        assert!(q.is_participant(UserId(4)));
        assert!(!q.is_participant(UserId(2)));
    }

    #[test]
    fn creator_joins_participants() {
        let input = NewQuery {
            stage: Stage::Review,
            title: Some("  ".into()),
            message: " Please check figure 2 ".into(),
            participants: vec![UserId(9), UserId(3), UserId(9)],
        };
        let valid = input.validate(UserId(5)).expect("valid");
        assert_eq!(valid.participants, vec![UserId(3), UserId(5), UserId(9)]);
        assert_eq!(valid.message, "Please check figure 2");
        assert_eq!(valid.title, None);
    }

    #[test]
    fn query_requires_message_and_participants() {
        let mut input = NewQuery {
            stage: Stage::Review,
            title: None,
            message: String::new(),
            participants: vec![UserId(2)],
        };
        assert!(input.validate(UserId(1)).is_err());

        input.message = "hello".into();
        input.participants.clear();
        assert!(input.validate(UserId(1)).is_err());
    }

    #[test]
    fn note_requires_contents() {
        let note = NewNote {
            title: None,
            contents: "\n".into(),
        };
        assert!(note.validate().is_err());
    }
}
