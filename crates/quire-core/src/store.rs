//! # Workflow Store
//!
//! The storage trait behind a [`Session`](crate::Session) and its in-memory
//! implementation.
//!
//! All fallible operations return `Result<T, QuireError>` so the in-memory
//! and persistent backends can be used uniformly. Rows scoped to a
//! submission are keyed by `(submission, id)`; listing methods return rows
//! in key order.

use crate::activity::ActivityEntry;
use crate::file::{Galley, SubmissionFile};
use crate::query::Query;
use crate::review::ReviewRound;
use crate::settings::{Category, JournalSetting, Section};
use crate::submission::{Participant, Submission};
use crate::{
    ActivityId, CategoryId, FileId, GalleyId, JournalId, QueryId, QuireError, ReviewRoundId,
    SectionId, SubmissionId, UserId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// SEQUENCES
// =============================================================================

/// Identifier sequences. Each yields 1, 2, 3, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sequence {
    Submission,
    File,
    Galley,
    ReviewRound,
    Review,
    Query,
    Note,
    Activity,
    Section,
    Category,
}

impl Sequence {
    pub const ALL: [Sequence; 10] = [
        Sequence::Submission,
        Sequence::File,
        Sequence::Galley,
        Sequence::ReviewRound,
        Sequence::Review,
        Sequence::Query,
        Sequence::Note,
        Sequence::Activity,
        Sequence::Section,
        Sequence::Category,
    ];

    /// Metadata key of the sequence counter.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Sequence::Submission => "seq.submission",
            Sequence::File => "seq.file",
            Sequence::Galley => "seq.galley",
            Sequence::ReviewRound => "seq.review_round",
            Sequence::Review => "seq.review",
            Sequence::Query => "seq.query",
            Sequence::Note => "seq.note",
            Sequence::Activity => "seq.activity",
            Sequence::Section => "seq.section",
            Sequence::Category => "seq.category",
        }
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Row storage for the editorial workflow.
///
/// `put_*` methods insert or replace.
pub trait WorkflowStore {
    /// Take the next identifier from `seq`.
    fn next_id(&mut self, seq: Sequence) -> Result<u64, QuireError>;

    /// The identifier the next call to `next_id` will return.
    fn peek_id(&self, seq: Sequence) -> Result<u64, QuireError>;

    /// Raise `seq` so the next identifier is greater than `floor`.
    fn ensure_sequence(&mut self, seq: Sequence, floor: u64) -> Result<(), QuireError>;

    fn put_submission(&mut self, submission: &Submission) -> Result<(), QuireError>;
    fn submission(&self, id: SubmissionId) -> Result<Option<Submission>, QuireError>;
    fn submissions(&self) -> Result<Vec<Submission>, QuireError>;

    fn put_file(&mut self, file: &SubmissionFile) -> Result<(), QuireError>;
    fn file(
        &self,
        submission: SubmissionId,
        id: FileId,
    ) -> Result<Option<SubmissionFile>, QuireError>;
    fn files(&self, submission: SubmissionId) -> Result<Vec<SubmissionFile>, QuireError>;

    fn put_galley(&mut self, galley: &Galley) -> Result<(), QuireError>;
    fn galleys(&self, submission: SubmissionId) -> Result<Vec<Galley>, QuireError>;

    fn put_review_round(&mut self, round: &ReviewRound) -> Result<(), QuireError>;
    fn review_rounds(&self, submission: SubmissionId) -> Result<Vec<ReviewRound>, QuireError>;

    fn put_query(&mut self, query: &Query) -> Result<(), QuireError>;
    fn query(&self, submission: SubmissionId, id: QueryId) -> Result<Option<Query>, QuireError>;
    fn queries(&self, submission: SubmissionId) -> Result<Vec<Query>, QuireError>;

    fn put_participant(&mut self, participant: &Participant) -> Result<(), QuireError>;
    fn participants(&self, submission: SubmissionId) -> Result<Vec<Participant>, QuireError>;

    fn append_activity(&mut self, entry: &ActivityEntry) -> Result<(), QuireError>;
    fn activity(&self, submission: SubmissionId) -> Result<Vec<ActivityEntry>, QuireError>;

    /// Journals referenced by any submission, setting, section or category.
    fn journals(&self) -> Result<Vec<JournalId>, QuireError>;

    fn put_setting(&mut self, setting: &JournalSetting) -> Result<(), QuireError>;
    fn settings(&self, journal: JournalId) -> Result<Vec<JournalSetting>, QuireError>;

    fn put_section(&mut self, section: &Section) -> Result<(), QuireError>;
    fn sections(&self, journal: JournalId) -> Result<Vec<Section>, QuireError>;

    fn put_category(&mut self, category: &Category) -> Result<(), QuireError>;
    fn categories(&self, journal: JournalId) -> Result<Vec<Category>, QuireError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory store. `BTreeMap` only, so iteration order is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sequences: BTreeMap<Sequence, u64>,
    submissions: BTreeMap<SubmissionId, Submission>,
    files: BTreeMap<(SubmissionId, FileId), SubmissionFile>,
    galleys: BTreeMap<(SubmissionId, GalleyId), Galley>,
    review_rounds: BTreeMap<(SubmissionId, ReviewRoundId), ReviewRound>,
    queries: BTreeMap<(SubmissionId, QueryId), Query>,
    participants: BTreeMap<(SubmissionId, UserId), Participant>,
    activity: BTreeMap<(SubmissionId, ActivityId), ActivityEntry>,
    settings: BTreeMap<(JournalId, String, String), JournalSetting>,
    sections: BTreeMap<(JournalId, SectionId), Section>,
    categories: BTreeMap<(JournalId, CategoryId), Category>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Rows of `map` whose key starts with `scope`.
fn scoped<S: Ord + Copy, I: Ord, T: Clone>(map: &BTreeMap<(S, I), T>, scope: S) -> Vec<T> {
    map.iter()
        .filter(|((s, _), _)| *s == scope)
        .map(|(_, row)| row.clone())
        .collect()
}

impl WorkflowStore for MemoryStore {
    fn next_id(&mut self, seq: Sequence) -> Result<u64, QuireError> {
        let counter = self.sequences.entry(seq).or_insert(0);
        *counter = counter.saturating_add(1);
        Ok(*counter)
    }

    fn peek_id(&self, seq: Sequence) -> Result<u64, QuireError> {
        Ok(self
            .sequences
            .get(&seq)
            .copied()
            .unwrap_or(0)
            .saturating_add(1))
    }

    fn ensure_sequence(&mut self, seq: Sequence, floor: u64) -> Result<(), QuireError> {
        let counter = self.sequences.entry(seq).or_insert(0);
        *counter = (*counter).max(floor);
        Ok(())
    }

    fn put_submission(&mut self, submission: &Submission) -> Result<(), QuireError> {
        self.submissions.insert(submission.id, submission.clone());
        Ok(())
    }

    fn submission(&self, id: SubmissionId) -> Result<Option<Submission>, QuireError> {
        Ok(self.submissions.get(&id).cloned())
    }

    fn submissions(&self) -> Result<Vec<Submission>, QuireError> {
        Ok(self.submissions.values().cloned().collect())
    }

    fn put_file(&mut self, file: &SubmissionFile) -> Result<(), QuireError> {
        self.files
            .insert((file.submission_id, file.id), file.clone());
        Ok(())
    }

    fn file(
        &self,
        submission: SubmissionId,
        id: FileId,
    ) -> Result<Option<SubmissionFile>, QuireError> {
        Ok(self.files.get(&(submission, id)).cloned())
    }

    fn files(&self, submission: SubmissionId) -> Result<Vec<SubmissionFile>, QuireError> {
        Ok(scoped(&self.files, submission))
    }

    fn put_galley(&mut self, galley: &Galley) -> Result<(), QuireError> {
        self.galleys
            .insert((galley.submission_id, galley.id), galley.clone());
        Ok(())
    }

    fn galleys(&self, submission: SubmissionId) -> Result<Vec<Galley>, QuireError> {
        Ok(scoped(&self.galleys, submission))
    }

    fn put_review_round(&mut self, round: &ReviewRound) -> Result<(), QuireError> {
        self.review_rounds
            .insert((round.submission_id, round.id), round.clone());
        Ok(())
    }

    fn review_rounds(&self, submission: SubmissionId) -> Result<Vec<ReviewRound>, QuireError> {
        Ok(scoped(&self.review_rounds, submission))
    }

    fn put_query(&mut self, query: &Query) -> Result<(), QuireError> {
        self.queries
            .insert((query.submission_id, query.id), query.clone());
        Ok(())
    }

    fn query(&self, submission: SubmissionId, id: QueryId) -> Result<Option<Query>, QuireError> {
        Ok(self.queries.get(&(submission, id)).cloned())
    }

    fn queries(&self, submission: SubmissionId) -> Result<Vec<Query>, QuireError> {
        Ok(scoped(&self.queries, submission))
    }

    fn put_participant(&mut self, participant: &Participant) -> Result<(), QuireError> {
        self.participants.insert(
            (participant.submission_id, participant.user_id),
            participant.clone(),
        );
        Ok(())
    }

    fn participants(&self, submission: SubmissionId) -> Result<Vec<Participant>, QuireError> {
        Ok(scoped(&self.participants, submission))
    }

    fn append_activity(&mut self, entry: &ActivityEntry) -> Result<(), QuireError> {
        self.activity
            .insert((entry.submission_id, entry.id), entry.clone());
        Ok(())
    }

    fn activity(&self, submission: SubmissionId) -> Result<Vec<ActivityEntry>, QuireError> {
        Ok(scoped(&self.activity, submission))
    }

    fn journals(&self) -> Result<Vec<JournalId>, QuireError> {
        let journals: BTreeSet<JournalId> = self
            .submissions
            .values()
            .map(|s| s.journal_id)
            .chain(self.settings.keys().map(|(j, _, _)| *j))
            .chain(self.sections.keys().map(|(j, _)| *j))
            .chain(self.categories.keys().map(|(j, _)| *j))
            .collect();
        Ok(journals.into_iter().collect())
    }

    fn put_setting(&mut self, setting: &JournalSetting) -> Result<(), QuireError> {
        self.settings.insert(
            (
                setting.journal_id,
                setting.name.clone(),
                setting.locale.clone(),
            ),
            setting.clone(),
        );
        Ok(())
    }

    fn settings(&self, journal: JournalId) -> Result<Vec<JournalSetting>, QuireError> {
        Ok(self
            .settings
            .iter()
            .filter(|((j, _, _), _)| *j == journal)
            .map(|(_, s)| s.clone())
            .collect())
    }

    fn put_section(&mut self, section: &Section) -> Result<(), QuireError> {
        self.sections
            .insert((section.journal_id, section.id), section.clone());
        Ok(())
    }

    fn sections(&self, journal: JournalId) -> Result<Vec<Section>, QuireError> {
        Ok(scoped(&self.sections, journal))
    }

    fn put_category(&mut self, category: &Category) -> Result<(), QuireError> {
        self.categories
            .insert((category.journal_id, category.id), category.clone());
        Ok(())
    }

    fn categories(&self, journal: JournalId) -> Result<Vec<Category>, QuireError> {
        Ok(scoped(&self.categories, journal))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityCategory;
    use crate::Timestamp;

    #[test]
    fn sequences_are_independent() {
        let mut store = MemoryStore::new();
        assert_eq!(store.next_id(Sequence::File).expect("id"), 1);
        assert_eq!(store.next_id(Sequence::File).expect("id"), 2);
        assert_eq!(store.next_id(Sequence::Query).expect("id"), 1);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut store = MemoryStore::new();
        assert_eq!(store.peek_id(Sequence::File).expect("peek"), 1);
        assert_eq!(store.peek_id(Sequence::File).expect("peek"), 1);
        assert_eq!(store.next_id(Sequence::File).expect("id"), 1);
        assert_eq!(store.peek_id(Sequence::File).expect("peek"), 2);
    }

    #[test]
    fn ensure_sequence_only_raises() {
        let mut store = MemoryStore::new();
        store.ensure_sequence(Sequence::Note, 10).expect("ensure");
        store.ensure_sequence(Sequence::Note, 3).expect("ensure");
        assert_eq!(store.next_id(Sequence::Note).expect("id"), 11);
    }

    #[test]
    fn scoped_rows_stay_with_their_submission() {
        let mut store = MemoryStore::new();
        for (sub, id) in [(1, 1), (2, 2), (1, 3)] {
            store
                .append_activity(&ActivityEntry {
                    id: ActivityId(id),
                    submission_id: SubmissionId(sub),
                    category: ActivityCategory::Files,
                    message: "m".into(),
                    actor_id: None,
                    created_at: Timestamp(id),
                })
                .expect("append");
        }
        let ids: Vec<u64> = store
            .activity(SubmissionId(1))
            .expect("activity")
            .iter()
            .map(|a| a.id.value())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
