//! # redb-backed Workflow Storage
//!
//! A disk-backed [`WorkflowStore`] using the redb embedded database.
//!
//! - One table per row kind, postcard-encoded values
//! - Rows scoped to a submission or journal use `(scope, id)` keys, so a
//!   range scan returns one submission's rows in id order
//! - Sequence counters live in the `metadata` table
//! - Every `put_*` is its own write transaction

use crate::activity::ActivityEntry;
use crate::file::{Galley, SubmissionFile};
use crate::query::Query;
use crate::review::ReviewRound;
use crate::settings::{Category, JournalSetting, Section};
use crate::store::{Sequence, WorkflowStore};
use crate::submission::{Participant, Submission};
use crate::{FileId, JournalId, QueryId, QuireError, SubmissionId};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::Path;

/// Table for submissions: SubmissionId(u64) -> serialized Submission
const SUBMISSIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("submissions");

/// Table for files: (submission_id, file_id) -> serialized SubmissionFile
const FILES: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("files");

/// Table for galleys: (submission_id, galley_id) -> serialized Galley
const GALLEYS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("galleys");

/// Table for review rounds: (submission_id, round_id) -> serialized ReviewRound
const REVIEW_ROUNDS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("review_rounds");

/// Table for queries with their notes: (submission_id, query_id) -> serialized Query
const QUERIES: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("queries");

/// Table for participants: (submission_id, user_id) -> serialized Participant
const PARTICIPANTS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("participants");

/// Table for the activity log: (submission_id, activity_id) -> serialized ActivityEntry
const ACTIVITY: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("activity");

/// Table for settings: (journal_id, name, locale) -> serialized JournalSetting
const SETTINGS: TableDefinition<(u64, &str, &str), &[u8]> = TableDefinition::new("settings");

/// Table for sections: (journal_id, section_id) -> serialized Section
const SECTIONS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("sections");

/// Table for categories: (journal_id, category_id) -> serialized Category
const CATEGORIES: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("categories");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

type ScopedTable = TableDefinition<'static, (u64, u64), &'static [u8]>;

const SCOPED_TABLES: [ScopedTable; 8] = [
    FILES,
    GALLEYS,
    REVIEW_ROUNDS,
    QUERIES,
    PARTICIPANTS,
    ACTIVITY,
    SECTIONS,
    CATEGORIES,
];

fn io_err(e: impl std::fmt::Display) -> QuireError {
    QuireError::IoError(e.to_string())
}

fn encode<T: Serialize>(row: &T) -> Result<Vec<u8>, QuireError> {
    postcard::to_allocvec(row).map_err(|e| QuireError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, QuireError> {
    postcard::from_bytes(bytes).map_err(|e| QuireError::DeserializationError(e.to_string()))
}

/// A disk-backed workflow store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a workflow database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QuireError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(SUBMISSIONS).map_err(io_err)?;
            for table in SCOPED_TABLES {
                let _ = write_txn.open_table(table).map_err(io_err)?;
            }
            let _ = write_txn.open_table(SETTINGS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Compact the database.
    pub fn compact(&mut self) -> Result<(), QuireError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }

    /// Number of stored submissions.
    pub fn submission_count(&self) -> Result<u64, QuireError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SUBMISSIONS).map_err(io_err)?;
        table.len().map_err(io_err)
    }

    fn put_scoped<T: Serialize>(
        &self,
        def: ScopedTable,
        key: (u64, u64),
        row: &T,
    ) -> Result<(), QuireError> {
        let bytes = encode(row)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(def).map_err(io_err)?;
            table.insert(key, bytes.as_slice()).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn get_scoped<T: DeserializeOwned>(
        &self,
        def: ScopedTable,
        key: (u64, u64),
    ) -> Result<Option<T>, QuireError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(def).map_err(io_err)?;
        match table.get(key).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn scan_scoped<T: DeserializeOwned>(
        &self,
        def: ScopedTable,
        scope: u64,
    ) -> Result<Vec<T>, QuireError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(def).map_err(io_err)?;

        let mut rows = Vec::new();
        for entry in table
            .range((scope, 0u64)..=(scope, u64::MAX))
            .map_err(io_err)?
        {
            let (_key, value) = entry.map_err(io_err)?;
            rows.push(decode(value.value())?);
        }
        Ok(rows)
    }

    fn read_sequence(&self, seq: Sequence) -> Result<u64, QuireError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(METADATA).map_err(io_err)?;
        Ok(table
            .get(seq.key())
            .map_err(io_err)?
            .map(|v| v.value())
            .unwrap_or(0))
    }
}

impl WorkflowStore for RedbStore {
    fn next_id(&mut self, seq: Sequence) -> Result<u64, QuireError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let next = {
            let mut table = write_txn.open_table(METADATA).map_err(io_err)?;
            let current = table
                .get(seq.key())
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            let next = current.saturating_add(1);
            table.insert(seq.key(), next).map_err(io_err)?;
            next
        };
        write_txn.commit().map_err(io_err)?;
        Ok(next)
    }

    fn peek_id(&self, seq: Sequence) -> Result<u64, QuireError> {
        Ok(self.read_sequence(seq)?.saturating_add(1))
    }

    fn ensure_sequence(&mut self, seq: Sequence, floor: u64) -> Result<(), QuireError> {
        if self.read_sequence(seq)? >= floor {
            return Ok(());
        }
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(METADATA).map_err(io_err)?;
            table.insert(seq.key(), floor).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn put_submission(&mut self, submission: &Submission) -> Result<(), QuireError> {
        let bytes = encode(submission)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(SUBMISSIONS).map_err(io_err)?;
            table
                .insert(submission.id.value(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn submission(&self, id: SubmissionId) -> Result<Option<Submission>, QuireError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SUBMISSIONS).map_err(io_err)?;
        match table.get(id.value()).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn submissions(&self) -> Result<Vec<Submission>, QuireError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SUBMISSIONS).map_err(io_err)?;

        let mut rows = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_key, value) = entry.map_err(io_err)?;
            rows.push(decode(value.value())?);
        }
        Ok(rows)
    }

    fn put_file(&mut self, file: &SubmissionFile) -> Result<(), QuireError> {
        self.put_scoped(FILES, (file.submission_id.value(), file.id.value()), file)
    }

    fn file(
        &self,
        submission: SubmissionId,
        id: FileId,
    ) -> Result<Option<SubmissionFile>, QuireError> {
        self.get_scoped(FILES, (submission.value(), id.value()))
    }

    fn files(&self, submission: SubmissionId) -> Result<Vec<SubmissionFile>, QuireError> {
        self.scan_scoped(FILES, submission.value())
    }

    fn put_galley(&mut self, galley: &Galley) -> Result<(), QuireError> {
        self.put_scoped(
            GALLEYS,
            (galley.submission_id.value(), galley.id.value()),
            galley,
        )
    }

    fn galleys(&self, submission: SubmissionId) -> Result<Vec<Galley>, QuireError> {
        self.scan_scoped(GALLEYS, submission.value())
    }

    fn put_review_round(&mut self, round: &ReviewRound) -> Result<(), QuireError> {
        self.put_scoped(
            REVIEW_ROUNDS,
            (round.submission_id.value(), round.id.value()),
            round,
        )
    }

    fn review_rounds(&self, submission: SubmissionId) -> Result<Vec<ReviewRound>, QuireError> {
        self.scan_scoped(REVIEW_ROUNDS, submission.value())
    }

    fn put_query(&mut self, query: &Query) -> Result<(), QuireError> {
        self.put_scoped(
            QUERIES,
            (query.submission_id.value(), query.id.value()),
            query,
        )
    }

    fn query(&self, submission: SubmissionId, id: QueryId) -> Result<Option<Query>, QuireError> {
        self.get_scoped(QUERIES, (submission.value(), id.value()))
    }

    fn queries(&self, submission: SubmissionId) -> Result<Vec<Query>, QuireError> {
        self.scan_scoped(QUERIES, submission.value())
    }

    fn put_participant(&mut self, participant: &Participant) -> Result<(), QuireError> {
        self.put_scoped(
            PARTICIPANTS,
            (
                participant.submission_id.value(),
                participant.user_id.value(),
            ),
            participant,
        )
    }

    fn participants(&self, submission: SubmissionId) -> Result<Vec<Participant>, QuireError> {
        self.scan_scoped(PARTICIPANTS, submission.value())
    }

    fn append_activity(&mut self, entry: &ActivityEntry) -> Result<(), QuireError> {
        self.put_scoped(
            ACTIVITY,
            (entry.submission_id.value(), entry.id.value()),
            entry,
        )
    }

    fn activity(&self, submission: SubmissionId) -> Result<Vec<ActivityEntry>, QuireError> {
        self.scan_scoped(ACTIVITY, submission.value())
    }

    fn journals(&self) -> Result<Vec<JournalId>, QuireError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let mut journals = BTreeSet::new();

        let submissions = read_txn.open_table(SUBMISSIONS).map_err(io_err)?;
        for entry in submissions.iter().map_err(io_err)? {
            let (_key, value) = entry.map_err(io_err)?;
            let submission: Submission = decode(value.value())?;
            journals.insert(submission.journal_id);
        }

        let settings = read_txn.open_table(SETTINGS).map_err(io_err)?;
        for entry in settings.iter().map_err(io_err)? {
            let (key, _value) = entry.map_err(io_err)?;
            let (journal_id, _name, _locale) = key.value();
            journals.insert(JournalId(journal_id));
        }

        for def in [SECTIONS, CATEGORIES] {
            let table = read_txn.open_table(def).map_err(io_err)?;
            for entry in table.iter().map_err(io_err)? {
                let (key, _value) = entry.map_err(io_err)?;
                let (journal_id, _id) = key.value();
                journals.insert(JournalId(journal_id));
            }
        }

        Ok(journals.into_iter().collect())
    }

    fn put_setting(&mut self, setting: &JournalSetting) -> Result<(), QuireError> {
        let bytes = encode(setting)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(SETTINGS).map_err(io_err)?;
            table
                .insert(
                    (
                        setting.journal_id.value(),
                        setting.name.as_str(),
                        setting.locale.as_str(),
                    ),
                    bytes.as_slice(),
                )
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn settings(&self, journal: JournalId) -> Result<Vec<JournalSetting>, QuireError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SETTINGS).map_err(io_err)?;

        let mut rows = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (key, value) = entry.map_err(io_err)?;
            let (journal_id, _name, _locale) = key.value();
            if journal_id == journal.value() {
                rows.push(decode(value.value())?);
            }
        }
        Ok(rows)
    }

    fn put_section(&mut self, section: &Section) -> Result<(), QuireError> {
        self.put_scoped(
            SECTIONS,
            (section.journal_id.value(), section.id.value()),
            section,
        )
    }

    fn sections(&self, journal: JournalId) -> Result<Vec<Section>, QuireError> {
        self.scan_scoped(SECTIONS, journal.value())
    }

    fn put_category(&mut self, category: &Category) -> Result<(), QuireError> {
        self.put_scoped(
            CATEGORIES,
            (category.journal_id.value(), category.id.value()),
            category,
        )
    }

    fn categories(&self, journal: JournalId) -> Result<Vec<Category>, QuireError> {
        self.scan_scoped(CATEGORIES, journal.value())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingType;
    use crate::submission::SubmissionStatus;
    use crate::workflow::Stage;
    use crate::{Timestamp, UserId};
    use tempfile::tempdir;

    fn submission(id: u64) -> Submission {
        Submission {
            id: SubmissionId(id),
            journal_id: JournalId(1),
            title: format!("Submission {id}"),
            author_id: UserId(3),
            stage: Stage::Submission,
            status: SubmissionStatus::Submitted,
            is_archived: false,
            submitted_at: Timestamp(1),
            updated_at: Timestamp(1),
        }
    }

    #[test]
    fn debug_hides_the_database_handle() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("debug.redb")).expect("open db");
        assert_eq!(format!("{store:?}"), "RedbStore { .. }");
    }

    #[test]
    fn submission_round_trip() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        store.put_submission(&submission(1)).expect("put");
        store.put_submission(&submission(2)).expect("put");

        assert_eq!(
            store.submission(SubmissionId(2)).expect("get"),
            Some(submission(2))
        );
        assert_eq!(store.submission(SubmissionId(9)).expect("get"), None);
        assert_eq!(store.submission_count().expect("count"), 2);
    }

    #[test]
    fn persistence() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            store.put_submission(&submission(1)).expect("put");
            assert_eq!(store.next_id(Sequence::Submission).expect("id"), 1);
        }

        let mut store = RedbStore::open(&db_path).expect("reopen db");
        assert!(store.submission(SubmissionId(1)).expect("get").is_some());
        assert_eq!(store.next_id(Sequence::Submission).expect("id"), 2);
    }

    #[test]
    fn ensure_sequence_raises_counter() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        store.ensure_sequence(Sequence::File, 41).expect("ensure");
        store.ensure_sequence(Sequence::File, 7).expect("ensure");
        assert_eq!(store.next_id(Sequence::File).expect("id"), 42);
    }

    #[test]
    fn settings_filtered_by_journal() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        for (journal, locale) in [(1, "en_US"), (1, "id_ID"), (2, "en_US")] {
            store
                .put_setting(&JournalSetting {
                    journal_id: JournalId(journal),
                    name: "title".into(),
                    locale: locale.into(),
                    value: format!("Journal {journal}"),
                    setting_type: SettingType::String,
                })
                .expect("put");
        }
        assert_eq!(store.settings(JournalId(1)).expect("settings").len(), 2);
        assert_eq!(store.settings(JournalId(3)).expect("settings").len(), 0);
    }
}
