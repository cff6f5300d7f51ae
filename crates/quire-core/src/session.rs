//! # Session Module
//!
//! The editorial operations of Quire on top of a [`WorkflowStore`].
//!
//! Every mutating operation checks input first, then loads the submission,
//! then checks the caller's role, and only then writes. A write that
//! succeeds is followed by one activity entry.
//!
//! ## Storage Backends
//!
//! Session supports two storage backends:
//! - `InMemory`: Uses [`MemoryStore`] (fast, volatile unless exported)
//! - `Persistent`: Uses [`RedbStore`] for disk-backed ACID storage
//!
//! File content is not owned by the session. Uploads receive a
//! [`BlobStore`] from the caller so the app layer can lock it separately.

use crate::activity::{ActivityCategory, NewActivity};
use crate::blob::BlobStore;
use crate::detail::{DetailRows, SubmissionDetail, WorkflowView};
use crate::file::{SubmissionFile, storage_path};
use crate::formats::Snapshot;
use crate::listing::{DashboardStats, SubmissionFilter, SubmissionPage, SubmissionSummary};
use crate::query::{NewNote, NewQuery, Query, QueryNote, next_seq};
use crate::settings::{Category, JournalSetting, Section, resolve_setting};
use crate::storage::RedbStore;
use crate::store::{MemoryStore, Sequence, WorkflowStore};
use crate::submission::{Participant, Role, Submission, SubmissionDraft, SubmissionStatus};
use crate::upload::{UploadRequest, authorize_upload};
use crate::workflow::{Stage, WorkflowChange};
use crate::{
    ActivityId, FileId, JournalId, NoteId, QueryId, QuireError, SubmissionId, Timestamp, UserId,
};
use std::collections::BTreeSet;
use std::path::Path;

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory tables (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed tables using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

/// High-level access to submissions and their workflow.
#[derive(Debug, Default)]
pub struct Session {
    backend: StorageBackend,
}

impl Session {
    /// Create a new empty session with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, QuireError> {
        Ok(Self::with_redb_store(RedbStore::open(path)?))
    }

    /// Create a session from an already opened redb store.
    #[must_use]
    pub fn with_redb_store(store: RedbStore) -> Self {
        Self {
            backend: StorageBackend::Persistent(store),
        }
    }

    /// Check if this session uses persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    fn store(&self) -> &dyn WorkflowStore {
        match &self.backend {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }

    fn store_mut(&mut self) -> &mut dyn WorkflowStore {
        match &mut self.backend {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }

    // =========================================================================
    // INTERNAL HELPERS
    // =========================================================================

    fn record(
        &mut self,
        submission: SubmissionId,
        activity: NewActivity,
        now: Timestamp,
    ) -> Result<(), QuireError> {
        let id = ActivityId(self.store_mut().next_id(Sequence::Activity)?);
        let entry = activity.into_entry(id, submission, now);
        self.store_mut().append_activity(&entry)
    }

    fn touch(&mut self, mut submission: Submission, now: Timestamp) -> Result<(), QuireError> {
        if now > submission.updated_at {
            submission.updated_at = now;
            self.store_mut().put_submission(&submission)?;
        }
        Ok(())
    }

    fn require_editorial(
        &self,
        id: SubmissionId,
        actor: UserId,
    ) -> Result<Submission, QuireError> {
        let submission = self.submission(id)?;
        match self.role_of(id, actor)? {
            Some(role) if role.is_editorial() => Ok(submission),
            Some(role) => Err(QuireError::Forbidden(format!(
                "role {role} cannot manage the workflow"
            ))),
            None => Err(QuireError::Forbidden(
                "not a participant of this submission".to_string(),
            )),
        }
    }

    fn summaries(&self) -> Result<Vec<SubmissionSummary>, QuireError> {
        let store = self.store();
        store
            .submissions()?
            .into_iter()
            .map(|submission| -> Result<SubmissionSummary, QuireError> {
                let participants = store.participants(submission.id)?;
                Ok(SubmissionSummary::new(submission, &participants))
            })
            .collect()
    }

    // =========================================================================
    // SUBMISSIONS
    // =========================================================================

    /// Create a submission in the first stage.
    pub fn create_submission(
        &mut self,
        draft: &SubmissionDraft,
        now: Timestamp,
    ) -> Result<Submission, QuireError> {
        let title = draft.validated_title()?;
        let id = SubmissionId(self.store_mut().next_id(Sequence::Submission)?);
        let submission = Submission {
            id,
            journal_id: draft.journal_id,
            title,
            author_id: draft.author_id,
            stage: Stage::Submission,
            status: SubmissionStatus::Submitted,
            is_archived: false,
            submitted_at: now,
            updated_at: now,
        };
        self.store_mut().put_submission(&submission)?;
        self.record(
            id,
            NewActivity::new(
                ActivityCategory::Submission,
                "Submission created.",
                draft.author_id,
            ),
            now,
        )?;
        Ok(submission)
    }

    /// Load a submission.
    pub fn submission(&self, id: SubmissionId) -> Result<Submission, QuireError> {
        self.store()
            .submission(id)?
            .ok_or(QuireError::SubmissionNotFound(id))
    }

    /// Assign `user` to a submission with `role`, replacing any previous
    /// assignment of that user.
    pub fn assign(
        &mut self,
        id: SubmissionId,
        user: UserId,
        role: Role,
        name: Option<String>,
        now: Timestamp,
    ) -> Result<Participant, QuireError> {
        let submission = self.submission(id)?;
        let participant = Participant {
            submission_id: id,
            user_id: user,
            role,
            stage: submission.stage,
            assigned_at: now,
            name,
        };
        self.store_mut().put_participant(&participant)?;
        self.record(
            id,
            NewActivity {
                category: ActivityCategory::Workflow,
                message: format!("Assigned user {user} as {role}."),
                actor_id: None,
            },
            now,
        )?;
        self.touch(submission, now)?;
        Ok(participant)
    }

    /// Role of `user` on a submission: their participant record, or author
    /// when they wrote it.
    pub fn role_of(&self, id: SubmissionId, user: UserId) -> Result<Option<Role>, QuireError> {
        let submission = self.submission(id)?;
        let assigned = self
            .store()
            .participants(id)?
            .into_iter()
            .find(|p| p.user_id == user)
            .map(|p| p.role);
        Ok(assigned.or_else(|| (submission.author_id == user).then_some(Role::Author)))
    }

    /// Load the full detail of a submission.
    pub fn detail(&self, id: SubmissionId) -> Result<SubmissionDetail, QuireError> {
        let submission = self.submission(id)?;
        let store = self.store();
        let rows = DetailRows {
            files: store.files(id)?,
            galleys: store.galleys(id)?,
            review_rounds: store.review_rounds(id)?,
            queries: store.queries(id)?,
            participants: store.participants(id)?,
            activity: store.activity(id)?,
        };
        SubmissionDetail::assemble(submission, rows)
    }

    /// Load the detail as `viewer` may see it. Authors get the author
    /// projection; everyone else the full detail.
    pub fn detail_for(
        &self,
        id: SubmissionId,
        viewer: Option<UserId>,
    ) -> Result<SubmissionDetail, QuireError> {
        let detail = self.detail(id)?;
        match viewer {
            Some(user) if detail.role_of(user) == Some(Role::Author) => {
                Ok(detail.for_author(user))
            }
            _ => Ok(detail),
        }
    }

    /// Restore the workflow page of a submission from query parameters.
    pub fn workflow_view(
        &self,
        id: SubmissionId,
        tab: Option<&str>,
        stage: Option<&str>,
    ) -> Result<WorkflowView, QuireError> {
        self.detail(id)?.workflow_view(tab, stage)
    }

    // =========================================================================
    // LISTING
    // =========================================================================

    /// One page of submissions matching `filter`.
    pub fn list(&self, filter: &SubmissionFilter) -> Result<SubmissionPage, QuireError> {
        Ok(filter.apply(self.summaries()?))
    }

    /// Dashboard counters, with `my_queue` computed for `user`.
    pub fn dashboard(&self, user: Option<UserId>) -> Result<DashboardStats, QuireError> {
        Ok(DashboardStats::compute(&self.summaries()?, user))
    }

    /// Number of submissions stored.
    pub fn submission_count(&self) -> Result<usize, QuireError> {
        Ok(self.store().submissions()?.len())
    }

    // =========================================================================
    // FILES
    // =========================================================================

    /// Upload a file to a stage of a submission.
    ///
    /// The bytes go to `blobs` first and the file id is only taken once
    /// they are stored. If recording the file row fails the blob is removed
    /// again so no orphan content stays behind. Once the row exists the
    /// upload has succeeded; the activity entry is best effort.
    pub fn upload(
        &mut self,
        id: SubmissionId,
        request: UploadRequest,
        blobs: &mut dyn BlobStore,
        now: Timestamp,
    ) -> Result<SubmissionFile, QuireError> {
        let upload = request.validate()?;
        let submission = self.submission(id)?;
        let role = self.role_of(id, upload.uploaded_by)?;
        authorize_upload(role, upload.stage, submission.stage)?;

        let size = u64::try_from(upload.file.bytes.len())
            .map_err(|_| QuireError::validation("file is too large"))?;
        let expected = FileId(self.store().peek_id(Sequence::File)?);
        let path = storage_path(
            id,
            upload.stage,
            now,
            expected,
            &upload.label,
            &upload.file.name,
        );

        blobs.put(&path, &upload.file.bytes)?;

        let row = match self.store_mut().next_id(Sequence::File) {
            Ok(file_id) => SubmissionFile {
                id: FileId(file_id),
                submission_id: id,
                stage: upload.stage,
                kind: upload.kind,
                label: upload.label,
                original_name: upload.file.name,
                mime_type: upload.file.mime_type,
                size,
                storage_path: path,
                version_label: upload.version_label,
                round: upload.round,
                review_round_id: upload.review_round_id,
                visible_to_authors: upload.visible_to_authors,
                uploaded_by: upload.uploaded_by,
                uploaded_at: now,
            },
            Err(e) => {
                let _ = blobs.remove(&path);
                return Err(e);
            }
        };
        if let Err(e) = self.store_mut().put_file(&row) {
            // best effort: the put_file error is the one reported
            let _ = blobs.remove(&row.storage_path);
            return Err(e);
        }

        let _ = self.record(
            id,
            NewActivity::new(
                ActivityCategory::Files,
                format!("Added file {} to stage {}.", row.label, row.stage),
                row.uploaded_by,
            ),
            now,
        );
        let _ = self.touch(submission, now);
        Ok(row)
    }

    /// Load one file row of a submission.
    pub fn file(&self, id: SubmissionId, file: FileId) -> Result<SubmissionFile, QuireError> {
        self.submission(id)?;
        self.store()
            .file(id, file)?
            .ok_or(QuireError::FileNotFound(file))
    }

    /// Copy files of a submission into another stage.
    ///
    /// Each copy is a new file row in `target` that shares the original's
    /// stored content. The actor becomes the uploader of the copies.
    /// Editorial roles only; `target` must be reached and every listed file
    /// must exist, otherwise nothing is copied.
    pub fn copy_files(
        &mut self,
        id: SubmissionId,
        actor: UserId,
        files: &[FileId],
        target: Stage,
        now: Timestamp,
    ) -> Result<Vec<SubmissionFile>, QuireError> {
        if files.is_empty() {
            return Err(QuireError::validation("at least one file is required"));
        }
        let submission = self.require_editorial(id, actor)?;
        if target > submission.stage {
            return Err(QuireError::StageNotReached {
                requested: target,
                current: submission.stage,
            });
        }

        let wanted: BTreeSet<FileId> = files.iter().copied().collect();
        let sources = wanted
            .iter()
            .map(|&file| {
                self.store()
                    .file(id, file)?
                    .ok_or(QuireError::FileNotFound(file))
            })
            .collect::<Result<Vec<_>, QuireError>>()?;

        let mut copies = Vec::with_capacity(sources.len());
        for source in sources {
            let copy = SubmissionFile {
                id: FileId(self.store_mut().next_id(Sequence::File)?),
                stage: target,
                uploaded_by: actor,
                uploaded_at: now,
                ..source
            };
            self.store_mut().put_file(&copy)?;
            copies.push(copy);
        }

        let _ = self.record(
            id,
            NewActivity::new(
                ActivityCategory::Files,
                format!("Copied {} file(s) to stage {target}.", copies.len()),
                actor,
            ),
            now,
        );
        let _ = self.touch(submission, now);
        Ok(copies)
    }

    // =========================================================================
    // WORKFLOW
    // =========================================================================

    /// Apply a stage and/or status change on behalf of an editorial user.
    pub fn apply_workflow(
        &mut self,
        id: SubmissionId,
        actor: UserId,
        change: &WorkflowChange,
        now: Timestamp,
    ) -> Result<Submission, QuireError> {
        change.validate()?;
        let submission = self.require_editorial(id, actor)?;
        let transition = change.apply(&submission, now)?;
        self.store_mut().put_submission(&transition.submission)?;
        self.record(
            id,
            NewActivity::new(ActivityCategory::Workflow, transition.message, actor),
            now,
        )?;
        Ok(transition.submission)
    }

    // =========================================================================
    // DISCUSSIONS
    // =========================================================================

    /// All queries of a submission, ordered by stage then seq.
    pub fn queries(&self, id: SubmissionId) -> Result<Vec<Query>, QuireError> {
        self.submission(id)?;
        let mut queries = self.store().queries(id)?;
        queries.sort_by_key(|q| (q.stage, q.seq, q.id));
        Ok(queries)
    }

    /// Open a discussion in a reached stage.
    pub fn create_query(
        &mut self,
        id: SubmissionId,
        actor: UserId,
        new: &NewQuery,
        now: Timestamp,
    ) -> Result<Query, QuireError> {
        let validated = new.validate(actor)?;
        let submission = self.require_editorial(id, actor)?;
        if validated.stage > submission.stage {
            return Err(QuireError::StageNotReached {
                requested: validated.stage,
                current: submission.stage,
            });
        }

        let seq = next_seq(&self.store().queries(id)?, validated.stage);
        let query_id = QueryId(self.store_mut().next_id(Sequence::Query)?);
        let note_id = NoteId(self.store_mut().next_id(Sequence::Note)?);
        let query = Query {
            id: query_id,
            submission_id: id,
            stage: validated.stage,
            seq,
            posted_at: now,
            modified_at: None,
            closed: false,
            participants: validated.participants,
            notes: vec![QueryNote {
                id: note_id,
                query_id,
                user_id: actor,
                title: validated.title,
                contents: validated.message,
                created_at: now,
            }],
        };
        self.store_mut().put_query(&query)?;

        let message = match query.title() {
            Some(title) => format!("Started discussion \"{title}\" in stage {}.", query.stage),
            None => format!("Started discussion in stage {}.", query.stage),
        };
        self.record(
            id,
            NewActivity::new(ActivityCategory::Discussion, message, actor),
            now,
        )?;
        self.touch(submission, now)?;
        Ok(query)
    }

    fn open_query(&self, id: SubmissionId, query: QueryId) -> Result<Query, QuireError> {
        let found = self
            .store()
            .query(id, query)?
            .ok_or(QuireError::QueryNotFound(query))?;
        if found.closed {
            return Err(QuireError::QueryClosed(query));
        }
        Ok(found)
    }

    /// Reply to an open discussion. Participants of the query and editorial
    /// users may reply.
    pub fn add_note(
        &mut self,
        id: SubmissionId,
        query: QueryId,
        actor: UserId,
        note: &NewNote,
        now: Timestamp,
    ) -> Result<Query, QuireError> {
        let (title, contents) = note.validate()?;
        let submission = self.submission(id)?;
        let mut found = self.open_query(id, query)?;

        let editorial = self.role_of(id, actor)?.is_some_and(Role::is_editorial);
        if !editorial && !found.is_participant(actor) {
            return Err(QuireError::Forbidden(
                "not a participant of this discussion".to_string(),
            ));
        }

        let note_id = NoteId(self.store_mut().next_id(Sequence::Note)?);
        found.notes.push(QueryNote {
            id: note_id,
            query_id: query,
            user_id: actor,
            title,
            contents,
            created_at: now,
        });
        found.modified_at = Some(now);
        self.store_mut().put_query(&found)?;
        self.record(
            id,
            NewActivity::new(
                ActivityCategory::Discussion,
                format!("Replied to discussion {} in stage {}.", found.seq, found.stage),
                actor,
            ),
            now,
        )?;
        self.touch(submission, now)?;
        Ok(found)
    }

    /// Close a discussion. Closed discussions accept no further notes.
    pub fn close_query(
        &mut self,
        id: SubmissionId,
        query: QueryId,
        actor: UserId,
        now: Timestamp,
    ) -> Result<Query, QuireError> {
        let submission = self.require_editorial(id, actor)?;
        let mut found = self.open_query(id, query)?;
        found.closed = true;
        found.modified_at = Some(now);
        self.store_mut().put_query(&found)?;
        self.record(
            id,
            NewActivity::new(
                ActivityCategory::Discussion,
                format!("Closed discussion {} in stage {}.", found.seq, found.stage),
                actor,
            ),
            now,
        )?;
        self.touch(submission, now)?;
        Ok(found)
    }

    // =========================================================================
    // JOURNAL SETTINGS
    // =========================================================================

    /// Resolve a journal setting for `locale`, falling back to `fallback`
    /// and then to the locale-independent value.
    pub fn setting(
        &self,
        journal: JournalId,
        name: &str,
        locale: &str,
        fallback: Option<&str>,
    ) -> Result<Option<JournalSetting>, QuireError> {
        let settings = self.store().settings(journal)?;
        Ok(resolve_setting(&settings, journal, name, locale, fallback).cloned())
    }

    /// Store or replace a journal setting.
    pub fn put_setting(&mut self, setting: &JournalSetting) -> Result<(), QuireError> {
        self.store_mut().put_setting(setting)
    }

    /// Sections of a journal ordered by sequence.
    pub fn sections(&self, journal: JournalId) -> Result<Vec<Section>, QuireError> {
        let mut sections = self.store().sections(journal)?;
        sections.sort_by_key(|s| (s.sequence, s.id));
        Ok(sections)
    }

    /// Categories of a journal ordered by sequence.
    pub fn categories(&self, journal: JournalId) -> Result<Vec<Category>, QuireError> {
        let mut categories = self.store().categories(journal)?;
        categories.sort_by_key(|c| (c.sequence, c.id));
        Ok(categories)
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Read every row into a snapshot.
    pub fn export_snapshot(&self) -> Result<Snapshot, QuireError> {
        Snapshot::capture(self.store())
    }

    /// Write every row of `snapshot` into this session.
    pub fn import_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), QuireError> {
        snapshot.restore_into(self.store_mut())
    }
}

// =============================================================================
// TESTS
// =============================================================================
