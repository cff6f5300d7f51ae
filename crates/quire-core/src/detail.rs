//! # Submission Detail
//!
//! The aggregate read model of one submission and its projection into
//! stage panels.
//!
//! ## Consistency
//!
//! [`SubmissionDetail::assemble`] is the only constructor. It rejects any row
//! that belongs to a different submission and fixes the ordering of every
//! list, so two details built from the same rows are always equal.
//!
//! | List | Order | Limit |
//! |---------------|------------------------------|-------------------------|
//! | files | newest upload first, then id | [`MAX_DETAIL_FILES`] |
//! | galleys | sequence, then id | |
//! | review rounds | round number, then id | |
//! | queries | stage, then seq | |
//! | participants | stage, then user | |
//! | activity | newest first, then id | [`MAX_DETAIL_ACTIVITY`] |

use crate::activity::ActivityEntry;
use crate::file::{Galley, SubmissionFile};
use crate::primitives::{MAX_DETAIL_ACTIVITY, MAX_DETAIL_FILES};
use crate::query::Query;
use crate::review::ReviewRound;
use crate::submission::{Participant, Role, Submission};
use crate::workflow::{
    Stage, StageOutline, WorkflowViewState, can_upload_file, is_past_stage,
};
use crate::{QuireError, SubmissionId, UserId};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Raw rows loaded for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRows {
    pub files: Vec<SubmissionFile>,
    pub galleys: Vec<Galley>,
    pub review_rounds: Vec<ReviewRound>,
    pub queries: Vec<Query>,
    pub participants: Vec<Participant>,
    pub activity: Vec<ActivityEntry>,
}

/// Everything shown on a submission's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDetail {
    pub submission: Submission,
    pub files: Vec<SubmissionFile>,
    pub galleys: Vec<Galley>,
    pub review_rounds: Vec<ReviewRound>,
    pub queries: Vec<Query>,
    pub participants: Vec<Participant>,
    pub activity: Vec<ActivityEntry>,
}

/// The part of a detail that belongs to one stage tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePanel {
    pub stage: Stage,
    pub completed: bool,
    pub current: bool,
    pub can_upload: bool,
    pub files: Vec<SubmissionFile>,
    pub review_rounds: Vec<ReviewRound>,
    pub queries: Vec<Query>,
    pub participants: Vec<Participant>,
    pub galleys: Vec<Galley>,
}

/// Everything the workflow page shows for one restored view state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowView {
    pub state: WorkflowViewState,
    pub outline: StageOutline,
    pub panel: StagePanel,
}

fn check_owner(
    expected: SubmissionId,
    found: SubmissionId,
    what: &str,
    id: impl std::fmt::Display,
) -> Result<(), QuireError> {
    if expected == found {
        Ok(())
    } else {
        Err(QuireError::InconsistentDetail(format!(
            "{what} {id} belongs to submission {found}, not {expected}"
        )))
    }
}

impl SubmissionDetail {
    /// Build a detail from `submission` and its rows.
    pub fn assemble(submission: Submission, rows: DetailRows) -> Result<Self, QuireError> {
        let DetailRows {
            mut files,
            mut galleys,
            mut review_rounds,
            mut queries,
            mut participants,
            mut activity,
        } = rows;
        let id = submission.id;

        for f in &files {
            check_owner(id, f.submission_id, "file", f.id)?;
        }
        for g in &galleys {
            check_owner(id, g.submission_id, "galley", g.id)?;
        }
        for r in &review_rounds {
            check_owner(id, r.submission_id, "review round", r.id)?;
        }
        for q in &queries {
            check_owner(id, q.submission_id, "query", q.id)?;
            for note in &q.notes {
                if note.query_id != q.id {
                    return Err(QuireError::InconsistentDetail(format!(
                        "note {} does not belong to query {}",
                        note.id, q.id
                    )));
                }
            }
        }
        for p in &participants {
            check_owner(id, p.submission_id, "participant", p.user_id)?;
        }
        for a in &activity {
            check_owner(id, a.submission_id, "activity", a.id)?;
        }

        files.sort_by_key(|f| (Reverse(f.uploaded_at), Reverse(f.id)));
        files.truncate(MAX_DETAIL_FILES);
        galleys.sort_by_key(|g| (g.sequence, g.id));
        review_rounds.sort_by_key(|r| (r.round, r.id));
        queries.sort_by_key(|q| (q.stage, q.seq, q.id));
        participants.sort_by_key(|p| (p.stage, p.user_id));
        activity.sort_by_key(|a| (Reverse(a.created_at), Reverse(a.id)));
        activity.truncate(MAX_DETAIL_ACTIVITY);

        Ok(Self {
            submission,
            files,
            galleys,
            review_rounds,
            queries,
            participants,
            activity,
        })
    }

    /// The submission's current stage.
    #[must_use]
    pub fn current_stage(&self) -> Stage {
        self.submission.stage
    }

    /// Stage tabs for this submission.
    #[must_use]
    pub fn outline(&self) -> StageOutline {
        StageOutline::for_stage(self.current_stage())
    }

    /// Role of `user` on this submission, if any.
    ///
    /// A participant record wins; otherwise the submission's author is `author`.
    #[must_use]
    pub fn role_of(&self, user: UserId) -> Option<Role> {
        self.participants
            .iter()
            .find(|p| p.user_id == user)
            .map(|p| p.role)
            .or_else(|| (self.submission.author_id == user).then_some(Role::Author))
    }

    /// Project the detail onto one stage tab.
    pub fn stage_panel(&self, stage: Stage) -> Result<StagePanel, QuireError> {
        let current = self.current_stage();
        if stage > current {
            return Err(QuireError::StageNotReached {
                requested: stage,
                current,
            });
        }

        let galleys = if stage == Stage::Production {
            self.galleys.clone()
        } else {
            Vec::new()
        };

        Ok(StagePanel {
            stage,
            completed: is_past_stage(stage, current),
            current: stage == current,
            can_upload: stage == current && can_upload_file(current),
            files: self
                .files
                .iter()
                .filter(|f| f.stage == stage)
                .cloned()
                .collect(),
            review_rounds: self
                .review_rounds
                .iter()
                .filter(|r| r.stage == stage)
                .cloned()
                .collect(),
            queries: self
                .queries
                .iter()
                .filter(|q| q.stage == stage)
                .cloned()
                .collect(),
            participants: self
                .participants
                .iter()
                .filter(|p| p.stage == stage)
                .cloned()
                .collect(),
            galleys,
        })
    }

    /// Restore the workflow page from its `tab` and `stage` query parameters.
    pub fn workflow_view(
        &self,
        tab: Option<&str>,
        stage: Option<&str>,
    ) -> Result<WorkflowView, QuireError> {
        let state = WorkflowViewState::restore(self.current_stage(), tab, stage)?;
        let panel = self.stage_panel(state.active_stage)?;
        Ok(WorkflowView {
            outline: state.outline(),
            state,
            panel,
        })
    }

    /// What `user`, as an author, may see: files shared with authors or
    /// uploaded by them, and the queries they take part in.
    #[must_use]
    pub fn for_author(&self, user: UserId) -> Self {
        let mut detail = self.clone();
        detail
            .files
            .retain(|f| f.visible_to_authors || f.uploaded_by == user);
        detail.queries.retain(|q| q.is_participant(user));
        detail
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileKind;
    use crate::submission::SubmissionStatus;
    use crate::{FileId, JournalId, QueryId, Timestamp};

    fn submission(stage: Stage) -> Submission {
        Submission {
            id: SubmissionId(1),
            journal_id: JournalId(1),
            title: "Salt Marsh Carbon".into(),
            author_id: UserId(7),
            stage,
            status: SubmissionStatus::InReview,
            is_archived: false,
            submitted_at: Timestamp(10),
            updated_at: Timestamp(10),
        }
    }

    fn file(id: u64, submission: u64, stage: Stage, at: u64) -> SubmissionFile {
        SubmissionFile {
            id: FileId(id),
            submission_id: SubmissionId(submission),
            stage,
            kind: FileKind::default(),
            label: format!("file {id}"),
            original_name: "f.pdf".into(),
            mime_type: "application/pdf".into(),
            size: 10,
            storage_path: format!("submissions/{submission}/{stage}/{at}-f.pdf"),
            version_label: None,
            round: 1,
            review_round_id: None,
            visible_to_authors: false,
            uploaded_by: UserId(2),
            uploaded_at: Timestamp(at),
        }
    }

    fn query(id: u64, stage: Stage, seq: u32, participants: Vec<UserId>) -> Query {
        Query {
            id: QueryId(id),
            submission_id: SubmissionId(1),
            stage,
            seq,
            posted_at: Timestamp(1),
            modified_at: None,
            closed: false,
            participants,
            notes: Vec::new(),
        }
    }

    #[test]
    fn foreign_rows_are_rejected() {
        let rows = DetailRows {
            files: vec![file(1, 1, Stage::Submission, 5), file(2, 2, Stage::Submission, 6)],
            ..DetailRows::default()
        };
        let err = SubmissionDetail::assemble(submission(Stage::Review), rows)
            .expect_err("foreign file");
        assert!(matches!(err, QuireError::InconsistentDetail(_)));
    }

    #[test]
    fn files_newest_first_and_capped() {
        let files = (0..60)
            .map(|i| file(i, 1, Stage::Submission, i))
            .collect();
        let rows = DetailRows {
            files,
            ..DetailRows::default()
        };
        let detail = SubmissionDetail::assemble(submission(Stage::Review), rows).expect("detail");
        assert_eq!(detail.files.len(), MAX_DETAIL_FILES);
        assert_eq!(detail.files[0].id, FileId(59));
        assert!(
            detail
                .files
                .windows(2)
                .all(|w| w[0].uploaded_at >= w[1].uploaded_at)
        );
    }

    #[test]
    fn queries_sorted_by_stage_then_seq() {
        let rows = DetailRows {
            queries: vec![
                query(1, Stage::Review, 2, vec![]),
                query(2, Stage::Submission, 1, vec![]),
                query(3, Stage::Review, 1, vec![]),
            ],
            ..DetailRows::default()
        };
        let detail = SubmissionDetail::assemble(submission(Stage::Review), rows).expect("detail");
        let ids: Vec<u64> = detail.queries.iter().map(|q| q.id.value()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn stage_panel_filters_and_rejects_unreached() {
        let rows = DetailRows {
            files: vec![file(1, 1, Stage::Submission, 5), file(2, 1, Stage::Review, 6)],
            ..DetailRows::default()
        };
        let detail = SubmissionDetail::assemble(submission(Stage::Review), rows).expect("detail");

        let panel = detail.stage_panel(Stage::Submission).expect("panel");
        assert!(panel.completed);
        assert!(!panel.can_upload);
        assert_eq!(panel.files.len(), 1);

        let panel = detail.stage_panel(Stage::Review).expect("panel");
        assert!(panel.current);
        assert!(panel.can_upload);

        let err = detail
            .stage_panel(Stage::Copyediting)
            .expect_err("not reached");
        assert!(matches!(err, QuireError::StageNotReached { .. }));
    }

    #[test]
    fn author_projection() {
        let mut shared = file(1, 1, Stage::Review, 5);
        shared.visible_to_authors = true;
        let mut own = file(2, 1, Stage::Submission, 4);
        own.uploaded_by = UserId(7);
        let hidden = file(3, 1, Stage::Review, 6);

        let rows = DetailRows {
            files: vec![shared, own, hidden],
            queries: vec![
                query(1, Stage::Review, 1, vec![UserId(2), UserId(7)]),
                query(2, Stage::Review, 2, vec![UserId(2), UserId(3)]),
            ],
            ..DetailRows::default()
        };
        let detail = SubmissionDetail::assemble(submission(Stage::Review), rows).expect("detail");
        let author = detail.for_author(UserId(7));

        let files: Vec<u64> = author.files.iter().map(|f| f.id.value()).collect();
        assert_eq!(files, vec![1, 2]);
        assert_eq!(author.queries.len(), 1);
        assert_eq!(detail.role_of(UserId(7)), Some(Role::Author));
        assert_eq!(detail.role_of(UserId(99)), None);
    }

    #[test]
    fn workflow_view_clamps_stage() {
        let detail =
            SubmissionDetail::assemble(submission(Stage::Review), DetailRows::default())
                .expect("detail");
        let view = detail
            .workflow_view(Some("workflow"), Some("production"))
            .expect("view");
        assert_eq!(view.state.active_stage, Stage::Review);
        assert_eq!(view.panel.stage, Stage::Review);
        assert_eq!(view.outline.tabs.len(), 2);

        assert!(detail.workflow_view(Some("history"), None).is_err());
    }
}
