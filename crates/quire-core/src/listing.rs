//! # Listing and Dashboard
//!
//! Filtered submission lists and the per-queue counters of the editor
//! dashboard.
//!
//! A submission is *assigned* when at least one participant holds an
//! editorial role on it. Every queue except `Archived` skips archived rows.

use crate::primitives::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::submission::{Participant, Submission};
use crate::workflow::Stage;
use crate::{QuireError, UserId};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

// =============================================================================
// SUMMARY
// =============================================================================

/// A submission with the editors assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub submission: Submission,
    /// Users holding an editorial role, sorted.
    pub assignees: Vec<UserId>,
}

impl SubmissionSummary {
    /// Build a summary from a submission and its participants.
    #[must_use]
    pub fn new(submission: Submission, participants: &[Participant]) -> Self {
        let mut assignees: Vec<UserId> = participants
            .iter()
            .filter(|p| p.submission_id == submission.id && p.role.is_editorial())
            .map(|p| p.user_id)
            .collect();
        assignees.sort_unstable();
        assignees.dedup();
        Self {
            submission,
            assignees,
        }
    }

    fn is_active(&self) -> bool {
        !self.submission.is_archived
    }
}

// =============================================================================
// FILTER
// =============================================================================

/// Which list of submissions to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Queue {
    #[default]
    All,
    Mine(UserId),
    Unassigned,
    Archived,
}

impl Queue {
    /// Parse a queue name. `mine` needs the requesting user.
    pub fn parse(name: &str, user: Option<UserId>) -> Result<Self, QuireError> {
        match name {
            "" | "all" => Ok(Queue::All),
            "mine" | "my" => user
                .map(Queue::Mine)
                .ok_or_else(|| QuireError::validation("queue \"mine\" requires a user")),
            "unassigned" => Ok(Queue::Unassigned),
            "archived" => Ok(Queue::Archived),
            other => Err(QuireError::validation(format!("Invalid queue: {other:?}"))),
        }
    }

    fn matches(self, summary: &SubmissionSummary) -> bool {
        match self {
            Queue::All => summary.is_active(),
            Queue::Mine(user) => {
                summary.is_active() && summary.assignees.binary_search(&user).is_ok()
            }
            Queue::Unassigned => summary.is_active() && summary.assignees.is_empty(),
            Queue::Archived => !summary.is_active(),
        }
    }
}

/// Listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFilter {
    pub queue: Queue,
    pub stage: Option<Stage>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPage {
    /// Rows matching the filter before paging.
    pub total: usize,
    pub items: Vec<SubmissionSummary>,
}

impl SubmissionFilter {
    /// Effective page size.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)
    }

    /// Whether `summary` passes the queue, stage and search filters.
    #[must_use]
    pub fn matches(&self, summary: &SubmissionSummary) -> bool {
        if !self.queue.matches(summary) {
            return false;
        }
        if let Some(stage) = self.stage {
            if summary.submission.stage != stage {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => summary
                .submission
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }

    /// Filter, order (newest update first, then id) and page `summaries`.
    #[must_use]
    pub fn apply(&self, summaries: Vec<SubmissionSummary>) -> SubmissionPage {
        let mut rows: Vec<SubmissionSummary> =
            summaries.into_iter().filter(|s| self.matches(s)).collect();
        rows.sort_by_key(|s| (Reverse(s.submission.updated_at), s.submission.id));
        let total = rows.len();
        let items = rows
            .into_iter()
            .skip(self.offset)
            .take(self.effective_limit())
            .collect();
        SubmissionPage { total, items }
    }
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// Counters shown on the editor dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub my_queue: usize,
    pub unassigned: usize,
    pub submission: usize,
    pub review: usize,
    pub copyediting: usize,
    pub production: usize,
    pub all_active: usize,
    pub archived: usize,
}

impl DashboardStats {
    /// Count `summaries` from the point of view of `user`.
    #[must_use]
    pub fn compute(summaries: &[SubmissionSummary], user: Option<UserId>) -> Self {
        let mut stats = Self::default();
        for summary in summaries {
            if !summary.is_active() {
                stats.archived = stats.archived.saturating_add(1);
                continue;
            }
            stats.all_active = stats.all_active.saturating_add(1);
            if summary.assignees.is_empty() {
                stats.unassigned = stats.unassigned.saturating_add(1);
            }
            if let Some(user) = user {
                if Queue::Mine(user).matches(summary) {
                    stats.my_queue = stats.my_queue.saturating_add(1);
                }
            }
            let counter = match summary.submission.stage {
                Stage::Submission => &mut stats.submission,
                Stage::Review => &mut stats.review,
                Stage::Copyediting => &mut stats.copyediting,
                Stage::Production => &mut stats.production,
            };
            *counter = counter.saturating_add(1);
        }
        stats
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::{Role, SubmissionStatus};
    use crate::{JournalId, SubmissionId, Timestamp};

    fn summary(id: u64, title: &str, stage: Stage, updated: u64, archived: bool) -> SubmissionSummary {
        SubmissionSummary {
            submission: Submission {
                id: SubmissionId(id),
                journal_id: JournalId(1),
                title: title.into(),
                author_id: UserId(100),
                stage,
                status: SubmissionStatus::Submitted,
                is_archived: archived,
                submitted_at: Timestamp(1),
                updated_at: Timestamp(updated),
            },
            assignees: Vec::new(),
        }
    }

    fn sample() -> Vec<SubmissionSummary> {
        let mut assigned = summary(2, "Ocean Acidification Trends", Stage::Review, 30, false);
        assigned.assignees = vec![UserId(5)];
        vec![
            summary(1, "Coral Reef Recovery", Stage::Submission, 20, false),
            assigned,
            summary(3, "Ocean Heat Content", Stage::Production, 30, false),
            summary(4, "Archived Study", Stage::Review, 40, true),
        ]
    }

    #[test]
    fn assignees_are_editorial_participants() {
        let s = summary(1, "t", Stage::Review, 1, false).submission;
        let participant = |user, role| Participant {
            submission_id: SubmissionId(1),
            user_id: UserId(user),
            role,
            stage: Stage::Submission,
            assigned_at: Timestamp(1),
            name: None,
        };
        let summary = SubmissionSummary::new(
            s,
            &[
                participant(9, Role::SectionEditor),
                participant(3, Role::Reviewer),
                participant(4, Role::Editor),
            ],
        );
        assert_eq!(summary.assignees, vec![UserId(4), UserId(9)]);
    }

    #[test]
    fn all_queue_orders_newest_first_then_id() {
        let page = SubmissionFilter::default().apply(sample());
        let ids: Vec<u64> = page.items.iter().map(|s| s.submission.id.value()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn search_is_case_insensitive() {
        let filter = SubmissionFilter {
            search: Some("ocean".into()),
            ..SubmissionFilter::default()
        };
        assert_eq!(filter.apply(sample()).total, 2);

        let filter = SubmissionFilter {
            search: Some("ARCHIVED".into()),
            queue: Queue::Archived,
            ..SubmissionFilter::default()
        };
        assert_eq!(filter.apply(sample()).total, 1);
    }

    #[test]
    fn queues_and_stage_filter() {
        let mine = SubmissionFilter {
            queue: Queue::Mine(UserId(5)),
            ..SubmissionFilter::default()
        };
        assert_eq!(mine.apply(sample()).total, 1);

        let unassigned = SubmissionFilter {
            queue: Queue::Unassigned,
            stage: Some(Stage::Production),
            ..SubmissionFilter::default()
        };
        assert_eq!(unassigned.apply(sample()).total, 1);
    }

    #[test]
    fn limit_is_capped_and_offset_applies() {
        let filter = SubmissionFilter {
            limit: Some(1000),
            ..SubmissionFilter::default()
        };
        assert_eq!(filter.effective_limit(), MAX_LIST_LIMIT);

        let filter = SubmissionFilter {
            limit: Some(1),
            offset: 1,
            ..SubmissionFilter::default()
        };
        let page = filter.apply(sample());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].submission.id, SubmissionId(3));
    }

    #[test]
    fn queue_parse() {
        assert_eq!(Queue::parse("all", None).expect("all"), Queue::All);
        assert!(Queue::parse("mine", None).is_err());
        assert_eq!(
            Queue::parse("mine", Some(UserId(2))).expect("mine"),
            Queue::Mine(UserId(2))
        );
        assert!(Queue::parse("drafts", None).is_err());
    }

    #[test]
    fn dashboard_counts() {
        let stats = DashboardStats::compute(&sample(), Some(UserId(5)));
        assert_eq!(
            stats,
            DashboardStats {
                my_queue: 1,
                unassigned: 2,
                submission: 1,
                review: 1,
                copyediting: 0,
                production: 1,
                all_active: 3,
                archived: 1,
            }
        );
    }
}
