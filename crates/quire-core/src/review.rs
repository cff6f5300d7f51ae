//! # Review Rounds
//!
//! Numbered review rounds per stage and the reviewer assignments inside them.
//! Rounds are read-model data here; assigning reviewers happens elsewhere.

use crate::workflow::Stage;
use crate::{ReviewId, ReviewRoundId, SubmissionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// State of a review round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewRoundStatus {
    Pending,
    InReview,
    RevisionsRequested,
    Closed,
}

/// State of a single reviewer assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Invited,
    Accepted,
    Declined,
    Completed,
    Cancelled,
}

/// A reviewer's recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Accept,
    PendingRevisions,
    ResubmitHere,
    ResubmitElsewhere,
    Decline,
    SeeComments,
}

/// One reviewer assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub reviewer_id: UserId,
    pub assigned_at: Timestamp,
    pub due_at: Option<Timestamp>,
    pub status: ReviewStatus,
    pub recommendation: Option<Recommendation>,
    pub submitted_at: Option<Timestamp>,
}

/// A numbered review round and its assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRound {
    pub id: ReviewRoundId,
    pub submission_id: SubmissionId,
    pub stage: Stage,
    pub round: u32,
    pub status: ReviewRoundStatus,
    pub started_at: Timestamp,
    pub closed_at: Option<Timestamp>,
    pub notes: Option<String>,
    pub reviews: Vec<Review>,
}

impl ReviewRound {
    /// Reviews that have been submitted.
    pub fn completed_reviews(&self) -> impl Iterator<Item = &Review> {
        self.reviews
            .iter()
            .filter(|review| review.status == ReviewStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_reviews_filters_by_status() {
        let review = |id, status| Review {
            id: ReviewId(id),
            reviewer_id: UserId(id),
            assigned_at: Timestamp(10),
            due_at: None,
            status,
            recommendation: None,
            submitted_at: None,
        };
        let round = ReviewRound {
            id: ReviewRoundId(1),
            submission_id: SubmissionId(1),
            stage: Stage::Review,
            round: 1,
            status: ReviewRoundStatus::InReview,
            started_at: Timestamp(10),
            closed_at: None,
            notes: None,
            reviews: vec![
                review(1, ReviewStatus::Completed),
                review(2, ReviewStatus::Accepted),
                review(3, ReviewStatus::Completed),
            ],
        };
        let ids: Vec<ReviewId> = round.completed_reviews().map(|r| r.id).collect();
        assert_eq!(ids, vec![ReviewId(1), ReviewId(3)]);
    }
}
