//! # Stage Model
//!
//! The fixed, ordered sequence of editorial stages and everything derived
//! from a submission's current stage.
//!
//! ## Stage Definitions
//!
//! | Index | Stage | Uploads | Notes |
//! |-------|-------------|---------|-----------------------------------|
//! | 0 | Submission | yes | Initial manuscript and metadata |
//! | 1 | Review | yes | Peer review rounds |
//! | 2 | Copyediting | yes | Editing of the accepted manuscript |
//! | 3 | Production | no | Galleys and publication |
//!
//! The order is declared once, by the variant order of [`Stage`]; every
//! comparison goes through the derived `Ord`. Nothing re-derives it by
//! searching a list.

use crate::QuireError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// STAGE ENUM
// =============================================================================

/// Editorial workflow stage. Variant order is the workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Submission,
    Review,
    Copyediting,
    Production,
}

impl Stage {
    /// All stages in workflow order.
    pub const ALL: [Stage; 4] = [
        Stage::Submission,
        Stage::Review,
        Stage::Copyediting,
        Stage::Production,
    ];

    /// Position of this stage in the workflow (0-based).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Stage::Submission => 0,
            Stage::Review => 1,
            Stage::Copyediting => 2,
            Stage::Production => 3,
        }
    }

    /// Stage at a workflow position, if any.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Stage> {
        Stage::ALL.get(index).copied()
    }

    /// Wire key (`"submission"`, `"review"`, ...).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Stage::Submission => "submission",
            Stage::Review => "review",
            Stage::Copyediting => "copyediting",
            Stage::Production => "production",
        }
    }

    /// Human-readable tab label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Stage::Submission => "Submission",
            Stage::Review => "Review",
            Stage::Copyediting => "Copyediting",
            Stage::Production => "Production",
        }
    }

    /// Get the next stage, if any.
    #[must_use]
    pub fn next(self) -> Option<Stage> {
        Stage::from_index(self.index().saturating_add(1))
    }

    /// Get the previous stage, if any.
    #[must_use]
    pub fn previous(self) -> Option<Stage> {
        self.index().checked_sub(1).and_then(Stage::from_index)
    }

    /// Check if this stage is the last one (production).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Production)
    }

    /// Whether files may be uploaded while a submission sits in this stage.
    #[must_use]
    pub const fn accepts_uploads(self) -> bool {
        match self {
            Stage::Submission | Stage::Review | Stage::Copyediting => true,
            Stage::Production => false,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Stage {
    type Err = QuireError;

    /// Parse a wire key. Unknown values are an error, never a default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.key() == s)
            .ok_or_else(|| QuireError::InvalidStage(s.to_string()))
    }
}

// =============================================================================
// DERIVED VALUES
// =============================================================================

static WORKFLOW: [Stage; 4] = Stage::ALL;

/// Stages a user may navigate to: every stage up to and including `current`.
#[must_use]
pub fn visible_stages(current: Stage) -> &'static [Stage] {
    &WORKFLOW[..=current.index()]
}

/// Whether `stage` is completed relative to `current` (strictly before it).
#[must_use]
pub fn is_past_stage(stage: Stage, current: Stage) -> bool {
    stage < current
}

/// Whether a file upload is permitted for a submission in `current`.
#[must_use]
pub fn can_upload_file(current: Stage) -> bool {
    current.accepts_uploads()
}

// =============================================================================
// STAGE OUTLINE
// =============================================================================

/// One navigable stage tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageTab {
    pub stage: Stage,
    pub label: &'static str,
    /// Strictly before the current stage.
    pub completed: bool,
    /// Equal to the current stage.
    pub current: bool,
}

/// The stage tabs and upload permission for one current stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutline {
    pub current: Stage,
    pub tabs: Vec<StageTab>,
    pub can_upload: bool,
}

impl StageOutline {
    /// Build the outline for a submission whose current stage is `current`.
    #[must_use]
    pub fn for_stage(current: Stage) -> Self {
        let tabs = visible_stages(current)
            .iter()
            .map(|&stage| StageTab {
                stage,
                label: stage.label(),
                completed: is_past_stage(stage, current),
                current: stage == current,
            })
            .collect();

        Self {
            current,
            tabs,
            can_upload: can_upload_file(current),
        }
    }

    /// Build the outline from a raw stage key.
    pub fn parse(current: &str) -> Result<Self, QuireError> {
        Ok(Self::for_stage(current.parse()?))
    }

    /// Whether `stage` has a tab in this outline.
    #[must_use]
    pub fn contains(&self, stage: Stage) -> bool {
        stage <= self.current
    }

    /// Stages of the visible tabs, in order.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        self.tabs.iter().map(|tab| tab.stage).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
