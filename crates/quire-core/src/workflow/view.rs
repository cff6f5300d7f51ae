//! # Workflow View State
//!
//! The workflow page of a submission as an immutable value.
//!
//! Every interaction is expressed as a [`ViewAction`] and folded into a new
//! [`WorkflowViewState`] by [`WorkflowViewState::reduce`]. The only parts of
//! the state that survive a page reload are the `tab` and `stage` query
//! parameters, see [`WorkflowViewState::restore`].

use crate::QuireError;
use crate::workflow::{Stage, StageOutline, can_upload_file};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// COMPONENTS
// =============================================================================

/// Top-level tab of the submission page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailTab {
    #[default]
    Workflow,
    Publication,
}

impl DetailTab {
    /// Query parameter value.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            DetailTab::Workflow => "workflow",
            DetailTab::Publication => "publication",
        }
    }
}

impl FromStr for DetailTab {
    type Err = QuireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workflow" => Ok(DetailTab::Workflow),
            "publication" => Ok(DetailTab::Publication),
            other => Err(QuireError::validation(format!("Invalid tab: {other:?}"))),
        }
    }
}

/// State of the upload dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadDialog {
    #[default]
    Closed,
    Open,
    /// A request is in flight; the dialog cannot be closed.
    Submitting,
}

/// Kind of a dismissible banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    Success,
    Error,
}

/// A dismissible message shown above the stage panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

/// Interactions on the workflow page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    SelectTab(DetailTab),
    SelectStage(Stage),
    OpenUpload,
    CloseUpload,
    SubmitUpload,
    UploadSucceeded(String),
    UploadFailed(String),
    DismissBanner,
    /// The submission moved to a new stage (after a workflow change).
    StageChanged(Stage),
}

// =============================================================================
// VIEW STATE
// =============================================================================

/// Immutable state of the workflow page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowViewState {
    pub current: Stage,
    pub tab: DetailTab,
    pub active_stage: Stage,
    pub upload: UploadDialog,
    pub banner: Option<Banner>,
}

impl WorkflowViewState {
    /// Initial state: workflow tab, current stage selected, nothing open.
    #[must_use]
    pub fn new(current: Stage) -> Self {
        Self {
            current,
            tab: DetailTab::Workflow,
            active_stage: current,
            upload: UploadDialog::Closed,
            banner: None,
        }
    }

    /// Rebuild state from the `tab` and `stage` query parameters.
    ///
    /// Missing parameters take their defaults. Unknown values are errors.
    /// A stage ahead of `current` is clamped to `current`.
    pub fn restore(
        current: Stage,
        tab: Option<&str>,
        stage: Option<&str>,
    ) -> Result<Self, QuireError> {
        let tab = tab
            .map(str::parse::<DetailTab>)
            .transpose()?
            .unwrap_or_default();
        let requested = stage.map(str::parse::<Stage>).transpose()?;
        let active_stage = requested.map_or(current, |s| s.min(current));

        Ok(Self {
            tab,
            active_stage,
            ..Self::new(current)
        })
    }

    /// The `tab` and `stage` query parameters for this state.
    #[must_use]
    pub fn query_params(&self) -> [(&'static str, &'static str); 2] {
        [("tab", self.tab.key()), ("stage", self.active_stage.key())]
    }

    /// Stage tabs for the current stage.
    #[must_use]
    pub fn outline(&self) -> StageOutline {
        StageOutline::for_stage(self.current)
    }

    /// Fold one action into a new state.
    #[must_use]
    pub fn reduce(&self, action: ViewAction) -> Self {
        let mut next = self.clone();
        match action {
            ViewAction::SelectTab(tab) => next.tab = tab,
            ViewAction::SelectStage(stage) => {
                if stage <= self.current {
                    next.active_stage = stage;
                }
            }
            ViewAction::OpenUpload => {
                if self.upload == UploadDialog::Closed && can_upload_file(self.current) {
                    next.upload = UploadDialog::Open;
                }
            }
            ViewAction::CloseUpload => {
                if self.upload == UploadDialog::Open {
                    next.upload = UploadDialog::Closed;
                }
            }
            ViewAction::SubmitUpload => {
                if self.upload == UploadDialog::Open {
                    next.upload = UploadDialog::Submitting;
                    next.banner = None;
                }
            }
            // results only land on a dialog that is submitting
            ViewAction::UploadSucceeded(message) => {
                if self.upload == UploadDialog::Submitting {
                    next.upload = UploadDialog::Closed;
                    next.banner = Some(Banner {
                        kind: BannerKind::Success,
                        message,
                    });
                }
            }
            ViewAction::UploadFailed(message) => {
                if self.upload == UploadDialog::Submitting {
                    next.upload = if can_upload_file(self.current) {
                        UploadDialog::Open
                    } else {
                        UploadDialog::Closed
                    };
                    next.banner = Some(Banner {
                        kind: BannerKind::Error,
                        message,
                    });
                }
            }
            ViewAction::DismissBanner => next.banner = None,
            ViewAction::StageChanged(stage) => {
                if stage >= self.current {
                    next.current = stage;
                    next.active_stage = stage;
                    if !can_upload_file(stage) && next.upload == UploadDialog::Open {
                        next.upload = UploadDialog::Closed;
                    }
                }
            }
        }
        next
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_selects_current_stage() {
        let state = WorkflowViewState::new(Stage::Review);
        assert_eq!(state.active_stage, Stage::Review);
        assert_eq!(state.tab, DetailTab::Workflow);
        assert_eq!(state.upload, UploadDialog::Closed);
        assert!(state.banner.is_none());
    }

    #[test]
    fn selecting_unreached_stage_is_ignored() {
        let state = WorkflowViewState::new(Stage::Review);
        let next = state.reduce(ViewAction::SelectStage(Stage::Production));
        assert_eq!(next, state);

        let next = state.reduce(ViewAction::SelectStage(Stage::Submission));
        assert_eq!(next.active_stage, Stage::Submission);
    }

    #[test]
    fn upload_dialog_closed_in_production() {
        let state = WorkflowViewState::new(Stage::Production);
        let next = state.reduce(ViewAction::OpenUpload);
        assert_eq!(next.upload, UploadDialog::Closed);
    }

    #[test]
    fn failed_upload_keeps_dialog_open() {
        let state = WorkflowViewState::new(Stage::Submission)
            .reduce(ViewAction::OpenUpload)
            .reduce(ViewAction::SubmitUpload);
        assert_eq!(state.upload, UploadDialog::Submitting);

        // cannot close while submitting
        assert_eq!(state.reduce(ViewAction::CloseUpload), state);

        let failed = state.reduce(ViewAction::UploadFailed("label is required".into()));
        assert_eq!(failed.upload, UploadDialog::Open);
        assert_eq!(
            failed.banner.as_ref().map(|b| b.kind),
            Some(BannerKind::Error)
        );
    }

    #[test]
    fn successful_upload_closes_dialog() {
        let state = WorkflowViewState::new(Stage::Copyediting)
            .reduce(ViewAction::OpenUpload)
            .reduce(ViewAction::SubmitUpload)
            .reduce(ViewAction::UploadSucceeded("File uploaded".into()));
        assert_eq!(state.upload, UploadDialog::Closed);
        assert_eq!(
            state.banner,
            Some(Banner {
                kind: BannerKind::Success,
                message: "File uploaded".into()
            })
        );
        assert!(state.reduce(ViewAction::DismissBanner).banner.is_none());
    }

    #[test]
    fn stale_results_are_ignored() {
        let state = WorkflowViewState::new(Stage::Review);
        assert_eq!(state.reduce(ViewAction::UploadFailed("late".into())), state);
        assert_eq!(state.reduce(ViewAction::UploadSucceeded("late".into())), state);
    }

    #[test]
    fn stage_change_moves_forward_only() {
        let state = WorkflowViewState::new(Stage::Copyediting).reduce(ViewAction::OpenUpload);
        let moved = state.reduce(ViewAction::StageChanged(Stage::Production));
        assert_eq!(moved.current, Stage::Production);
        assert_eq!(moved.active_stage, Stage::Production);
        assert_eq!(moved.upload, UploadDialog::Closed);

        assert_eq!(moved.reduce(ViewAction::StageChanged(Stage::Review)), moved);
    }

    #[test]
    fn restore_clamps_and_rejects() {
        let state = WorkflowViewState::restore(Stage::Review, Some("workflow"), Some("production"))
            .expect("restore");
        assert_eq!(state.active_stage, Stage::Review);

        assert!(WorkflowViewState::restore(Stage::Review, Some("files"), None).is_err());
        let err = WorkflowViewState::restore(Stage::Review, None, Some("drafting"))
            .expect_err("unknown stage");
        assert!(matches!(err, QuireError::InvalidStage(_)));

        let state = WorkflowViewState::restore(Stage::Review, None, None).expect("defaults");
        assert_eq!(state, WorkflowViewState::new(Stage::Review));
    }

    #[test]
    fn query_params_round_trip() {
        let state = WorkflowViewState::new(Stage::Production)
            .reduce(ViewAction::SelectTab(DetailTab::Publication))
            .reduce(ViewAction::SelectStage(Stage::Review));
        let [(_, tab), (_, stage)] = state.query_params();
        assert_eq!(tab, "publication");
        assert_eq!(stage, "review");

        let restored =
            WorkflowViewState::restore(state.current, Some(tab), Some(stage)).expect("restore");
        assert_eq!(restored, state);
    }
}
