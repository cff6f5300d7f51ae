//! # quire-core
//!
//! The editorial workflow engine for Quire.
//!
//! This crate models how a journal submission moves through the four
//! editorial stages (submission, review, copyediting, production), what a
//! submission's page shows at each stage, and who may upload files or talk
//! in its discussions.
//!
//! ## Layout
//!
//! - `workflow`: the closed stage model, transitions and the workflow view state
//! - `detail`, `listing`: read models built from stored rows
//! - `upload`, `query`: validated input for the write paths
//! - `store`, `storage`, `blob`: row and content storage
//! - `session`: the operations, tying all of the above together
//! - `formats`: binary snapshots of a whole store
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - Deterministic: ordered collections only, callers pass the current time
//! - Stage and status values are enums; unknown wire values are errors

// =============================================================================
// MODULES
// =============================================================================

pub mod activity;
pub mod blob;
pub mod detail;
pub mod file;
pub mod formats;
pub mod listing;
pub mod primitives;
pub mod query;
pub mod review;
pub mod session;
pub mod settings;
pub mod storage;
pub mod store;
pub mod submission;
pub mod types;
pub mod upload;
pub mod workflow;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ActivityId, CategoryId, ErrorClass, FileId, GalleyId, JournalId, NoteId, QueryId, QuireError,
    ReviewId, ReviewRoundId, SectionId, SubmissionId, Timestamp, UserId,
};

// =============================================================================
// RE-EXPORTS: Workflow Model
// =============================================================================

pub use workflow::{
    Banner, BannerKind, DetailTab, Stage, StageOutline, StageTab, Transition, UploadDialog,
    ViewAction, WorkflowChange, WorkflowViewState, can_upload_file, is_past_stage,
    visible_stages,
};

// =============================================================================
// RE-EXPORTS: Submissions and Read Models
// =============================================================================

pub use activity::{ActivityCategory, ActivityEntry};
pub use detail::{DetailRows, StagePanel, SubmissionDetail, WorkflowView};
pub use file::{FileKind, Galley, SubmissionFile};
pub use listing::{DashboardStats, Queue, SubmissionFilter, SubmissionPage, SubmissionSummary};
pub use query::{NewNote, NewQuery, Query, QueryNote};
pub use review::{Recommendation, Review, ReviewRound, ReviewRoundStatus, ReviewStatus};
pub use settings::{Category, JournalSetting, Section, SettingType, SettingValue};
pub use submission::{Participant, Role, Submission, SubmissionDraft, SubmissionStatus};
pub use upload::{UploadRequest, UploadedFile};

// =============================================================================
// RE-EXPORTS: Storage and Session
// =============================================================================

pub use blob::{BlobStore, MemoryBlobStore};
pub use session::{Session, StorageBackend};
pub use storage::RedbStore;
pub use store::{MemoryStore, Sequence, WorkflowStore};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    Snapshot, SnapshotHeader, snapshot_checksum, snapshot_from_bytes, snapshot_to_bytes,
};

#[cfg(feature = "crypto-hash")]
pub use formats::snapshot_digest;
