//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Path and body values arrive as raw strings and numbers and are turned
//! into core types here, so an unknown stage or status is rejected with a
//! validation error instead of being silently defaulted.

use quire_core::{
    FileId, NewNote, NewQuery, Queue, QuireError, ReviewRoundId, Stage, SubmissionFile, SubmissionFilter,
    SubmissionStatus, UploadRequest, UploadedFile, UserId, WorkflowChange, can_upload_file,
    primitives::MAX_LIST_LIMIT,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub message: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

// =============================================================================
// STAGES RESPONSE
// =============================================================================

/// One workflow stage as listed by `GET /stages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageInfo {
    pub key: String,
    pub label: String,
    pub index: usize,
    pub accepts_uploads: bool,
}

/// Ordered list of workflow stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesResponse {
    pub stages: Vec<StageInfo>,
}

impl Default for StagesResponse {
    fn default() -> Self {
        Self {
            stages: Stage::ALL
                .iter()
                .map(|stage| StageInfo {
                    key: stage.key().to_string(),
                    label: stage.label().to_string(),
                    index: stage.index(),
                    accepts_uploads: can_upload_file(*stage),
                })
                .collect(),
        }
    }
}

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// `?user=` on read endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserParams {
    pub user: Option<u64>,
}

impl UserParams {
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.map(UserId)
    }
}

/// `GET /submissions` parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    pub queue: Option<String>,
    pub stage: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub user: Option<u64>,
}

impl ListParams {
    /// Convert to a filter, validating queue, stage and limit.
    pub fn to_filter(&self) -> Result<SubmissionFilter, QuireError> {
        let queue = Queue::parse(self.queue.as_deref().unwrap_or(""), self.user.map(UserId))?;
        let stage = self
            .stage
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<Stage>)
            .transpose()?;
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_LIST_LIMIT {
                return Err(QuireError::validation(format!(
                    "limit must be between 1 and {MAX_LIST_LIMIT}"
                )));
            }
        }
        Ok(SubmissionFilter {
            queue,
            stage,
            search: self.search.clone(),
            limit: self.limit,
            offset: self.offset.unwrap_or(0),
        })
    }
}

/// `GET /submissions/{id}/workflow` parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewParams {
    pub tab: Option<String>,
    pub stage: Option<String>,
}

/// `GET /journals/{id}/settings/{name}` parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingParams {
    pub locale: Option<String>,
    pub fallback: Option<String>,
}

// =============================================================================
// WORKFLOW REQUEST/RESPONSE
// =============================================================================

/// `POST /submissions/{id}/workflow` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub actor_id: u64,
    pub target_stage: Option<String>,
    pub status: Option<String>,
    pub note: Option<String>,
}

impl WorkflowRequest {
    /// Parse stage and status names into a change.
    pub fn to_change(&self) -> Result<(UserId, WorkflowChange), QuireError> {
        let change = WorkflowChange {
            target_stage: self
                .target_stage
                .as_deref()
                .map(str::parse::<Stage>)
                .transpose()?,
            status: self
                .status
                .as_deref()
                .map(str::parse::<SubmissionStatus>)
                .transpose()?,
            note: self.note.clone(),
        };
        Ok((UserId(self.actor_id), change))
    }
}

// =============================================================================
// UPLOAD RESPONSE
// =============================================================================

/// Result of `POST /submissions/{id}/files/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub message: String,
    pub file: Option<SubmissionFile>,
}

impl UploadResponse {
    #[must_use]
    pub fn success(file: SubmissionFile) -> Self {
        Self {
            ok: true,
            message: format!("File {} uploaded to {}.", file.label, file.stage.label()),
            file: Some(file),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            file: None,
        }
    }
}

/// Multipart text fields of an upload, before conversion.
#[derive(Debug, Clone, Default)]
pub struct UploadFields {
    pub label: String,
    pub stage: String,
    pub kind: String,
    pub uploaded_by: Option<String>,
    pub version_label: Option<String>,
    pub round: Option<String>,
    pub visible_to_authors: Option<String>,
    pub review_round_id: Option<String>,
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, QuireError> {
    raw.trim()
        .parse()
        .map_err(|_| QuireError::validation(format!("{field} must be a number")))
}

impl UploadFields {
    /// Store one named multipart field. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        match name {
            "label" => self.label = value,
            "stage" => self.stage = value,
            "kind" => self.kind = value,
            "uploadedBy" => self.uploaded_by = Some(value),
            "versionLabel" => self.version_label = Some(value),
            "round" => self.round = Some(value),
            "visibleToAuthors" => self.visible_to_authors = Some(value),
            "reviewRoundId" => self.review_round_id = Some(value),
            _ => {}
        }
    }

    /// `uploadedBy` as a user id; an empty value counts as missing.
    pub fn uploaded_by(&self) -> Result<Option<UserId>, QuireError> {
        self.uploaded_by
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| parse_number("uploadedBy", v).map(UserId))
            .transpose()
    }

    /// Combine the fields with the uploaded file into a core request.
    pub fn into_request(self, file: Option<UploadedFile>) -> Result<UploadRequest, QuireError> {
        Ok(UploadRequest {
            uploaded_by: self.uploaded_by()?,
            round: self.round()?,
            review_round_id: self.review_round_id()?,
            visible_to_authors: self.visible_to_authors(),
            file,
            label: self.label,
            stage: self.stage,
            kind: self.kind,
            version_label: self.version_label,
        })
    }

    pub fn round(&self) -> Result<Option<u32>, QuireError> {
        self.round
            .as_deref()
            .map(|v| parse_number("round", v))
            .transpose()
    }

    pub fn review_round_id(&self) -> Result<Option<ReviewRoundId>, QuireError> {
        self.review_round_id
            .as_deref()
            .map(|v| parse_number("reviewRoundId", v).map(ReviewRoundId))
            .transpose()
    }

    #[must_use]
    pub fn visible_to_authors(&self) -> bool {
        matches!(
            self.visible_to_authors.as_deref().map(str::trim),
            Some("1" | "true" | "on")
        )
    }
}

// =============================================================================
// FILE COPY
// =============================================================================

/// `POST /submissions/{id}/files/copy` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyFilesRequest {
    pub actor_id: u64,
    pub file_ids: Vec<u64>,
    pub target_stage: String,
}

impl CopyFilesRequest {
    pub fn to_parts(&self) -> Result<(UserId, Vec<FileId>, Stage), QuireError> {
        let target = self.target_stage.parse::<Stage>()?;
        let files = self.file_ids.iter().copied().map(FileId).collect();
        Ok((UserId(self.actor_id), files, target))
    }
}

/// Result of `POST /submissions/{id}/files/copy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyFilesResponse {
    pub ok: bool,
    pub message: String,
    pub files: Vec<SubmissionFile>,
}

impl CopyFilesResponse {
    #[must_use]
    pub fn success(target: Stage, files: Vec<SubmissionFile>) -> Self {
        Self {
            ok: true,
            message: format!("Copied {} file(s) to {}.", files.len(), target.label()),
            files,
        }
    }
}

// =============================================================================
// DISCUSSION REQUESTS
// =============================================================================

/// `POST /submissions/{id}/queries` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQueryRequest {
    pub actor_id: u64,
    pub stage: String,
    pub title: Option<String>,
    pub message: String,
    pub participants: Vec<u64>,
}

impl CreateQueryRequest {
    pub fn to_new_query(&self) -> Result<(UserId, NewQuery), QuireError> {
        Ok((
            UserId(self.actor_id),
            NewQuery {
                stage: self.stage.parse()?,
                title: self.title.clone(),
                message: self.message.clone(),
                participants: self.participants.iter().copied().map(UserId).collect(),
            },
        ))
    }
}

/// `POST /submissions/{id}/queries/{query_id}/notes` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRequest {
    pub actor_id: u64,
    pub title: Option<String>,
    pub contents: String,
}

impl NoteRequest {
    #[must_use]
    pub fn to_new_note(&self) -> (UserId, NewNote) {
        (
            UserId(self.actor_id),
            NewNote {
                title: self.title.clone(),
                contents: self.contents.clone(),
            },
        )
    }
}

/// Body of requests that only name the acting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRequest {
    pub actor_id: u64,
}

// =============================================================================
// SETTINGS RESPONSE
// =============================================================================

/// A resolved journal setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingResponse {
    pub journal_id: u64,
    pub name: String,
    /// Locale of the row that answered (may differ from the one requested).
    pub locale: String,
    pub value: serde_json::Value,
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Snapshot export response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub ok: bool,
    /// Base64-encoded snapshot bytes.
    pub data: Option<String>,
    pub size: usize,
    pub checksum: u64,
    /// BLAKE3 digest of the snapshot bytes, hex encoded.
    pub digest: Option<String>,
    pub error: Option<String>,
}

impl ExportResponse {
    #[must_use]
    pub fn success(bytes: &[u8], checksum: u64, digest: String) -> Self {
        use base64::Engine;
        Self {
            ok: true,
            data: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            size: bytes.len(),
            checksum,
            digest: Some(digest),
            error: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            size: 0,
            checksum: 0,
            digest: None,
            error: Some(message.into()),
        }
    }
}

// =============================================================================
// DOWNLOAD HELPERS
// =============================================================================

/// `Content-Disposition` value for a download, quoting the original name.
#[must_use]
pub fn content_disposition(original_name: &str) -> String {
    let safe: String = original_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}
