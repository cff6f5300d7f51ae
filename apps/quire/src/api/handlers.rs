//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Every failure leaves as an [`ErrorResponse`] with a status derived from
//! the [`QuireError`] variant, see [`error_status`].

use super::{
    AppState,
    types::{
        ActorRequest, CopyFilesRequest, CopyFilesResponse, CreateQueryRequest, ErrorResponse,
        ExportResponse, HealthResponse, ListParams, NoteRequest, SettingParams, SettingResponse,
        StagesResponse, UploadFields, UploadResponse, UserParams, ViewParams, WorkflowRequest,
        content_disposition,
    },
};
use crate::now;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use quire_core::{
    FileId, JournalId, QueryId, QuireError, Role, SubmissionFile, SubmissionId, UploadedFile,
    UserId, snapshot_checksum, snapshot_digest, snapshot_to_bytes,
};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// HTTP status for a core error.
#[must_use]
pub fn error_status(error: &QuireError) -> StatusCode {
    match error {
        QuireError::InvalidStage(_)
        | QuireError::InvalidStatus(_)
        | QuireError::InvalidRole(_)
        | QuireError::Validation(_)
        | QuireError::StageNotReached { .. } => StatusCode::BAD_REQUEST,
        QuireError::StageRegression { .. } | QuireError::QueryClosed(_) => StatusCode::CONFLICT,
        QuireError::Unauthenticated => StatusCode::UNAUTHORIZED,
        QuireError::Forbidden(_) | QuireError::UploadNotPermitted(_) => StatusCode::FORBIDDEN,
        QuireError::SubmissionNotFound(_)
        | QuireError::FileNotFound(_)
        | QuireError::QueryNotFound(_)
        | QuireError::SettingNotFound { .. } => StatusCode::NOT_FOUND,
        QuireError::InconsistentDetail(_)
        | QuireError::SerializationError(_)
        | QuireError::DeserializationError(_)
        | QuireError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A core error on its way out as a response.
#[derive(Debug)]
pub struct ApiError(pub QuireError);

impl From<QuireError> for ApiError {
    fn from(error: QuireError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = error_status(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// HEALTH / STAGES
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// The workflow stages in order.
pub async fn stages_handler() -> impl IntoResponse {
    Json(StagesResponse::default())
}

// =============================================================================
// DASHBOARD / LISTING
// =============================================================================

/// Queue counters for the dashboard.
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> ApiResult<impl IntoResponse> {
    let session = state.session.read().await;
    Ok(Json(session.dashboard(params.user_id())?))
}

/// One page of submissions.
pub async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let filter = params.to_filter()?;
    let session = state.session.read().await;
    Ok(Json(session.list(&filter)?))
}

// =============================================================================
// SUBMISSION DETAIL / WORKFLOW
// =============================================================================

/// Full detail of a submission, projected for `?user=` when that user is
/// its author.
pub async fn detail_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(params): Query<UserParams>,
) -> ApiResult<impl IntoResponse> {
    let session = state.session.read().await;
    Ok(Json(session.detail_for(SubmissionId(id), params.user_id())?))
}

/// The workflow page restored from `?tab=` and `?stage=`.
pub async fn workflow_view_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(params): Query<ViewParams>,
) -> ApiResult<impl IntoResponse> {
    let session = state.session.read().await;
    let view = session.workflow_view(
        SubmissionId(id),
        params.tab.as_deref(),
        params.stage.as_deref(),
    )?;
    Ok(Json(view))
}

/// Move a submission forward and/or change its status.
pub async fn workflow_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<WorkflowRequest>,
) -> ApiResult<impl IntoResponse> {
    let (actor, change) = request.to_change()?;
    let mut session = state.session.write().await;
    let submission = session.apply_workflow(SubmissionId(id), actor, &change, now())?;
    tracing::info!(
        event = "workflow",
        submission = id,
        actor = actor.0,
        stage = submission.stage.key(),
        "workflow change applied"
    );
    Ok(Json(submission))
}

// =============================================================================
// FILES
// =============================================================================

/// Copy files into another stage. The copies share the stored content.
pub async fn copy_files_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<CopyFilesRequest>,
) -> ApiResult<impl IntoResponse> {
    let (actor, files, target) = request.to_parts()?;
    let mut session = state.session.write().await;
    let copies = session.copy_files(SubmissionId(id), actor, &files, target, now())?;
    tracing::info!(
        event = "copy_files",
        submission = id,
        actor = actor.0,
        stage = target.key(),
        count = copies.len(),
        "files copied"
    );
    Ok(Json(CopyFilesResponse::success(target, copies)))
}

/// Read the multipart body into text fields plus the `file` part.
async fn read_upload(
    mut multipart: Multipart,
) -> Result<(UploadFields, Option<UploadedFile>), QuireError> {
    let mut fields = UploadFields::default();
    let mut file = None;
    let malformed = |e: axum::extract::multipart::MultipartError| {
        QuireError::validation(format!("malformed upload: {e}"))
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "file" {
            let original = field.file_name().unwrap_or_default().to_string();
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(malformed)?;
            file = Some(UploadedFile {
                name: original,
                mime_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(malformed)?;
            fields.set(&name, value);
        }
    }
    Ok((fields, file))
}

/// Upload a file to one stage of a submission.
///
/// Answers with an [`UploadResponse`] in both outcomes so the client's
/// upload dialog can show the message as-is.
pub async fn upload_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    multipart: Multipart,
) -> (StatusCode, Json<UploadResponse>) {
    let result: Result<SubmissionFile, QuireError> = async {
        let (fields, file) = read_upload(multipart).await?;
        let request = fields.into_request(file)?;
        let mut session = state.session.write().await;
        let mut blobs = state.blobs.write().await;
        session.upload(SubmissionId(id), request, &mut **blobs, now())
    }
    .await;

    match result {
        Ok(file) => {
            tracing::info!(
                event = "upload",
                submission = id,
                file = file.id.0,
                stage = file.stage.key(),
                size = file.size,
                "file uploaded"
            );
            (StatusCode::OK, Json(UploadResponse::success(file)))
        }
        Err(e) => {
            tracing::warn!(event = "upload", submission = id, error = %e, "upload rejected");
            (error_status(&e), Json(UploadResponse::error(e.to_string())))
        }
    }
}

/// Stream a stored file back with its original name.
///
/// An author passed as `?user=` only sees files shared with authors or
/// uploaded by them; anything else is reported as missing.
pub async fn download_handler(
    State(state): State<AppState>,
    Path((id, file_id)): Path<(u64, u64)>,
    Query(params): Query<UserParams>,
) -> ApiResult<Response> {
    let submission_id = SubmissionId(id);
    let file_id = FileId(file_id);

    let session = state.session.read().await;
    let file = session.file(submission_id, file_id)?;
    if let Some(user) = params.user_id() {
        if session.role_of(submission_id, user)? == Some(Role::Author)
            && !file.visible_to_authors
            && file.uploaded_by != user
        {
            return Err(QuireError::FileNotFound(file_id).into());
        }
    }

    let blobs = state.blobs.read().await;
    let bytes = blobs
        .get(&file.storage_path)?
        .ok_or(QuireError::FileNotFound(file_id))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.mime_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&file.original_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

// =============================================================================
// DISCUSSIONS
// =============================================================================

/// Discussions of a submission in stage order.
pub async fn queries_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let session = state.session.read().await;
    Ok(Json(session.queries(SubmissionId(id))?))
}

/// Start a discussion.
pub async fn create_query_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<CreateQueryRequest>,
) -> ApiResult<impl IntoResponse> {
    let (actor, query) = request.to_new_query()?;
    let mut session = state.session.write().await;
    let created = session.create_query(SubmissionId(id), actor, &query, now())?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Reply to an open discussion.
pub async fn add_note_handler(
    State(state): State<AppState>,
    Path((id, query_id)): Path<(u64, u64)>,
    Json(request): Json<NoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let (actor, note) = request.to_new_note();
    let mut session = state.session.write().await;
    let updated = session.add_note(SubmissionId(id), QueryId(query_id), actor, &note, now())?;
    Ok(Json(updated))
}

/// Close a discussion.
pub async fn close_query_handler(
    State(state): State<AppState>,
    Path((id, query_id)): Path<(u64, u64)>,
    Json(request): Json<ActorRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut session = state.session.write().await;
    let closed = session.close_query(
        SubmissionId(id),
        QueryId(query_id),
        UserId(request.actor_id),
        now(),
    )?;
    Ok(Json(closed))
}

// =============================================================================
// JOURNAL DATA
// =============================================================================

/// One journal setting, decoded by its type.
pub async fn setting_handler(
    State(state): State<AppState>,
    Path((journal, name)): Path<(u64, String)>,
    Query(params): Query<SettingParams>,
) -> ApiResult<impl IntoResponse> {
    let journal_id = JournalId(journal);
    let session = state.session.read().await;
    let setting = session
        .setting(
            journal_id,
            &name,
            params.locale.as_deref().unwrap_or(""),
            params.fallback.as_deref(),
        )?
        .ok_or_else(|| QuireError::SettingNotFound {
            journal: journal_id,
            name: name.clone(),
        })?;
    let value = serde_json::to_value(setting.typed_value()?)
        .map_err(|e| QuireError::SerializationError(e.to_string()))?;

    Ok(Json(SettingResponse {
        journal_id: journal,
        name: setting.name,
        locale: setting.locale,
        value,
    }))
}

/// Sections of a journal.
pub async fn sections_handler(
    State(state): State<AppState>,
    Path(journal): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let session = state.session.read().await;
    Ok(Json(session.sections(JournalId(journal))?))
}

/// Categories of a journal.
pub async fn categories_handler(
    State(state): State<AppState>,
    Path(journal): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let session = state.session.read().await;
    Ok(Json(session.categories(JournalId(journal))?))
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Export every row as a snapshot (base64) with its checksum and digest.
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    let bytes = match session
        .export_snapshot()
        .and_then(|snapshot| snapshot_to_bytes(&snapshot))
    {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                error_status(&e),
                Json(ExportResponse::error(format!("Export failed: {e}"))),
            );
        }
    };

    let checksum = snapshot_checksum(&bytes);
    let digest = snapshot_digest(&bytes);
    (
        StatusCode::OK,
        Json(ExportResponse::success(&bytes, checksum, digest)),
    )
}

// =============================================================================
// TESTS
// =============================================================================
