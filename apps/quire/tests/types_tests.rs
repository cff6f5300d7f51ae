//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use quire::api::{
    CopyFilesRequest, CreateQueryRequest, ErrorResponse, ExportResponse, HealthResponse,
    ListParams, NoteRequest, StagesResponse, UploadFields, UploadResponse, WorkflowRequest,
    content_disposition,
};
use quire_core::{
    FileId, FileKind, Queue, QuireError, Stage, SubmissionFile, SubmissionId, SubmissionStatus,
    Timestamp, UploadedFile, UserId,
};

// =============================================================================
// HEALTH / ERROR RESPONSES
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_error_response_serialization() {
    let json = serde_json::to_string(&ErrorResponse::new("label is required")).unwrap();
    assert_eq!(json, r#"{"ok":false,"message":"label is required"}"#);
}

#[test]
fn test_stages_response_lists_all_stages() {
    let stages = StagesResponse::default();
    assert_eq!(stages.stages.len(), 4);
    assert_eq!(stages.stages[3].label, "Production");
    assert_eq!(stages.stages[3].index, 3);
}

// =============================================================================
// LIST PARAMS
// =============================================================================

#[test]
fn test_list_params_defaults() {
    let filter = ListParams::default().to_filter().unwrap();
    assert_eq!(filter.queue, Queue::All);
    assert_eq!(filter.stage, None);
    assert_eq!(filter.offset, 0);
}

#[test]
fn test_list_params_mine_uses_user() {
    let params = ListParams {
        queue: Some("mine".into()),
        user: Some(7),
        stage: Some("review".into()),
        ..ListParams::default()
    };
    let filter = params.to_filter().unwrap();
    assert_eq!(filter.queue, Queue::Mine(UserId(7)));
    assert_eq!(filter.stage, Some(Stage::Review));
}

#[test]
fn test_list_params_limit_bounds() {
    for limit in [0, 101] {
        let params = ListParams {
            limit: Some(limit),
            ..ListParams::default()
        };
        assert!(params.to_filter().is_err(), "limit {limit} accepted");
    }
}

// =============================================================================
// WORKFLOW REQUEST
// =============================================================================

#[test]
fn test_workflow_request_deserialization() {
    let json = r#"{"actor_id":3,"target_stage":"copyediting","status":"queued"}"#;
    let request: WorkflowRequest = serde_json::from_str(json).unwrap();
    let (actor, change) = request.to_change().unwrap();

    assert_eq!(actor, UserId(3));
    assert_eq!(change.target_stage, Some(Stage::Copyediting));
    assert_eq!(change.status, Some(SubmissionStatus::Submitted));
    assert_eq!(change.note, None);
}

#[test]
fn test_workflow_request_unknown_stage() {
    let request = WorkflowRequest {
        actor_id: 3,
        target_stage: Some("Review ".into()),
        status: None,
        note: None,
    };
    assert!(matches!(
        request.to_change(),
        Err(QuireError::InvalidStage(_))
    ));
}

// =============================================================================
// UPLOAD FIELDS / RESPONSE
// =============================================================================

fn fields() -> UploadFields {
    let mut fields = UploadFields::default();
    fields.set("label", "Main Text".into());
    fields.set("stage", "review".into());
    fields.set("kind", "manuscript".into());
    fields.set("uploadedBy", " 12 ".into());
    fields.set("round", "2".into());
    fields.set("visibleToAuthors", "true".into());
    fields.set("unrelated", "ignored".into());
    fields
}

#[test]
fn test_upload_fields_into_request() {
    let file = UploadedFile {
        name: "main.docx".into(),
        mime_type: "application/msword".into(),
        bytes: b"PK".to_vec(),
    };
    let request = fields().into_request(Some(file)).unwrap();

    assert_eq!(request.label, "Main Text");
    assert_eq!(request.stage, "review");
    assert_eq!(request.uploaded_by, Some(UserId(12)));
    assert_eq!(request.round, Some(2));
    assert!(request.visible_to_authors);
    assert_eq!(request.review_round_id, None);
    assert!(request.file.is_some());
}

#[test]
fn test_upload_fields_empty_uploader_is_missing() {
    let mut fields = fields();
    fields.set("uploadedBy", "  ".into());
    assert_eq!(fields.uploaded_by().unwrap(), None);

    fields.set("uploadedBy", "editor".into());
    assert!(fields.uploaded_by().is_err());
}

#[test]
fn test_upload_fields_bad_round() {
    let mut fields = fields();
    fields.set("round", "second".into());
    assert!(fields.into_request(None).is_err());
}

#[test]
fn test_upload_response_success_message() {
    let file = SubmissionFile {
        id: FileId(5),
        submission_id: SubmissionId(1),
        stage: Stage::Copyediting,
        kind: FileKind::default(),
        label: "Copyedited".into(),
        original_name: "copyedited.docx".into(),
        mime_type: "application/msword".into(),
        size: 2,
        storage_path: "submissions/1/copyediting/5-Copyedited.docx".into(),
        version_label: None,
        round: 1,
        review_round_id: None,
        visible_to_authors: false,
        uploaded_by: UserId(20),
        uploaded_at: Timestamp(500),
    };
    let response = UploadResponse::success(file);
    assert!(response.ok);
    assert_eq!(response.message, "File Copyedited uploaded to Copyediting.");

    let json = serde_json::to_value(UploadResponse::error("file is required")).unwrap();
    assert_eq!(json["ok"], false);
    assert!(json["file"].is_null());
}

// =============================================================================
// FILE COPY
// =============================================================================

#[test]
fn test_copy_files_request_parts() {
    let json = r#"{"actor_id":20,"file_ids":[3,5],"target_stage":"copyediting"}"#;
    let request: CopyFilesRequest = serde_json::from_str(json).unwrap();
    let (actor, files, target) = request.to_parts().unwrap();

    assert_eq!(actor, UserId(20));
    assert_eq!(files, vec![FileId(3), FileId(5)]);
    assert_eq!(target, Stage::Copyediting);
}

#[test]
fn test_copy_files_request_unknown_stage() {
    let request = CopyFilesRequest {
        actor_id: 20,
        file_ids: vec![3],
        target_stage: "layout".into(),
    };
    assert!(matches!(
        request.to_parts(),
        Err(QuireError::InvalidStage(_))
    ));
}

// =============================================================================
// DISCUSSION REQUESTS
// =============================================================================

#[test]
fn test_create_query_request() {
    let json = r#"{"actor_id":20,"stage":"submission","title":"Scope","message":"Is this in scope?","participants":[10,10,30]}"#;
    let request: CreateQueryRequest = serde_json::from_str(json).unwrap();
    let (actor, query) = request.to_new_query().unwrap();

    assert_eq!(actor, UserId(20));
    assert_eq!(query.stage, Stage::Submission);
    assert_eq!(query.participants.len(), 3);
}

#[test]
fn test_note_request_optional_title() {
    let request: NoteRequest =
        serde_json::from_str(r#"{"actor_id":10,"contents":"Done."}"#).unwrap();
    let (actor, note) = request.to_new_note();
    assert_eq!(actor, UserId(10));
    assert_eq!(note.title, None);
    assert_eq!(note.contents, "Done.");
}

// =============================================================================
// EXPORT / DOWNLOAD
// =============================================================================

#[test]
fn test_export_response_success() {
    let response = ExportResponse::success(b"QUIR\x01", 42, "ab".repeat(32));
    assert!(response.ok);
    assert_eq!(response.data.as_deref(), Some("UVVJUgE="));
    assert_eq!(response.size, 5);
    assert_eq!(response.checksum, 42);
    assert!(response.error.is_none());
}

#[test]
fn test_export_response_error() {
    let response = ExportResponse::error("Export failed");
    assert!(!response.ok);
    assert!(response.data.is_none());
    assert_eq!(response.error.as_deref(), Some("Export failed"));
}

#[test]
fn test_content_disposition_quotes_safely() {
    assert_eq!(
        content_disposition("draft v2.pdf"),
        "attachment; filename=\"draft v2.pdf\""
    );
    assert_eq!(
        content_disposition("a\"b\\c\nd.pdf"),
        "attachment; filename=\"a_b_c_d.pdf\""
    );
}
