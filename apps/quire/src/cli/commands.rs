//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Mutating commands write the session back with [`save_session`] when the
//! file backend is in use; redb commits on every change.

use crate::api::{self, AppState, ListParams, WorkflowRequest};
use crate::blobs::DirBlobStore;
use crate::config::{Backend, RuntimeConfig};
use crate::now;
use quire_core::{
    QuireError, Session, Snapshot, SubmissionId, UploadRequest, UploadedFile, UserId,
    formats::MAX_SNAPSHOT_SIZE, primitives::MAX_UPLOAD_BYTES, snapshot_checksum,
    snapshot_digest, snapshot_from_bytes, snapshot_to_bytes,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a JSON fixture (100 MB).
const MAX_SEED_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), QuireError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| QuireError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(QuireError::validation(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path, following symlinks and `..`, and require a
/// regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, QuireError> {
    let canonical = path.canonicalize().map_err(|e| {
        QuireError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(QuireError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path against its canonical parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, QuireError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        QuireError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(QuireError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| QuireError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), QuireError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| QuireError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server. With the file backend the session is written
/// back once the server has shut down.
pub async fn cmd_server(config: &RuntimeConfig) -> Result<(), QuireError> {
    let session = load_or_create_session(&config.database, config.backend)?;
    let blobs = DirBlobStore::open(&config.blobs)?;

    println!("Quire Editorial Workflow Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", config.host);
    println!("  Port:     {}", config.port);
    println!("  Backend:  {}", config.backend.as_str());
    println!("  Database: {:?}", config.database);
    println!("  Blobs:    {:?}", config.blobs);
    println!();
    println!("Endpoints:");
    println!("  GET  /submissions               - List submissions");
    println!("  GET  /submissions/{{id}}          - Submission detail");
    println!("  GET  /submissions/{{id}}/workflow - Stage tabs and panel");
    println!("  POST /submissions/{{id}}/workflow - Move stage / set status");
    println!("  POST /submissions/{{id}}/files/upload - Upload a file");
    println!("  GET  /dashboard                 - Queue counters");
    println!("  POST /export                    - Export snapshot");
    println!("  GET  /health                    - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::with_blobs(session, blobs);
    api::run_server(&config.bind_addr(), state.clone()).await?;

    let session = state.session.read().await;
    save_session(&session, &config.database)?;
    Ok(())
}

// =============================================================================
// READ COMMANDS
// =============================================================================

/// Show dashboard counters.
pub fn cmd_status(
    config: &RuntimeConfig,
    json_mode: bool,
    user: Option<u64>,
) -> Result<(), QuireError> {
    let session = load_or_create_session(&config.database, config.backend)?;
    let stats = session.dashboard(user.map(UserId))?;

    if json_mode {
        let output = serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": config.backend.as_str(),
            "submissions": session.submission_count()?,
            "dashboard": stats,
        });
        return print_json(&output);
    }

    println!("Quire Dashboard");
    println!("===============");
    println!("Database: {:?}", config.database);
    println!("Backend:  {}", config.backend.as_str());
    println!();
    if user.is_some() {
        println!("My queue:     {}", stats.my_queue);
    }
    println!("Unassigned:   {}", stats.unassigned);
    println!("Submission:   {}", stats.submission);
    println!("Review:       {}", stats.review);
    println!("Copyediting:  {}", stats.copyediting);
    println!("Production:   {}", stats.production);
    println!("All active:   {}", stats.all_active);
    println!("Archived:     {}", stats.archived);

    Ok(())
}

/// List one page of submissions.
pub fn cmd_list(
    config: &RuntimeConfig,
    json_mode: bool,
    params: &ListParams,
) -> Result<(), QuireError> {
    let filter = params.to_filter()?;
    let session = load_or_create_session(&config.database, config.backend)?;
    let page = session.list(&filter)?;

    if json_mode {
        return print_json(&page);
    }

    println!(
        "{} of {} submissions (offset {})",
        page.items.len(),
        page.total,
        filter.offset
    );
    for summary in &page.items {
        let s = &summary.submission;
        let assignees = if summary.assignees.is_empty() {
            "unassigned".to_string()
        } else {
            summary
                .assignees
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        println!(
            "  #{:<5} {:<12} {:<10} [{}] {}",
            s.id,
            s.stage.label(),
            s.status,
            assignees,
            s.title
        );
    }
    Ok(())
}

/// Show a submission's detail.
pub fn cmd_show(
    config: &RuntimeConfig,
    json_mode: bool,
    id: u64,
    user: Option<u64>,
) -> Result<(), QuireError> {
    let session = load_or_create_session(&config.database, config.backend)?;
    let detail = session.detail_for(SubmissionId(id), user.map(UserId))?;

    if json_mode {
        return print_json(&detail);
    }

    let s = &detail.submission;
    println!("Submission #{}: {}", s.id, s.title);
    println!("  Stage:  {}", s.stage.label());
    println!("  Status: {}", s.status);
    println!("  Author: {}", s.author_id);
    println!();
    println!("Participants:");
    for p in &detail.participants {
        match &p.name {
            Some(name) => println!("  {} ({}) - {}", p.user_id, name, p.role),
            None => println!("  {} - {}", p.user_id, p.role),
        }
    }
    println!("Files ({}):", detail.files.len());
    for f in &detail.files {
        println!(
            "  #{:<5} {:<12} {} ({} bytes)",
            f.id,
            f.stage.label(),
            f.label,
            f.size
        );
    }
    println!("Discussions ({}):", detail.queries.len());
    for q in &detail.queries {
        let state = if q.closed { "closed" } else { "open" };
        println!(
            "  {}-{} [{}] {}",
            q.stage.key(),
            q.seq,
            state,
            q.title().unwrap_or("(untitled)")
        );
    }
    println!("Recent activity:");
    for entry in &detail.activity {
        println!("  [{}] {}", entry.created_at.0, entry.message);
    }
    Ok(())
}

/// Show the stage tabs and the panel of the selected stage.
pub fn cmd_workflow(
    config: &RuntimeConfig,
    json_mode: bool,
    id: u64,
    tab: Option<&str>,
    stage: Option<&str>,
) -> Result<(), QuireError> {
    let session = load_or_create_session(&config.database, config.backend)?;
    let view = session.workflow_view(SubmissionId(id), tab, stage)?;

    if json_mode {
        return print_json(&view);
    }

    let tabs: Vec<String> = view
        .outline
        .tabs
        .iter()
        .map(|t| {
            if t.stage == view.state.active_stage {
                format!("[{}]", t.label)
            } else if t.completed {
                format!("{} \u{2713}", t.label)
            } else {
                t.label.to_string()
            }
        })
        .collect();
    println!("{}", tabs.join(" | "));
    println!();

    let panel = &view.panel;
    println!(
        "{}: {}",
        panel.stage.label(),
        if panel.can_upload {
            "accepting uploads"
        } else {
            "uploads closed"
        }
    );
    for f in &panel.files {
        println!("  file #{} {} ({})", f.id, f.label, f.kind);
    }
    for round in &panel.review_rounds {
        println!("  review round {} ({} reviews)", round.round, round.reviews.len());
    }
    for q in &panel.queries {
        println!(
            "  discussion {} {}",
            q.seq,
            q.title().unwrap_or("(untitled)")
        );
    }
    for g in &panel.galleys {
        println!("  galley {} ({})", g.label, g.locale);
    }
    Ok(())
}

// =============================================================================
// MUTATING COMMANDS
// =============================================================================

/// Apply a workflow change. Without a target stage or status the
/// submission moves to the next stage.
pub fn cmd_advance(
    config: &RuntimeConfig,
    json_mode: bool,
    id: u64,
    request: &WorkflowRequest,
) -> Result<(), QuireError> {
    let mut session = load_or_create_session(&config.database, config.backend)?;
    let submission_id = SubmissionId(id);
    let (actor, mut change) = request.to_change()?;
    if change.target_stage.is_none() && change.status.is_none() {
        let current = session.submission(submission_id)?.stage;
        change = quire_core::WorkflowChange {
            note: change.note,
            ..quire_core::WorkflowChange::advance_from(current)?
        };
    }

    let submission = session.apply_workflow(submission_id, actor, &change, now())?;
    save_session(&session, &config.database)?;

    if json_mode {
        return print_json(&submission);
    }
    println!(
        "Submission #{} is now in {} ({})",
        submission.id,
        submission.stage.label(),
        submission.status
    );
    Ok(())
}

/// Upload a local file to a stage.
pub fn cmd_upload(
    config: &RuntimeConfig,
    json_mode: bool,
    id: u64,
    path: &Path,
    mime_type: &str,
    mut request: UploadRequest,
) -> Result<(), QuireError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_UPLOAD_BYTES as u64)?;
    let bytes = std::fs::read(&validated)
        .map_err(|e| QuireError::IoError(format!("Read file: {}", e)))?;
    let name = validated
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    request.file = Some(UploadedFile {
        name,
        mime_type: mime_type.to_string(),
        bytes,
    });

    let mut session = load_or_create_session(&config.database, config.backend)?;
    let mut blobs = DirBlobStore::open(&config.blobs)?;
    let file = session.upload(SubmissionId(id), request, &mut blobs, now())?;
    save_session(&session, &config.database)?;

    if json_mode {
        return print_json(&file);
    }
    println!(
        "File {} uploaded to {} as #{} ({} bytes)",
        file.label,
        file.stage.label(),
        file.id,
        file.size
    );
    Ok(())
}

/// Load a JSON fixture into the database.
pub fn cmd_seed(config: &RuntimeConfig, input: &Path) -> Result<(), QuireError> {
    let validated = validate_file_path(input)?;
    validate_file_size(&validated, MAX_SEED_FILE_SIZE)?;
    let data = std::fs::read(&validated)
        .map_err(|e| QuireError::IoError(format!("Read file: {}", e)))?;
    let snapshot: Snapshot = serde_json::from_slice(&data)
        .map_err(|e| QuireError::DeserializationError(format!("Invalid fixture: {}", e)))?;

    let mut session = load_or_create_session(&config.database, config.backend)?;
    session.import_snapshot(&snapshot)?;
    save_session(&session, &config.database)?;

    println!(
        "Seeded {} submissions, {} files, {} discussions",
        snapshot.submissions.len(),
        snapshot.files.len(),
        snapshot.queries.len()
    );
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Export every row as a binary snapshot or as a JSON fixture.
pub fn cmd_export(config: &RuntimeConfig, output: &Path, format: &str) -> Result<(), QuireError> {
    let validated_output = validate_output_path(output)?;

    let session = load_or_create_session(&config.database, config.backend)?;
    let snapshot = session.export_snapshot()?;

    let data = match format {
        "snapshot" => {
            let data = snapshot_to_bytes(&snapshot)?;
            println!("Checksum: {}", snapshot_checksum(&data));
            println!("BLAKE3:   {}", snapshot_digest(&data));
            data
        }
        "json" => serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| QuireError::SerializationError(e.to_string()))?,
        _ => {
            return Err(QuireError::validation(format!(
                "Unknown format: {}. Use: snapshot, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| QuireError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

/// Import a binary snapshot into the database.
pub fn cmd_import(config: &RuntimeConfig, input: &Path) -> Result<(), QuireError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_SNAPSHOT_SIZE as u64)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| QuireError::IoError(format!("Read file: {}", e)))?;
    let snapshot = snapshot_from_bytes(&data)?;

    let mut session = load_or_create_session(&config.database, config.backend)?;
    session.import_snapshot(&snapshot)?;
    save_session(&session, &config.database)?;

    println!(
        "Imported snapshot: {} submissions, {} files",
        snapshot.submissions.len(),
        snapshot.files.len()
    );
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(config: &RuntimeConfig, force: bool) -> Result<(), QuireError> {
    let db_path = &config.database;
    if db_path.exists() {
        if !force {
            return Err(QuireError::validation(
                "Database already exists. Use --force to overwrite.",
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| QuireError::IoError(format!("Remove db: {}", e)))?;
    }

    match config.backend {
        Backend::Redb => {
            let _session = Session::with_redb(db_path)?;
            println!("Initialized new redb database at {:?}", db_path);
        }
        Backend::File => {
            save_session(&Session::new(), db_path)?;
            println!("Initialized new file database at {:?}", db_path);
        }
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load or create a session from a database path with specified backend.
pub fn load_or_create_session(db_path: &Path, backend: Backend) -> Result<Session, QuireError> {
    match backend {
        Backend::Redb => Session::with_redb(db_path),
        Backend::File => {
            let mut session = Session::new();
            if db_path.exists() {
                validate_file_size(db_path, MAX_SNAPSHOT_SIZE as u64)?;
                let data = std::fs::read(db_path)
                    .map_err(|e| QuireError::IoError(format!("Read db: {}", e)))?;
                session.import_snapshot(&snapshot_from_bytes(&data)?)?;
            }
            Ok(session)
        }
    }
}

/// Save a session to a database path. A no-op for redb.
pub fn save_session(session: &Session, db_path: &Path) -> Result<(), QuireError> {
    if session.is_persistent() {
        return Ok(());
    }
    let data = snapshot_to_bytes(&session.export_snapshot()?)?;
    std::fs::write(db_path, &data)
        .map_err(|e| QuireError::IoError(format!("Write db: {}", e)))
}

// =============================================================================
// TESTS
// =============================================================================
