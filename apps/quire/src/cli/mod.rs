//! # Quire CLI Module
//!
//! This module implements the CLI interface for Quire.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show dashboard counters
//! - `list` - List submissions in a queue
//! - `show` - Show a submission's detail
//! - `workflow` - Show the stage tabs and one stage panel
//! - `advance` - Move a submission forward or change its status
//! - `upload` - Upload a file to a stage
//! - `seed` - Load a JSON fixture
//! - `export` - Export every row to a file
//! - `import` - Import a snapshot file
//! - `init` - Initialize a new database

mod commands;

use crate::config::{FileConfig, Overrides, RuntimeConfig};
use clap::{Parser, Subcommand};
use quire_core::QuireError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Quire - editorial workflow for journal submissions
///
/// Submissions move through submission, review, copyediting and production;
/// files and discussions are attached to the stage they belong to.
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the workflow database [default: quire.db]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (ACID database) or "file" (snapshot file) [default: redb]
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Directory holding uploaded file content [default: quire-files]
    #[arg(long, global = true)]
    pub blobs: Option<PathBuf>,

    /// TOML config file with defaults for the flags above
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to [default: 127.0.0.1]
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to [default: 8080]
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show dashboard counters
    Status {
        /// User whose "my queue" is counted
        #[arg(short, long)]
        user: Option<u64>,
    },

    /// List submissions
    List {
        /// Queue: all, mine, unassigned, archived
        #[arg(long, default_value = "all")]
        queue: String,

        /// Only submissions in this stage
        #[arg(short, long)]
        stage: Option<String>,

        /// Case-insensitive title search
        #[arg(long)]
        search: Option<String>,

        /// Page size
        #[arg(short, long)]
        limit: Option<usize>,

        /// Rows to skip
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Requesting user (needed for the "mine" queue)
        #[arg(short, long)]
        user: Option<u64>,
    },

    /// Show a submission's detail
    Show {
        /// Submission ID
        id: u64,

        /// View as this user (authors see the author projection)
        #[arg(short, long)]
        user: Option<u64>,
    },

    /// Show the stage tabs and the panel of one stage
    Workflow {
        /// Submission ID
        id: u64,

        /// Detail tab: workflow, publication
        #[arg(short, long)]
        tab: Option<String>,

        /// Stage to show (clamped to the current stage)
        #[arg(short, long)]
        stage: Option<String>,
    },

    /// Move a submission to the next (or a given) stage and/or set its status
    Advance {
        /// Submission ID
        id: u64,

        /// Acting user (must hold an editorial role)
        #[arg(short, long)]
        actor: u64,

        /// Target stage [default: the stage after the current one]
        #[arg(short, long)]
        to: Option<String>,

        /// New status
        #[arg(long)]
        status: Option<String>,

        /// Note recorded with the change
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Upload a file to a stage of a submission
    Upload {
        /// Submission ID
        id: u64,

        /// File to upload
        #[arg(short, long)]
        file: PathBuf,

        /// Label shown in the file list
        #[arg(short, long)]
        label: String,

        /// Target stage
        #[arg(short, long)]
        stage: String,

        /// File kind
        #[arg(short, long, default_value = "manuscript")]
        kind: String,

        /// Uploading user
        #[arg(short, long)]
        uploaded_by: u64,

        /// MIME type recorded for downloads
        #[arg(long, default_value = "application/octet-stream")]
        mime: String,

        /// Version label (e.g. "v2")
        #[arg(long)]
        version_label: Option<String>,

        /// Share the file with the submission's authors
        #[arg(long)]
        visible_to_authors: bool,
    },

    /// Load submissions, files and settings from a JSON fixture
    Seed {
        /// Path to the JSON fixture
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export every row to a file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (snapshot, json)
        #[arg(short = 't', long, default_value = "snapshot")]
        format: String,
    },

    /// Import a binary snapshot
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

impl Cli {
    /// Merge the global flags with the config file, if any.
    pub fn runtime_config(
        &self,
        host: Option<String>,
        port: Option<u16>,
    ) -> Result<RuntimeConfig, QuireError> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        RuntimeConfig::resolve(
            Overrides {
                database: self.database.clone(),
                backend: self.backend.clone(),
                blobs: self.blobs.clone(),
                host,
                port,
            },
            file,
        )
    }
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), QuireError> {
    let json_mode = cli.json_mode;
    let (host, port) = match &cli.command {
        Some(Commands::Server { host, port }) => (host.clone(), *port),
        _ => (None, None),
    };
    let config = cli.runtime_config(host, port)?;
    if cli.verbose {
        tracing::info!(
            database = %config.database.display(),
            backend = config.backend.as_str(),
            blobs = %config.blobs.display(),
            "resolved configuration"
        );
    }

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(&config).await,
        Some(Commands::Status { user }) => cmd_status(&config, json_mode, user),
        Some(Commands::List {
            queue,
            stage,
            search,
            limit,
            offset,
            user,
        }) => cmd_list(
            &config,
            json_mode,
            &crate::api::ListParams {
                queue: Some(queue),
                stage,
                search,
                limit,
                offset: Some(offset),
                user,
            },
        ),
        Some(Commands::Show { id, user }) => cmd_show(&config, json_mode, id, user),
        Some(Commands::Workflow { id, tab, stage }) => {
            cmd_workflow(&config, json_mode, id, tab.as_deref(), stage.as_deref())
        }
        Some(Commands::Advance {
            id,
            actor,
            to,
            status,
            note,
        }) => cmd_advance(
            &config,
            json_mode,
            id,
            &crate::api::WorkflowRequest {
                actor_id: actor,
                target_stage: to,
                status,
                note,
            },
        ),
        Some(Commands::Upload {
            id,
            file,
            label,
            stage,
            kind,
            uploaded_by,
            mime,
            version_label,
            visible_to_authors,
        }) => cmd_upload(
            &config,
            json_mode,
            id,
            &file,
            &mime,
            quire_core::UploadRequest {
                file: None,
                label,
                stage,
                kind,
                uploaded_by: Some(quire_core::UserId(uploaded_by)),
                version_label,
                round: None,
                visible_to_authors,
                review_round_id: None,
            },
        ),
        Some(Commands::Seed { file }) => cmd_seed(&config, &file),
        Some(Commands::Export { output, format }) => cmd_export(&config, &output, &format),
        Some(Commands::Import { input }) => cmd_import(&config, &input),
        Some(Commands::Init { force }) => cmd_init(&config, force),
        None => {
            // No subcommand - show the dashboard by default
            cmd_status(&config, json_mode, None)
        }
    }
}
