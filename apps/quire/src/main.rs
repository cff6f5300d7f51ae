//! # Quire - Editorial Workflow Server
//!
//! The main binary for the Quire submission workflow.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for submissions, workflow moves and uploads
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                 apps/quire (THE BINARY)               │
//! │                                                       │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────┐  │
//! │  │   CLI       │    │   HTTP API  │    │  Blobs   │  │
//! │  │  (clap)     │    │   (axum)    │    │  (dir)   │  │
//! │  └──────┬──────┘    └──────┬──────┘    └────┬─────┘  │
//! │         └──────────────────┼────────────────┘        │
//! │                            ▼                          │
//! │                    ┌───────────────┐                  │
//! │                    │  quire-core   │                  │
//! │                    │ (THE WORKFLOW)│                  │
//! │                    └───────────────┘                  │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! quire server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! quire seed -f fixtures.json
//! quire list --queue unassigned
//! quire workflow 1 --stage review
//! quire advance 1 --actor 2
//! ```

use clap::Parser;
use quire::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // QUIRE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("QUIRE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quire=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        println!("Quire editorial workflow v{}", env!("CARGO_PKG_VERSION"));
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
