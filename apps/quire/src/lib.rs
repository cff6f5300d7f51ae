//! # quire
//!
//! HTTP server and CLI for the Quire editorial workflow engine.
//!
//! The binary in `main.rs` only sets up logging and hands the parsed
//! command line to [`cli::execute`]. Everything else lives here so the
//! integration tests can build the router directly.

pub mod api;
pub mod blobs;
pub mod cli;
pub mod config;

use quire_core::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time. The core never reads the clock itself.
#[must_use]
pub fn now() -> Timestamp {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Timestamp::from_secs(secs)
}
