//! # Configuration
//!
//! Optional TOML file with defaults for the server and storage. Command
//! line flags always win over the file, and the file over built-in
//! defaults.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 9000
//!
//! [storage]
//! database = "/var/lib/quire/quire.db"
//! backend = "redb"
//! blobs = "/var/lib/quire/files"
//! ```

use quire_core::QuireError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Maximum accepted config file size (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE: &str = "quire.db";
pub const DEFAULT_BLOBS: &str = "quire-files";

// =============================================================================
// FILE FORMAT
// =============================================================================

/// Contents of a config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerSection,
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    pub database: Option<PathBuf>,
    pub backend: Option<String>,
    pub blobs: Option<PathBuf>,
}

impl FileConfig {
    /// Parse config text.
    pub fn parse(text: &str) -> Result<Self, QuireError> {
        toml::from_str(text)
            .map_err(|e| QuireError::DeserializationError(format!("Invalid config: {e}")))
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, QuireError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            QuireError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(QuireError::validation(format!(
                "Config file size {} bytes exceeds maximum {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            QuireError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::parse(&text)
    }
}

// =============================================================================
// RESOLVED SETTINGS
// =============================================================================

/// Where the workflow rows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// redb database (ACID, written on every change).
    Redb,
    /// A snapshot file, loaded at start and written back by mutating commands.
    File,
}

impl Backend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Redb => "redb",
            Backend::File => "file",
        }
    }
}

impl FromStr for Backend {
    type Err = QuireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redb" => Ok(Backend::Redb),
            "file" => Ok(Backend::File),
            other => Err(QuireError::validation(format!(
                "Unknown backend: {other}. Use: redb, file"
            ))),
        }
    }
}

/// Command-line values that may override the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub backend: Option<String>,
    pub blobs: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Effective settings after merging flags, file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub database: PathBuf,
    pub backend: Backend,
    pub blobs: PathBuf,
    pub host: String,
    pub port: u16,
}

impl RuntimeConfig {
    /// Merge `overrides` over `file` over the defaults.
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Result<Self, QuireError> {
        let backend = overrides
            .backend
            .or(file.storage.backend)
            .as_deref()
            .map(str::parse::<Backend>)
            .transpose()?
            .unwrap_or(Backend::Redb);

        Ok(Self {
            database: overrides
                .database
                .or(file.storage.database)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            backend,
            blobs: overrides
                .blobs
                .or(file.storage.blobs)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BLOBS)),
            host: overrides
                .host
                .or(file.server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
        })
    }

    /// `host:port` to bind the server to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file_or_flags() {
        let config =
            RuntimeConfig::resolve(Overrides::default(), FileConfig::default()).expect("resolve");
        assert_eq!(config.backend, Backend::Redb);
        assert_eq!(config.database, PathBuf::from(DEFAULT_DATABASE));
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn flags_override_file() {
        let file = FileConfig::parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [storage]
            backend = "file"
            blobs = "/srv/files"
            "#,
        )
        .expect("parse");
        let config = RuntimeConfig::resolve(
            Overrides {
                port: Some(7000),
                ..Overrides::default()
            },
            file,
        )
        .expect("resolve");
        assert_eq!(config.bind_addr(), "0.0.0.0:7000");
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.blobs, PathBuf::from("/srv/files"));
    }

    #[test]
    fn unknown_keys_and_backends_rejected() {
        assert!(FileConfig::parse("[server]\nhots = \"x\"").is_err());
        let file = FileConfig::parse("[storage]\nbackend = \"sqlite\"").expect("parse");
        assert!(RuntimeConfig::resolve(Overrides::default(), file).is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("quire.toml");
        std::fs::write(&path, "[server]\nport = 8181\n").expect("write");
        let file = FileConfig::load(&path).expect("load");
        assert_eq!(file.server.port, Some(8181));
        assert!(FileConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
