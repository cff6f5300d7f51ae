//! # Directory Blob Store
//!
//! Uploaded file content on the local filesystem, one file per storage
//! path under a root directory.
//!
//! Storage paths come from the core and are always relative; anything
//! that could escape the root (absolute paths, `..`, empty segments) is
//! rejected before touching the filesystem.

use quire_core::{BlobStore, QuireError};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

/// A [`BlobStore`] rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    /// Open (and create if needed) a blob directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, QuireError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| {
            QuireError::IoError(format!("Cannot create blob dir '{}': {}", root.display(), e))
        })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, QuireError> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && !path.split('/').any(str::is_empty)
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(QuireError::validation(format!(
                "Invalid storage path: {path:?}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for DirBlobStore {
    fn put(&mut self, path: &str, bytes: &[u8]) -> Result<(), QuireError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| QuireError::IoError(format!("Create dir for {path}: {e}")))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    QuireError::IoError(format!("blob already exists: {path}"))
                }
                _ => QuireError::IoError(format!("Write blob {path}: {e}")),
            })?;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| QuireError::IoError(format!("Write blob {path}: {e}")))
    }

    fn get(&self, path: &str) -> Result<Option<Vec<u8>>, QuireError> {
        let target = self.resolve(path)?;
        match std::fs::read(&target) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(QuireError::IoError(format!("Read blob {path}: {e}"))),
        }
    }

    fn remove(&mut self, path: &str) -> Result<bool, QuireError> {
        let target = self.resolve(path)?;
        match std::fs::remove_file(&target) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(QuireError::IoError(format!("Remove blob {path}: {e}"))),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut blobs = DirBlobStore::open(dir.path().join("files")).expect("open");

        blobs
            .put("submissions/1/review/100-Draft.pdf", b"%PDF")
            .expect("put");
        assert_eq!(
            blobs
                .get("submissions/1/review/100-Draft.pdf")
                .expect("get"),
            Some(b"%PDF".to_vec())
        );
        assert!(blobs.root().join("submissions/1/review").is_dir());

        assert!(
            blobs
                .remove("submissions/1/review/100-Draft.pdf")
                .expect("remove")
        );
        assert!(
            !blobs
                .remove("submissions/1/review/100-Draft.pdf")
                .expect("remove again")
        );
        assert_eq!(blobs.get("submissions/1/review/100-Draft.pdf").expect("get"), None);
    }

    #[test]
    fn never_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut blobs = DirBlobStore::open(dir.path()).expect("open");
        blobs.put("a/b.txt", b"one").expect("put");
        assert!(blobs.put("a/b.txt", b"two").is_err());
        assert_eq!(blobs.get("a/b.txt").expect("get"), Some(b"one".to_vec()));
    }

    #[test]
    fn escaping_paths_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut blobs = DirBlobStore::open(dir.path()).expect("open");
        for path in ["", "/etc/passwd", "../outside", "a/../../b", "a//b", "./a"] {
            assert!(blobs.put(path, b"x").is_err(), "{path:?} accepted");
        }
    }
}
