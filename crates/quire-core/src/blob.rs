//! # Blob Storage
//!
//! Binary file content addressed by storage path.
//!
//! Rows only record the path; the bytes live behind [`BlobStore`]. Writes
//! never overwrite: putting to an existing path is an error.

use crate::QuireError;
use std::collections::BTreeMap;

/// Storage for uploaded file content.
pub trait BlobStore {
    /// Store `bytes` at `path`. Fails if `path` is taken.
    fn put(&mut self, path: &str, bytes: &[u8]) -> Result<(), QuireError>;

    /// Read the bytes stored at `path`.
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>, QuireError>;

    /// Remove `path`. Returns whether anything was removed.
    fn remove(&mut self, path: &str) -> Result<bool, QuireError>;
}

/// In-memory blob store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&mut self, path: &str, bytes: &[u8]) -> Result<(), QuireError> {
        if self.blobs.contains_key(path) {
            return Err(QuireError::IoError(format!("blob already exists: {path}")));
        }
        self.blobs.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Option<Vec<u8>>, QuireError> {
        Ok(self.blobs.get(path).cloned())
    }

    fn remove(&mut self, path: &str) -> Result<bool, QuireError> {
        Ok(self.blobs.remove(path).is_some())
    }
}
