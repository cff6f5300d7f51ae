//! # Workflow Primitives
//!
//! Hardcoded runtime constants for the Quire core.
//!
//! These limits are compiled into the binary and are immutable at runtime.
//! Input that exceeds them is rejected at the boundary, before any storage
//! or blob call is made.

/// Magic bytes for the Quire snapshot header.
///
/// - File Header = Magic Bytes ("QUIR") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"QUIR";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const FORMAT_VERSION: u8 = 1;

/// File kind used when an upload does not name one.
pub const DEFAULT_FILE_KIND: &str = "manuscript";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for file labels, in bytes.
pub const MAX_LABEL_LENGTH: usize = 255;

/// Maximum length for file kind tags, in bytes.
pub const MAX_FILE_KIND_LENGTH: usize = 64;

/// Maximum size of a single uploaded file (50 MB).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Maximum length for query titles and note contents (64 KB).
pub const MAX_NOTE_LENGTH: usize = 65536;

/// Maximum number of participants on one query.
pub const MAX_QUERY_PARTICIPANTS: usize = 50;

/// Maximum length for a submission title.
pub const MAX_TITLE_LENGTH: usize = 1024;

// =============================================================================
// READ MODEL LIMITS
// =============================================================================

/// Number of files included in a submission detail (newest first).
pub const MAX_DETAIL_FILES: usize = 50;

/// Number of activity entries included in a submission detail (newest first).
pub const MAX_DETAIL_ACTIVITY: usize = 20;

/// Default page size for submission listings.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Largest page size a listing will honour.
pub const MAX_LIST_LIMIT: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"QUIR");
    }

    #[test]
    fn list_limits_are_ordered() {
        assert!(DEFAULT_LIST_LIMIT <= MAX_LIST_LIMIT);
    }
}
