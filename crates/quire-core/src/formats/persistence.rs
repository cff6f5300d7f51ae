//! # Snapshot Format
//!
//! Binary serialization of a whole workflow store.
//!
//! File I/O happens in the app layer; this module only converts between a
//! [`Snapshot`] and bytes.
//!
//! Format: Header (5 bytes) + postcard-serialized snapshot.
//! - 4 bytes: Magic ("QUIR")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded.

use crate::activity::ActivityEntry;
use crate::file::{Galley, SubmissionFile};
use crate::query::Query;
use crate::review::ReviewRound;
use crate::settings::{Category, JournalSetting, Section};
use crate::store::{Sequence, WorkflowStore};
use crate::submission::{Participant, Submission};
use crate::{QuireError, SubmissionId, primitives};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum accepted snapshot size, checked before decoding (256 MB).
pub const MAX_SNAPSHOT_SIZE: usize = 256 * 1024 * 1024;

/// Header length in bytes.
const HEADER_LEN: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The header that precedes every snapshot payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Check magic bytes and version.
    pub fn validate(&self) -> Result<(), QuireError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(QuireError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(QuireError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, QuireError> {
        let header = bytes
            .get(..HEADER_LEN)
            .ok_or_else(|| QuireError::DeserializationError("Header too short".to_string()))?;
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Every row of a store, in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub submissions: Vec<Submission>,
    pub files: Vec<SubmissionFile>,
    pub galleys: Vec<Galley>,
    pub review_rounds: Vec<ReviewRound>,
    pub queries: Vec<Query>,
    pub participants: Vec<Participant>,
    pub activity: Vec<ActivityEntry>,
    pub settings: Vec<JournalSetting>,
    pub sections: Vec<Section>,
    pub categories: Vec<Category>,
}

impl Snapshot {
    /// Read every row out of `store`.
    pub fn capture(store: &dyn WorkflowStore) -> Result<Self, QuireError> {
        let mut snapshot = Snapshot {
            submissions: store.submissions()?,
            ..Snapshot::default()
        };
        for submission in &snapshot.submissions {
            let id = submission.id;
            snapshot.files.extend(store.files(id)?);
            snapshot.galleys.extend(store.galleys(id)?);
            snapshot.review_rounds.extend(store.review_rounds(id)?);
            snapshot.queries.extend(store.queries(id)?);
            snapshot.participants.extend(store.participants(id)?);
            snapshot.activity.extend(store.activity(id)?);
        }
        for journal in store.journals()? {
            snapshot.settings.extend(store.settings(journal)?);
            snapshot.sections.extend(store.sections(journal)?);
            snapshot.categories.extend(store.categories(journal)?);
        }
        Ok(snapshot)
    }

    /// Write every row into `store` and raise its sequences past the
    /// highest imported identifiers.
    ///
    /// Nothing is written if a row belongs to a submission that is neither
    /// in the snapshot nor already in `store`.
    pub fn restore_into(&self, store: &mut dyn WorkflowStore) -> Result<(), QuireError> {
        self.check_owners(&*store)?;
        for row in &self.submissions {
            store.put_submission(row)?;
        }
        for row in &self.files {
            store.put_file(row)?;
        }
        for row in &self.galleys {
            store.put_galley(row)?;
        }
        for row in &self.review_rounds {
            store.put_review_round(row)?;
        }
        for row in &self.queries {
            store.put_query(row)?;
        }
        for row in &self.participants {
            store.put_participant(row)?;
        }
        for row in &self.activity {
            store.append_activity(row)?;
        }
        for row in &self.settings {
            store.put_setting(row)?;
        }
        for row in &self.sections {
            store.put_section(row)?;
        }
        for row in &self.categories {
            store.put_category(row)?;
        }
        for seq in Sequence::ALL {
            store.ensure_sequence(seq, self.max_id(seq))?;
        }
        Ok(())
    }

    fn check_owners(&self, store: &dyn WorkflowStore) -> Result<(), QuireError> {
        let known: BTreeSet<SubmissionId> = self.submissions.iter().map(|s| s.id).collect();
        let owners = self
            .files
            .iter()
            .map(|r| ("file", r.submission_id))
            .chain(self.galleys.iter().map(|r| ("galley", r.submission_id)))
            .chain(
                self.review_rounds
                    .iter()
                    .map(|r| ("review round", r.submission_id)),
            )
            .chain(self.queries.iter().map(|r| ("query", r.submission_id)))
            .chain(
                self.participants
                    .iter()
                    .map(|r| ("participant", r.submission_id)),
            )
            .chain(self.activity.iter().map(|r| ("activity", r.submission_id)));

        for (kind, owner) in owners {
            if !known.contains(&owner) && store.submission(owner)?.is_none() {
                return Err(QuireError::InconsistentDetail(format!(
                    "{kind} row belongs to unknown submission {owner}"
                )));
            }
        }
        Ok(())
    }

    /// Highest identifier of `seq` present in the snapshot (0 if none).
    #[must_use]
    pub fn max_id(&self, seq: Sequence) -> u64 {
        let ids: Vec<u64> = match seq {
            Sequence::Submission => self.submissions.iter().map(|r| r.id.value()).collect(),
            Sequence::File => self.files.iter().map(|r| r.id.value()).collect(),
            Sequence::Galley => self.galleys.iter().map(|r| r.id.value()).collect(),
            Sequence::ReviewRound => self.review_rounds.iter().map(|r| r.id.value()).collect(),
            Sequence::Review => self
                .review_rounds
                .iter()
                .flat_map(|r| r.reviews.iter().map(|review| review.id.value()))
                .collect(),
            Sequence::Query => self.queries.iter().map(|r| r.id.value()).collect(),
            Sequence::Note => self
                .queries
                .iter()
                .flat_map(|q| q.notes.iter().map(|note| note.id.value()))
                .collect(),
            Sequence::Activity => self.activity.iter().map(|r| r.id.value()).collect(),
            Sequence::Section => self.sections.iter().map(|r| r.id.value()).collect(),
            Sequence::Category => self.categories.iter().map(|r| r.id.value()).collect(),
        };
        ids.into_iter().max().unwrap_or(0)
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a snapshot to bytes (header + payload).
pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, QuireError> {
    let header = SnapshotHeader::new();
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| QuireError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN.saturating_add(payload.len()));
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a snapshot from bytes.
///
/// Checks minimum size, maximum size and the header before touching the
/// payload.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Snapshot, QuireError> {
    if bytes.len() < HEADER_LEN {
        return Err(QuireError::DeserializationError(format!(
            "Data too short: minimum {HEADER_LEN} bytes required"
        )));
    }
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(QuireError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    SnapshotHeader::from_bytes(bytes)?.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        QuireError::DeserializationError(format!("Failed to decode snapshot: {e}"))
    })
}

/// Non-cryptographic checksum of snapshot bytes, for quick comparisons.
#[must_use]
pub fn snapshot_checksum(bytes: &[u8]) -> u64 {
    bytes.iter().enumerate().fold(0u64, |hash, (i, byte)| {
        // rotation depends on position so reordered bytes change the sum
        let shift = u32::try_from(i % 64).unwrap_or(0);
        hash ^ u64::from(*byte).rotate_left(shift).wrapping_mul(0x0100_0000_01b3)
    })
}

/// BLAKE3 digest of snapshot bytes, hex encoded.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn snapshot_digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::submission::{Role, SubmissionStatus};
    use crate::workflow::Stage;
    use crate::{JournalId, SubmissionId, Timestamp, UserId};

    fn store_with_one_submission() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .put_submission(&Submission {
                id: SubmissionId(4),
                journal_id: JournalId(1),
                title: "Glacial Retreat".into(),
                author_id: UserId(2),
                stage: Stage::Review,
                status: SubmissionStatus::InReview,
                is_archived: false,
                submitted_at: Timestamp(10),
                updated_at: Timestamp(20),
            })
            .expect("put");
        store
    }

    #[test]
    fn header_roundtrip() {
        let bytes = SnapshotHeader::new().to_bytes();
        let restored = SnapshotHeader::from_bytes(&bytes).expect("parse header");
        assert_eq!(restored, SnapshotHeader::new());
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let snapshot = Snapshot::capture(&store_with_one_submission()).expect("capture");
        let bytes1 = snapshot_to_bytes(&snapshot).expect("serialize");
        let restored = snapshot_from_bytes(&bytes1).expect("deserialize");
        let bytes2 = snapshot_to_bytes(&restored).expect("serialize again");
        assert_eq!(bytes1, bytes2);
        assert_eq!(snapshot_checksum(&bytes1), snapshot_checksum(&bytes2));
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(snapshot_from_bytes(&bytes).is_err());
        assert!(snapshot_from_bytes(b"QUI").is_err());
    }

    #[test]
    fn restore_raises_sequences() {
        let snapshot = Snapshot::capture(&store_with_one_submission()).expect("capture");
        let mut target = MemoryStore::new();
        snapshot.restore_into(&mut target).expect("restore");
        assert_eq!(target.next_id(Sequence::Submission).expect("id"), 5);
        assert_eq!(target.next_id(Sequence::File).expect("id"), 1);
    }

    fn editor_of(submission_id: SubmissionId) -> Participant {
        Participant {
            submission_id,
            user_id: UserId(3),
            role: Role::Editor,
            stage: Stage::Submission,
            assigned_at: Timestamp(30),
            name: None,
        }
    }

    #[test]
    fn orphan_rows_are_rejected_before_writing() {
        let snapshot = Snapshot {
            submissions: Snapshot::capture(&store_with_one_submission())
                .expect("capture")
                .submissions,
            participants: vec![editor_of(SubmissionId(9))],
            ..Snapshot::default()
        };
        let mut target = MemoryStore::new();
        let err = snapshot.restore_into(&mut target).expect_err("orphan");
        assert!(matches!(err, QuireError::InconsistentDetail(_)));
        assert!(target.submissions().expect("list").is_empty());
    }

    #[test]
    fn rows_may_belong_to_submissions_already_stored() {
        let mut target = store_with_one_submission();
        let snapshot = Snapshot {
            participants: vec![editor_of(SubmissionId(4))],
            ..Snapshot::default()
        };
        snapshot.restore_into(&mut target).expect("restore");
        assert_eq!(target.participants(SubmissionId(4)).expect("list").len(), 1);
    }

    #[test]
    fn checksum_depends_on_order() {
        assert_ne!(snapshot_checksum(b"ab"), snapshot_checksum(b"ba"));
    }
}
