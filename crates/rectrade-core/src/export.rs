//! # Ledger Snapshot Export
//!
//! > redb files are NOT guaranteed bit-identical across replicas.
//! > The snapshot is the Source of Truth for comparing ledger state.
//!
//! A snapshot is the ordered list of every `(key, value)` pair in the
//! namespace plus a header with an entry count and a checksum. Two
//! replicas that executed the same operations produce identical snapshots.
//!
//! Format (JSON):
//! ```text
//! { "header": { "format", "version", "entry_count", "checksum" },
//!   "entries": [ { "key", "value" }, ... ] }
//! ```

use crate::primitives::TRANSACTION_SEQUENCE_KEY;
use crate::sequence::{self, SequenceAllocator};
use crate::store::{LedgerStore, WriteBatch};
use crate::types::RecError;
use serde::{Deserialize, Serialize};

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Format tag written in every snapshot header.
pub const SNAPSHOT_FORMAT: &str = "rectrade-snapshot";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Maximum entry count accepted on import.
pub const MAX_IMPORT_ENTRY_COUNT: u64 = 1_000_000;

/// Header of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub format: String,
    pub version: u8,
    pub entry_count: u64,
    /// FNV-1a over the ordered entries.
    pub checksum: u64,
}

/// One stored key and its UTF-8 value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: String,
}

/// Full ledger state in key order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub header: SnapshotHeader,
    pub entries: Vec<SnapshotEntry>,
}

impl LedgerSnapshot {
    /// Capture every entry of `store`.
    pub fn capture<S: LedgerStore>(store: &S) -> Result<Self, RecError> {
        let entries = store
            .scan_range("", "")?
            .map(|(key, bytes)| {
                String::from_utf8(bytes)
                    .map(|value| SnapshotEntry {
                        key: key.clone(),
                        value,
                    })
                    .map_err(|_| RecError::Serialization(format!("value at {} is not UTF-8", key)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let header = SnapshotHeader {
            format: SNAPSHOT_FORMAT.to_string(),
            version: SNAPSHOT_VERSION,
            entry_count: entries.len() as u64,
            checksum: entries_checksum(&entries),
        };
        Ok(Self { header, entries })
    }

    /// Check header fields against the entries.
    pub fn verify(&self) -> Result<(), RecError> {
        if self.header.format != SNAPSHOT_FORMAT {
            return Err(RecError::Serialization(format!(
                "unknown snapshot format {:?}",
                self.header.format
            )));
        }
        if self.header.version != SNAPSHOT_VERSION {
            return Err(RecError::Serialization(format!(
                "unsupported snapshot version {}",
                self.header.version
            )));
        }
        if self.header.entry_count > MAX_IMPORT_ENTRY_COUNT {
            return Err(RecError::Serialization(format!(
                "entry count {} exceeds maximum {}",
                self.header.entry_count, MAX_IMPORT_ENTRY_COUNT
            )));
        }
        if self.header.entry_count != self.entries.len() as u64 {
            return Err(RecError::Serialization(format!(
                "header says {} entries, found {}",
                self.header.entry_count,
                self.entries.len()
            )));
        }
        let actual = entries_checksum(&self.entries);
        if actual != self.header.checksum {
            return Err(RecError::Serialization(format!(
                "checksum mismatch: header {:016x}, entries {:016x}",
                self.header.checksum, actual
            )));
        }
        Ok(())
    }
}

// =============================================================================
// CHECKSUM
// =============================================================================

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Order-sensitive checksum. Separators keep `("ab","c")` and `("a","bc")` apart.
fn entries_checksum(entries: &[SnapshotEntry]) -> u64 {
    entries.iter().fold(FNV_OFFSET, |hash, entry| {
        let hash = fnv1a(hash, entry.key.as_bytes());
        let hash = fnv1a(hash, &[0x00]);
        let hash = fnv1a(hash, entry.value.as_bytes());
        fnv1a(hash, &[0xff])
    })
}

/// Checksum of the whole ledger state.
pub fn state_checksum<S: LedgerStore>(store: &S) -> Result<u64, RecError> {
    Ok(LedgerSnapshot::capture(store)?.header.checksum)
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Export the ledger as pretty-printed snapshot JSON.
pub fn export_snapshot<S: LedgerStore>(store: &S) -> Result<Vec<u8>, RecError> {
    let snapshot = LedgerSnapshot::capture(store)?;
    serde_json::to_vec_pretty(&snapshot).map_err(|e| RecError::Serialization(e.to_string()))
}

/// Restore a snapshot into a store that holds no records.
///
/// The store may already carry the sequence counter (every opened ledger
/// does); it is replaced in the same batch. The new counter is the
/// snapshot's, raised to one past the highest imported `TRANSACTION_<n>`
/// when the snapshot has no counter or a stale one. The snapshot is
/// verified before anything is written, and all entries are committed in
/// one batch. Returns the number of snapshot entries written.
pub fn import_snapshot<S: LedgerStore>(store: &mut S, data: &[u8]) -> Result<usize, RecError> {
    let snapshot: LedgerSnapshot =
        serde_json::from_slice(data).map_err(|e| RecError::Serialization(e.to_string()))?;
    snapshot.verify()?;

    if let Some((key, _)) = store
        .scan_range("", "")?
        .find(|(key, _)| key != TRANSACTION_SEQUENCE_KEY)
    {
        return Err(RecError::AlreadyExists(format!(
            "target ledger is not empty (found {})",
            key
        )));
    }

    let (counters, records): (Vec<&SnapshotEntry>, Vec<&SnapshotEntry>) = snapshot
        .entries
        .iter()
        .partition(|entry| entry.key == TRANSACTION_SEQUENCE_KEY);

    let declared = counters
        .first()
        .map(|entry| sequence::decode(entry.value.as_bytes()))
        .transpose()?;
    let floor = SequenceAllocator::seed_after(records.iter().map(|entry| entry.key.as_str()));
    let next = declared.map_or(floor, |n| n.max(floor));
    if declared != Some(next) {
        tracing::warn!(
            ?declared,
            next,
            "snapshot sequence counter raised past imported ids"
        );
    }

    let mut batch = WriteBatch::new();
    for entry in &records {
        batch
            .expect_absent(entry.key.as_str())
            .put(entry.key.as_str(), entry.value.clone().into_bytes());
    }
    batch
        .expect_value(TRANSACTION_SEQUENCE_KEY, store.get(TRANSACTION_SEQUENCE_KEY)?)
        .put(TRANSACTION_SEQUENCE_KEY, sequence::encode(next));
    store.commit(batch)?;

    tracing::info!(
        entries = snapshot.entries.len(),
        next,
        "imported ledger snapshot"
    );
    Ok(snapshot.entries.len())
}

// =============================================================================
// CRYPTOGRAPHIC HASH SUPPORT
// =============================================================================

/// BLAKE3 hex digest of the compact canonical snapshot.
///
/// # Requires
///
/// This function is only available with the `crypto-hash` feature enabled.
#[cfg(feature = "crypto-hash")]
pub fn state_crypto_hash<S: LedgerStore>(store: &S) -> Result<String, RecError> {
    let snapshot = LedgerSnapshot::capture(store)?;
    let data = serde_json::to_vec(&snapshot).map_err(|e| RecError::Serialization(e.to_string()))?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================
