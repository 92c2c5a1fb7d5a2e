//! # Ledger Store
//!
//! The key-value service the state machine runs against.
//!
//! The core consumes the store through the `LedgerStore` trait only:
//! point reads, unconditional point writes, range scans, and atomic
//! conditional batches. Two backends are provided:
//! - `MemoryStore`: in-memory `BTreeMap` (fast, volatile)
//! - `RedbStore`: disk-backed redb database (ACID, persistent)
//!
//! `StorageBackend` selects one of them at runtime.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::types::RecError;
use std::path::Path;

// =============================================================================
// LEDGERSTORE TRAIT
// =============================================================================

/// The LedgerStore trait defines the storage operations used by the core.
///
/// Keys are strings; values are opaque bytes. Scan order is ascending
/// byte-wise key order for every implementation, so all replicas observe
/// identical query results.
pub trait LedgerStore {
    /// Point read. `None` means the key is absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RecError>;

    /// Point write, unconditionally overwriting any existing value.
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), RecError>;

    /// Scan keys in `[start, end)`.
    ///
    /// An empty `end` means unbounded; `("", "")` scans the whole namespace.
    /// An inverted range yields nothing.
    fn scan_range(&self, start: &str, end: &str) -> Result<RangeScan, RecError>;

    /// Apply a batch atomically.
    ///
    /// Every precondition is checked first; if any fails, nothing is
    /// written and `RecError::Conflict` names the offending key.
    fn commit(&mut self, batch: WriteBatch) -> Result<(), RecError>;
}

// =============================================================================
// RANGE SCAN
// =============================================================================

/// A finite, single-pass sequence of `(key, value)` pairs in key order.
///
/// Once consumed it cannot be restarted; scan again for a fresh view.
#[derive(Debug)]
pub struct RangeScan {
    entries: std::vec::IntoIter<(String, Vec<u8>)>,
}

impl RangeScan {
    pub(crate) fn new(entries: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl Iterator for RangeScan {
    type Item = (String, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

/// True if `[start, end)` is empty by construction.
pub(crate) fn is_inverted(start: &str, end: &str) -> bool {
    !end.is_empty() && start >= end
}

// =============================================================================
// WRITE BATCH
// =============================================================================

/// A condition a key must satisfy for a batch to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The key must not exist.
    Absent,
    /// The key must hold exactly these bytes.
    Equals(Vec<u8>),
}

impl Precondition {
    /// Check the current value of a key against this condition.
    #[must_use]
    pub fn holds(&self, current: Option<&[u8]>) -> bool {
        match (self, current) {
            (Self::Absent, None) => true,
            (Self::Equals(expected), Some(actual)) => expected.as_slice() == actual,
            _ => false,
        }
    }
}

/// Preconditions and writes applied together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    checks: Vec<(String, Precondition)>,
    puts: Vec<(String, Vec<u8>)>,
}

impl WriteBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to be absent.
    pub fn expect_absent(&mut self, key: impl Into<String>) -> &mut Self {
        self.checks.push((key.into(), Precondition::Absent));
        self
    }

    /// Require `key` to hold `value`, or to be absent when `value` is `None`.
    pub fn expect_value(&mut self, key: impl Into<String>, value: Option<Vec<u8>>) -> &mut Self {
        let condition = value.map_or(Precondition::Absent, Precondition::Equals);
        self.checks.push((key.into(), condition));
        self
    }

    /// Write `value` under `key`.
    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) -> &mut Self {
        self.puts.push((key.into(), value));
        self
    }

    /// Preconditions, in insertion order.
    #[must_use]
    pub fn checks(&self) -> &[(String, Precondition)] {
        &self.checks
    }

    /// Writes, in insertion order. Later writes to a key win.
    #[must_use]
    pub fn puts(&self) -> &[(String, Vec<u8>)] {
        &self.puts
    }

    /// True if the batch has no writes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend selected at runtime.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory map (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed redb database (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open or create a redb-backed store at `path`.
    pub fn redb(path: impl AsRef<Path>) -> Result<Self, RecError> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

impl LedgerStore for StorageBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RecError> {
        match self {
            Self::InMemory(s) => s.get(key),
            Self::Persistent(s) => s.get(key),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), RecError> {
        match self {
            Self::InMemory(s) => s.put(key, value),
            Self::Persistent(s) => s.put(key, value),
        }
    }

    fn scan_range(&self, start: &str, end: &str) -> Result<RangeScan, RecError> {
        match self {
            Self::InMemory(s) => s.scan_range(start, end),
            Self::Persistent(s) => s.scan_range(start, end),
        }
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), RecError> {
        match self {
            Self::InMemory(s) => s.commit(batch),
            Self::Persistent(s) => s.commit(batch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_holds() {
        assert!(Precondition::Absent.holds(None));
        assert!(!Precondition::Absent.holds(Some(b"x")));
        assert!(Precondition::Equals(b"x".to_vec()).holds(Some(b"x")));
        assert!(!Precondition::Equals(b"x".to_vec()).holds(Some(b"y")));
        assert!(!Precondition::Equals(b"x".to_vec()).holds(None));
    }

    #[test]
    fn expect_value_none_means_absent() {
        let mut batch = WriteBatch::new();
        batch.expect_value("k", None).put("k", b"v".to_vec());
        assert_eq!(batch.checks()[0].1, Precondition::Absent);
        assert!(!batch.is_empty());
    }

    #[test]
    fn inverted_ranges() {
        assert!(is_inverted("b", "a"));
        assert!(is_inverted("a", "a"));
        assert!(!is_inverted("a", "b"));
        assert!(!is_inverted("z", ""));
    }

    #[test]
    fn default_backend_is_in_memory() {
        let backend = StorageBackend::default();
        assert!(!backend.is_persistent());
    }
}
