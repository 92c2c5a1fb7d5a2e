//! In-memory ledger store.

use super::{LedgerStore, RangeScan, WriteBatch, is_inverted};
use crate::types::RecError;
use std::collections::BTreeMap;
use std::ops::Bound;

/// In-memory, `BTreeMap`-based ledger store.
///
/// Intended for tests and ephemeral ledgers. `BTreeMap` gives the same
/// ascending key order as the persistent backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LedgerStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RecError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), RecError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn scan_range(&self, start: &str, end: &str) -> Result<RangeScan, RecError> {
        if is_inverted(start, end) {
            return Ok(RangeScan::new(Vec::new()));
        }
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end)
        };
        let entries = self
            .entries
            .range::<str, _>((Bound::Included(start), upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(RangeScan::new(entries))
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), RecError> {
        for (key, condition) in batch.checks() {
            let current = self.entries.get(key).map(Vec::as_slice);
            if !condition.holds(current) {
                return Err(RecError::Conflict(key.clone()));
            }
        }
        for (key, value) in batch.puts() {
            self.entries.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}
