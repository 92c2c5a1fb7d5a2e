//! # Sequence Allocator
//!
//! Hands out `TRANSACTION_<n>` ids.
//!
//! The next sequence number is persisted under `TRANSACTION_SEQUENCE_KEY`
//! and advanced by compare-and-swap inside the same batch that writes the
//! new transaction. Two writers that read the same counter cannot both
//! commit, so an id is never issued twice.
//!
//! A ledger without the counter key (fresh, or written by an older
//! revision) is seeded once from the highest existing transaction id and
//! the seed is persisted; later opens read the counter and never rescan.

use crate::keys;
use crate::primitives::{FIRST_TRANSACTION_SEQUENCE, TRANSACTION_SEQUENCE_KEY};
use crate::store::{LedgerStore, WriteBatch};
use crate::types::{RecError, RecordKind};

/// A sequence number read from the store, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    sequence: u64,
    observed: Option<Vec<u8>>,
}

impl Reservation {
    /// The reserved sequence number.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The reserved transaction id.
    #[must_use]
    pub fn id(&self) -> String {
        keys::transaction_id(self.sequence)
    }

    /// Add the counter check-and-advance to `batch`.
    pub fn stage(&self, batch: &mut WriteBatch) -> Result<(), RecError> {
        let next = self
            .sequence
            .checked_add(1)
            .ok_or_else(|| RecError::InvalidInput("transaction sequence exhausted".to_string()))?;
        batch
            .expect_value(TRANSACTION_SEQUENCE_KEY, self.observed.clone())
            .put(TRANSACTION_SEQUENCE_KEY, encode(next));
        Ok(())
    }
}

/// The SequenceAllocator reads and seeds the persisted transaction counter.
pub struct SequenceAllocator;

impl SequenceAllocator {
    /// Make sure the counter key exists, seeding it if needed.
    ///
    /// Returns the next sequence number that will be issued.
    pub fn initialize<S: LedgerStore>(store: &mut S) -> Result<u64, RecError> {
        if let Some(bytes) = store.get(TRANSACTION_SEQUENCE_KEY)? {
            return decode(&bytes);
        }

        let seed = Self::seed_from_scan(store)?;
        let mut batch = WriteBatch::new();
        batch
            .expect_absent(TRANSACTION_SEQUENCE_KEY)
            .put(TRANSACTION_SEQUENCE_KEY, encode(seed));

        match store.commit(batch) {
            Ok(()) => {
                tracing::info!(next = seed, "seeded transaction sequence");
                Ok(seed)
            }
            // Another writer seeded first; theirs stands.
            Err(RecError::Conflict(_)) => Self::peek(store),
            Err(e) => Err(e),
        }
    }

    /// Next sequence number, without reserving it.
    pub fn peek<S: LedgerStore>(store: &S) -> Result<u64, RecError> {
        Self::reserve(store).map(|r| r.sequence)
    }

    /// Read the counter for use in a write batch.
    pub fn reserve<S: LedgerStore>(store: &S) -> Result<Reservation, RecError> {
        match store.get(TRANSACTION_SEQUENCE_KEY)? {
            Some(bytes) => Ok(Reservation {
                sequence: decode(&bytes)?,
                observed: Some(bytes),
            }),
            None => Ok(Reservation {
                sequence: Self::seed_from_scan(store)?,
                observed: None,
            }),
        }
    }

    /// One past the highest `TRANSACTION_<n>` key present.
    fn seed_from_scan<S: LedgerStore>(store: &S) -> Result<u64, RecError> {
        let (start, end) = keys::kind_range(RecordKind::Transaction);
        let scan = store.scan_range(&start, &end)?;
        Ok(Self::seed_after(scan.map(|(key, _)| key)))
    }

    /// One past the highest transaction sequence among `ids`.
    pub(crate) fn seed_after<I, K>(ids: I) -> u64
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        ids.into_iter()
            .filter_map(|id| keys::transaction_sequence(id.as_ref()))
            .max()
            .map_or(FIRST_TRANSACTION_SEQUENCE, |n| {
                n.saturating_add(1).max(FIRST_TRANSACTION_SEQUENCE)
            })
    }
}

pub(crate) fn encode(sequence: u64) -> Vec<u8> {
    sequence.to_string().into_bytes()
}

pub(crate) fn decode(bytes: &[u8]) -> Result<u64, RecError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| RecError::MalformedRecord {
            key: TRANSACTION_SEQUENCE_KEY.to_string(),
            reason: "counter is not a decimal integer".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn fresh_store_starts_at_first_sequence() {
        let mut store = MemoryStore::new();
        assert_eq!(
            SequenceAllocator::initialize(&mut store).expect("init"),
            FIRST_TRANSACTION_SEQUENCE
        );
        assert_eq!(
            store.get(TRANSACTION_SEQUENCE_KEY).expect("get"),
            Some(b"1".to_vec())
        );
    }

    #[test]
    fn legacy_store_seeds_past_highest_id() {
        let mut store = MemoryStore::new();
        store.put("TRANSACTION_2", b"{}").expect("put");
        store.put("TRANSACTION_17", b"garbage").expect("put");
        store.put("TRANSACTION_x", b"{}").expect("put");
        store.put("CERTIFICATE_99", b"{}").expect("put");

        assert_eq!(SequenceAllocator::initialize(&mut store).expect("init"), 18);
    }

    #[test]
    fn initialize_does_not_rescan_once_persisted() {
        let mut store = MemoryStore::new();
        SequenceAllocator::initialize(&mut store).expect("init");
        store.put("TRANSACTION_50", b"{}").expect("put");
        assert_eq!(SequenceAllocator::initialize(&mut store).expect("init"), 1);
    }

    #[test]
    fn stale_reservation_conflicts() {
        let mut store = MemoryStore::new();
        SequenceAllocator::initialize(&mut store).expect("init");

        let first = SequenceAllocator::reserve(&store).expect("reserve");
        let second = SequenceAllocator::reserve(&store).expect("reserve");
        assert_eq!(first.id(), second.id());

        let mut batch = WriteBatch::new();
        first.stage(&mut batch).expect("stage");
        store.commit(batch).expect("commit");
        assert_eq!(SequenceAllocator::peek(&store).expect("peek"), 2);

        let mut batch = WriteBatch::new();
        second.stage(&mut batch).expect("stage");
        assert!(matches!(store.commit(batch), Err(RecError::Conflict(_))));
    }

    #[test]
    fn corrupt_counter_is_malformed() {
        let mut store = MemoryStore::new();
        store.put(TRANSACTION_SEQUENCE_KEY, b"seven").expect("put");
        assert!(matches!(
            SequenceAllocator::peek(&store),
            Err(RecError::MalformedRecord { .. })
        ));
    }
}
