//! # redb-backed Ledger Store
//!
//! A disk-backed ledger store using the redb embedded database, providing:
//! - ACID transactions (each `commit` batch is one write transaction)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (a range scan reads one consistent snapshot)

use super::{LedgerStore, RangeScan, WriteBatch, is_inverted};
use crate::types::RecError;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for all records: key string -> JSON bytes
const LEDGER: TableDefinition<&str, &[u8]> = TableDefinition::new("ledger");

fn storage_err(e: impl std::fmt::Display) -> RecError {
    RecError::Storage(e.to_string())
}

/// A disk-backed ledger store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Initialize the table if it doesn't exist
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(LEDGER).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        tracing::debug!(path = %path.as_ref().display(), "opened redb ledger store");
        Ok(Self { db })
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), RecError> {
        self.db.compact().map_err(storage_err)?;
        Ok(())
    }
}

impl LedgerStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RecError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(LEDGER).map_err(storage_err)?;
        let value = table
            .get(key)
            .map_err(storage_err)?
            .map(|v| v.value().to_vec());
        Ok(value)
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), RecError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(LEDGER).map_err(storage_err)?;
            table.insert(key, value).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)
    }

    fn scan_range(&self, start: &str, end: &str) -> Result<RangeScan, RecError> {
        if is_inverted(start, end) {
            return Ok(RangeScan::new(Vec::new()));
        }
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(LEDGER).map_err(storage_err)?;

        let range = if end.is_empty() {
            table.range::<&str>(start..)
        } else {
            table.range::<&str>(start..end)
        }
        .map_err(storage_err)?;

        let mut entries = Vec::new();
        for entry in range {
            let (key, value) = entry.map_err(storage_err)?;
            entries.push((key.value().to_string(), value.value().to_vec()));
        }
        Ok(RangeScan::new(entries))
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), RecError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;

        let conflict = {
            let mut table = write_txn.open_table(LEDGER).map_err(storage_err)?;

            let mut conflict = None;
            for (key, condition) in batch.checks() {
                let current = table
                    .get(key.as_str())
                    .map_err(storage_err)?
                    .map(|v| v.value().to_vec());
                if !condition.holds(current.as_deref()) {
                    conflict = Some(key.clone());
                    break;
                }
            }

            if conflict.is_none() {
                for (key, value) in batch.puts() {
                    table
                        .insert(key.as_str(), value.as_slice())
                        .map_err(storage_err)?;
                }
            }
            conflict
        };

        if let Some(key) = conflict {
            write_txn.abort().map_err(storage_err)?;
            return Err(RecError::Conflict(key));
        }
        write_txn.commit().map_err(storage_err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn basic_operations() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        assert_eq!(store.get("CERTIFICATE_1").expect("get"), None);
        store.put("CERTIFICATE_1", b"{}").expect("put");
        assert_eq!(
            store.get("CERTIFICATE_1").expect("get"),
            Some(b"{}".to_vec())
        );
    }

    #[test]
    fn scan_respects_bounds_and_order() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        for key in ["TRANSACTION_2", "CERTIFICATE_5", "TRANSACTION_10", "~seq"] {
            store.put(key, b"v").expect("put");
        }

        let all: Vec<String> = store.scan_range("", "").expect("scan").map(|(k, _)| k).collect();
        assert_eq!(
            all,
            vec!["CERTIFICATE_5", "TRANSACTION_10", "TRANSACTION_2", "~seq"]
        );

        let txs: Vec<String> = store
            .scan_range("TRANSACTION_", "TRANSACTION`")
            .expect("scan")
            .map(|(k, _)| k)
            .collect();
        assert_eq!(txs, vec!["TRANSACTION_10", "TRANSACTION_2"]);

        assert_eq!(store.scan_range("z", "a").expect("scan").count(), 0);
    }

    #[test]
    fn commit_conflict_writes_nothing() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        store.put("counter", b"1").expect("put");

        let mut batch = WriteBatch::new();
        batch
            .expect_value("counter", Some(b"0".to_vec()))
            .put("counter", b"2".to_vec())
            .put("TRANSACTION_1", b"{}".to_vec());
        let err = store.commit(batch).expect_err("conflict");
        assert!(matches!(err, RecError::Conflict(ref k) if k == "counter"));
        assert_eq!(store.get("counter").expect("get"), Some(b"1".to_vec()));
        assert_eq!(store.get("TRANSACTION_1").expect("get"), None);
    }

    #[test]
    fn commit_applies_atomically() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let mut batch = WriteBatch::new();
        batch
            .expect_absent("counter")
            .put("counter", b"1".to_vec())
            .put("TRANSACTION_1", b"{}".to_vec());
        store.commit(batch).expect("commit");
        assert_eq!(store.get("counter").expect("get"), Some(b"1".to_vec()));
        assert!(store.get("TRANSACTION_1").expect("get").is_some());
    }

    #[test]
    fn recovery_persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            store.put("CERTIFICATE_1", b"a").expect("put");
            store.put("CERTIFICATE_2", b"b").expect("put");
        }

        {
            let mut store = RedbStore::open(&db_path).expect("reopen db");
            assert_eq!(store.scan_range("", "").expect("scan").count(), 2);
            store.compact().expect("compact");
            assert_eq!(store.get("CERTIFICATE_2").expect("get"), Some(b"b".to_vec()));
        }
    }
}
