//! # Ledger
//!
//! The invocation surface of the state machine.
//!
//! A `Ledger` couples a store with the ledger policy and a clock, and
//! exposes one method per ledger operation. Each call is one invocation:
//! strictly sequential, with every store access going through the
//! `LedgerStore` trait.
//!
//! ## Storage Backends
//!
//! `Ledger<StorageBackend>` (the default) selects a backend at runtime:
//! - `in_memory()`: `MemoryStore` (fast, volatile)
//! - `with_redb(path)`: `RedbStore` (ACID, persistent)
//!
//! Any other `LedgerStore` can be plugged in through `Ledger::open`.

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::export;
use crate::lifecycle::TransactionManager;
use crate::query::{
    CertificateFilter, KeyedRecord, QueryEngine, QueryOutput, QueryType, TransactionFilter,
};
use crate::registry::CertificateRegistry;
use crate::sequence::SequenceAllocator;
use crate::store::{LedgerStore, MemoryStore, StorageBackend};
use crate::types::{Certificate, CertificateRequest, RecError, SaleRequest, Transaction};
use std::fmt;
use std::path::Path;

/// A ledger instance: store, policy, and clock.
pub struct Ledger<S: LedgerStore = StorageBackend> {
    store: S,
    config: LedgerConfig,
    clock: Box<dyn Clock>,
}

impl<S: LedgerStore + fmt::Debug> fmt::Debug for Ledger<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Ledger<StorageBackend> {
    /// Open a fresh in-memory ledger with default policy.
    pub fn in_memory() -> Result<Self, RecError> {
        Self::open(
            StorageBackend::InMemory(MemoryStore::new()),
            LedgerConfig::default(),
        )
    }

    /// Open or create a redb-backed ledger at `path`.
    pub fn with_redb(path: impl AsRef<Path>, config: LedgerConfig) -> Result<Self, RecError> {
        Self::open(StorageBackend::redb(path)?, config)
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }
}

impl<S: LedgerStore> Ledger<S> {
    /// `initLedger`: wrap `store` and make sure the sequence counter exists.
    pub fn open(mut store: S, config: LedgerConfig) -> Result<Self, RecError> {
        let next = SequenceAllocator::initialize(&mut store)?;
        tracing::info!(next_transaction = next, ?config, "ledger initialized");
        Ok(Self {
            store,
            config,
            clock: Box::new(SystemClock),
        })
    }

    /// Replace the clock used for ids and dates.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The active policy.
    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Read access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    // =========================================================================
    // CERTIFICATES
    // =========================================================================

    /// `registerCertificate`.
    pub fn register_certificate(
        &mut self,
        request: &CertificateRequest,
    ) -> Result<Certificate, RecError> {
        CertificateRegistry::register(&mut self.store, self.clock.now(), request)
    }

    /// `queryCertificateById`.
    pub fn query_certificate_by_id(&self, id: &str) -> Result<Certificate, RecError> {
        QueryEngine::certificate(&self.store, id)
    }

    /// `queryAllCertificates`.
    pub fn query_all_certificates(&self) -> Result<Vec<Certificate>, RecError> {
        QueryEngine::certificates(&self.store, &CertificateFilter::All)
    }

    /// `queryCertificatesBySupplier`.
    pub fn query_certificates_by_supplier(
        &self,
        supplier: &str,
    ) -> Result<Vec<Certificate>, RecError> {
        CertificateRegistry::by_supplier(&self.store, supplier)
    }

    /// `sumCertificateQuantityBySupplier`.
    pub fn sum_certificate_quantity_by_supplier(&self, supplier: &str) -> Result<u64, RecError> {
        CertificateRegistry::quantity_by_supplier(&self.store, supplier)
    }

    // =========================================================================
    // TRANSACTIONS
    // =========================================================================

    /// `createTransaction`.
    pub fn create_transaction(&mut self, request: &SaleRequest) -> Result<Transaction, RecError> {
        TransactionManager::create(&mut self.store, &self.config, self.clock.now(), request)
    }

    /// `executeTransaction`.
    pub fn execute_transaction(&mut self, id: &str, buyer: &str) -> Result<Transaction, RecError> {
        TransactionManager::execute(&mut self.store, self.clock.now(), id, buyer)
    }

    /// `approveTransaction`.
    pub fn approve_transaction(&mut self, id: &str) -> Result<Transaction, RecError> {
        TransactionManager::approve(&mut self.store, &self.config, id)
    }

    /// `queryTransactionById`.
    pub fn query_transaction_by_id(&self, id: &str) -> Result<Transaction, RecError> {
        TransactionManager::get(&self.store, id)
    }

    /// `queryAllTransactions`.
    pub fn query_all_transactions(&self) -> Result<Vec<Transaction>, RecError> {
        QueryEngine::transactions(&self.store, &TransactionFilter::All)
    }

    /// `queryUnexecutedTransactions`: `executedDate` is null.
    pub fn query_unexecuted_transactions(&self) -> Result<Vec<Transaction>, RecError> {
        QueryEngine::transactions(&self.store, &TransactionFilter::Unexecuted)
    }

    /// `queryExecutedTransactions`: `executedDate` is set.
    pub fn query_executed_transactions(&self) -> Result<Vec<Transaction>, RecError> {
        QueryEngine::transactions(&self.store, &TransactionFilter::Executed)
    }

    /// `queryTransactionsBySupplier`.
    pub fn query_transactions_by_supplier(
        &self,
        supplier: &str,
    ) -> Result<Vec<Transaction>, RecError> {
        QueryEngine::transactions(
            &self.store,
            &TransactionFilter::BySupplier(supplier.to_string()),
        )
    }

    /// `queryTransactionsByBuyer`.
    pub fn query_transactions_by_buyer(&self, buyer: &str) -> Result<Vec<Transaction>, RecError> {
        QueryEngine::transactions(
            &self.store,
            &TransactionFilter::ByBuyer(buyer.to_string()),
        )
    }

    /// `sumCertificateQuantityByBuyer`: confirmed purchases only.
    pub fn sum_certificate_quantity_by_buyer(&self, buyer: &str) -> Result<u64, RecError> {
        QueryEngine::transaction_quantity(
            &self.store,
            &TransactionFilter::ConfirmedByBuyer(buyer.to_string()),
        )
    }

    // =========================================================================
    // RAW STATE
    // =========================================================================

    /// `queryAllRecords`.
    pub fn query_all_records(&self) -> Result<Vec<KeyedRecord>, RecError> {
        QueryEngine::all_records(&self.store)
    }

    /// Run an arbitrary query.
    pub fn query(&self, query: &QueryType) -> Result<QueryOutput, RecError> {
        QueryEngine::execute(&self.store, query)
    }

    /// Snapshot JSON of the whole ledger.
    pub fn export_snapshot(&self) -> Result<Vec<u8>, RecError> {
        export::export_snapshot(&self.store)
    }

    /// Restore a snapshot into this ledger, which must hold no records.
    ///
    /// The sequence counter travels with the snapshot and replaces the one
    /// seeded when this ledger was opened. It never lands at or below an
    /// imported transaction id.
    pub fn import_snapshot(&mut self, data: &[u8]) -> Result<usize, RecError> {
        export::import_snapshot(&mut self.store, data)
    }

    /// Deterministic checksum of the ledger state.
    pub fn checksum(&self) -> Result<u64, RecError> {
        export::state_checksum(&self.store)
    }

    /// BLAKE3 digest of the ledger state.
    #[cfg(feature = "crypto-hash")]
    pub fn crypto_hash(&self) -> Result<String, RecError> {
        export::state_crypto_hash(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::TransactionState;

    fn ledger() -> Ledger {
        Ledger::in_memory()
            .expect("open")
            .with_clock(ManualClock::new(1_700_000_000))
    }

    fn certificate(supplier: &str, quantity: u64) -> CertificateRequest {
        CertificateRequest {
            supplier: supplier.to_string(),
            quantity,
            is_jeju: false,
            supply_date: 20240101,
            expire_date: 20270101,
        }
    }

    #[test]
    fn open_seeds_sequence() {
        let ledger = ledger();
        assert!(!ledger.is_persistent());
        assert_eq!(SequenceAllocator::peek(ledger.store()).expect("peek"), 1);
    }

    #[test]
    fn trade_round_trip() {
        let mut ledger = ledger();
        let cert = ledger
            .register_certificate(&certificate("S1", 100))
            .expect("register");

        let tx = ledger
            .create_transaction(&SaleRequest {
                target: cert.id.clone(),
                price: 10,
                quantity: 40,
                supplier: "S1".to_string(),
            })
            .expect("sell");
        assert_eq!(
            ledger
                .sum_certificate_quantity_by_supplier("S1")
                .expect("sum"),
            60
        );

        ledger.execute_transaction(&tx.id, "B1").expect("buy");
        assert_eq!(ledger.sum_certificate_quantity_by_buyer("B1").expect("sum"), 0);

        ledger.approve_transaction(&tx.id).expect("approve");
        assert_eq!(ledger.sum_certificate_quantity_by_buyer("B1").expect("sum"), 40);
        assert_eq!(
            ledger.query_transaction_by_id(&tx.id).expect("get").state(),
            TransactionState::Confirmed
        );
    }

    #[test]
    fn query_dispatch_matches_direct_calls() {
        let mut ledger = ledger();
        ledger
            .register_certificate(&certificate("S1", 5))
            .expect("register");

        let output = ledger
            .query(&QueryType::supplier_quantity("S1"))
            .expect("query");
        assert_eq!(output, QueryOutput::Sum(5));
    }

    #[test]
    fn snapshot_moves_between_ledgers() {
        let mut source = ledger();
        source
            .register_certificate(&certificate("S1", 5))
            .expect("register");
        let data = source.export_snapshot().expect("export");

        let mut target = ledger();
        assert_eq!(target.import_snapshot(&data).expect("import"), 2);
        assert_eq!(
            target.checksum().expect("checksum"),
            source.checksum().expect("checksum")
        );
    }

    #[test]
    fn sales_continue_after_importing_counterless_snapshot() {
        let mut source = ledger();
        let cert = source
            .register_certificate(&certificate("S1", 10))
            .expect("register");
        source
            .create_transaction(&SaleRequest {
                target: cert.id.clone(),
                price: 1,
                quantity: 2,
                supplier: "S1".to_string(),
            })
            .expect("sell");

        let mut legacy = MemoryStore::new();
        for entry in source.query_all_records().expect("dump") {
            if entry.key != crate::primitives::TRANSACTION_SEQUENCE_KEY {
                let bytes = serde_json::to_vec(&entry.record).expect("encode");
                legacy.put(&entry.key, &bytes).expect("put");
            }
        }
        let data = export::export_snapshot(&legacy).expect("export");

        let mut target = ledger();
        target.import_snapshot(&data).expect("import");
        for expected in ["TRANSACTION_2", "TRANSACTION_3"] {
            let tx = target
                .create_transaction(&SaleRequest {
                    target: cert.id.clone(),
                    price: 1,
                    quantity: 1,
                    supplier: "S1".to_string(),
                })
                .expect("sell after import");
            assert_eq!(tx.id, expected);
        }
        assert_eq!(
            target
                .query_certificate_by_id(&cert.id)
                .expect("cert")
                .quantity,
            6
        );
    }
}
