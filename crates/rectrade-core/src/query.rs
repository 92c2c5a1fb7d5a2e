//! # Query Engine
//!
//! Range-scan, filter, and project over ledger records.
//!
//! There is no secondary index: every query scans the key range of the
//! record kind it asks for, in store order, and keeps what matches.
//!
//! ## Malformed records
//!
//! A value that does not decode as a record of the scanned kind is logged
//! at `warn` with its key and skipped; the scan continues and the query
//! still succeeds. Point reads (`certificate`, `transaction`) do not
//! recover: there a malformed record is an error.

use crate::keys;
use crate::record::Record;
use crate::store::LedgerStore;
use crate::types::{Certificate, RecError, RecordKind, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// FILTERS
// =============================================================================

/// Certificate selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateFilter {
    /// Every certificate.
    All,
    /// Certificates issued by exactly this supplier.
    BySupplier(String),
}

impl CertificateFilter {
    /// Check whether `certificate` is selected.
    #[must_use]
    pub fn matches(&self, certificate: &Certificate) -> bool {
        match self {
            Self::All => true,
            Self::BySupplier(supplier) => certificate.supplier == *supplier,
        }
    }
}

/// Transaction selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionFilter {
    /// Every transaction.
    All,
    /// `executedDate == null`.
    Unexecuted,
    /// `executedDate != null`.
    Executed,
    /// Sold by exactly this supplier.
    BySupplier(String),
    /// Bought by exactly this buyer.
    ByBuyer(String),
    /// Bought by this buyer and confirmed.
    ConfirmedByBuyer(String),
}

impl TransactionFilter {
    /// Check whether `tx` is selected.
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        match self {
            Self::All => true,
            Self::Unexecuted => !tx.is_executed(),
            Self::Executed => tx.is_executed(),
            Self::BySupplier(supplier) => tx.supplier == *supplier,
            Self::ByBuyer(buyer) => tx.buyer.as_deref() == Some(buyer.as_str()),
            Self::ConfirmedByBuyer(buyer) => {
                tx.is_confirmed && tx.buyer.as_deref() == Some(buyer.as_str())
            }
        }
    }
}

// =============================================================================
// QUERY TYPES
// =============================================================================

/// Query operation types supported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryType {
    /// Point read of one certificate.
    Certificate(String),
    /// Point read of one transaction.
    Transaction(String),
    /// Certificates matching a filter.
    Certificates(CertificateFilter),
    /// Transactions matching a filter.
    Transactions(TransactionFilter),
    /// Sum of remaining quantity over matching certificates.
    CertificateQuantitySum(CertificateFilter),
    /// Sum of quantity over matching transactions.
    TransactionQuantitySum(TransactionFilter),
    /// Every key in the namespace with its raw record.
    AllRecords,
}

impl QueryType {
    /// `queryCertificatesBySupplier`.
    #[must_use]
    pub fn certificates_by_supplier(supplier: impl Into<String>) -> Self {
        Self::Certificates(CertificateFilter::BySupplier(supplier.into()))
    }

    /// `sumCertificateQuantityBySupplier`.
    #[must_use]
    pub fn supplier_quantity(supplier: impl Into<String>) -> Self {
        Self::CertificateQuantitySum(CertificateFilter::BySupplier(supplier.into()))
    }

    /// `sumCertificateQuantityByBuyer`: confirmed purchases only.
    #[must_use]
    pub fn buyer_quantity(buyer: impl Into<String>) -> Self {
        Self::TransactionQuantitySum(TransactionFilter::ConfirmedByBuyer(buyer.into()))
    }
}

/// One entry of the raw namespace dump.
///
/// `Record` holds the parsed JSON, or the raw text when the value is not JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedRecord {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: Value,
}

/// Result of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Single(Record),
    Certificates(Vec<Certificate>),
    Transactions(Vec<Transaction>),
    Sum(u64),
    Records(Vec<KeyedRecord>),
}

// =============================================================================
// QUERY ENGINE
// =============================================================================

/// The QueryEngine runs read-only queries against a store.
pub struct QueryEngine;

impl QueryEngine {
    /// Run a query.
    pub fn execute<S: LedgerStore>(store: &S, query: &QueryType) -> Result<QueryOutput, RecError> {
        let output = match query {
            QueryType::Certificate(id) => QueryOutput::Single(Self::certificate(store, id)?.into()),
            QueryType::Transaction(id) => QueryOutput::Single(Self::transaction(store, id)?.into()),
            QueryType::Certificates(filter) => {
                QueryOutput::Certificates(Self::certificates(store, filter)?)
            }
            QueryType::Transactions(filter) => {
                QueryOutput::Transactions(Self::transactions(store, filter)?)
            }
            QueryType::CertificateQuantitySum(filter) => {
                QueryOutput::Sum(Self::certificate_quantity(store, filter)?)
            }
            QueryType::TransactionQuantitySum(filter) => {
                QueryOutput::Sum(Self::transaction_quantity(store, filter)?)
            }
            QueryType::AllRecords => QueryOutput::Records(Self::all_records(store)?),
        };
        Ok(output)
    }

    /// Point read of a certificate. `NotFound` on an absent or empty value.
    pub fn certificate<S: LedgerStore>(store: &S, id: &str) -> Result<Certificate, RecError> {
        let bytes = read_present(store, id)?;
        Record::decode_certificate(id, &bytes)
    }

    /// Point read of a transaction. `NotFound` on an absent or empty value.
    pub fn transaction<S: LedgerStore>(store: &S, id: &str) -> Result<Transaction, RecError> {
        let bytes = read_present(store, id)?;
        Record::decode_transaction(id, &bytes)
    }

    /// Certificates matching `filter`, in scan order.
    pub fn certificates<S: LedgerStore>(
        store: &S,
        filter: &CertificateFilter,
    ) -> Result<Vec<Certificate>, RecError> {
        Self::scan(store, RecordKind::Certificate, |record| match record {
            Record::Certificate(c) if filter.matches(&c) => Some(c),
            _ => None,
        })
    }

    /// Transactions matching `filter`, in scan order.
    pub fn transactions<S: LedgerStore>(
        store: &S,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, RecError> {
        Self::scan(store, RecordKind::Transaction, |record| match record {
            Record::Transaction(t) if filter.matches(&t) => Some(t),
            _ => None,
        })
    }

    /// Sum of remaining quantity over matching certificates; 0 if none.
    pub fn certificate_quantity<S: LedgerStore>(
        store: &S,
        filter: &CertificateFilter,
    ) -> Result<u64, RecError> {
        let quantities = Self::scan(store, RecordKind::Certificate, |record| match record {
            Record::Certificate(c) if filter.matches(&c) => Some(c.quantity),
            _ => None,
        })?;
        Ok(saturating_sum(quantities))
    }

    /// Sum of quantity over matching transactions; 0 if none.
    pub fn transaction_quantity<S: LedgerStore>(
        store: &S,
        filter: &TransactionFilter,
    ) -> Result<u64, RecError> {
        let quantities = Self::scan(store, RecordKind::Transaction, |record| match record {
            Record::Transaction(t) if filter.matches(&t) => Some(t.quantity),
            _ => None,
        })?;
        Ok(saturating_sum(quantities))
    }

    /// Every key in the namespace, in scan order, with its value.
    ///
    /// Values that are not JSON are kept as strings rather than skipped.
    pub fn all_records<S: LedgerStore>(store: &S) -> Result<Vec<KeyedRecord>, RecError> {
        let records = store
            .scan_range("", "")?
            .map(|(key, bytes)| {
                let record = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                    tracing::debug!(key = %key, error = %e, "value is not JSON, keeping raw text");
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                });
                KeyedRecord { key, record }
            })
            .collect();
        Ok(records)
    }

    /// Scan the key range of `kind`, decode, and project.
    ///
    /// Undecodable values are logged and skipped.
    fn scan<S, T, F>(store: &S, kind: RecordKind, mut project: F) -> Result<Vec<T>, RecError>
    where
        S: LedgerStore,
        F: FnMut(Record) -> Option<T>,
    {
        let (start, end) = keys::kind_range(kind);
        let mut out = Vec::new();
        for (key, bytes) in store.scan_range(&start, &end)? {
            match Record::decode(&key, &bytes) {
                Ok(record) if record.kind() == kind => {
                    if let Some(item) = project(record) {
                        out.push(item);
                    }
                }
                Ok(record) => {
                    tracing::warn!(
                        key = %key,
                        found = %record.kind(),
                        expected = %kind,
                        "skipping record of unexpected kind"
                    );
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "skipping malformed record");
                }
            }
        }
        Ok(out)
    }
}

/// Point read that treats an empty value as absent.
pub(crate) fn read_present<S: LedgerStore>(store: &S, id: &str) -> Result<Vec<u8>, RecError> {
    match store.get(id)? {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(RecError::NotFound(id.to_string())),
    }
}

fn saturating_sum(values: Vec<u64>) -> u64 {
    values.into_iter().fold(0, u64::saturating_add)
}

// =============================================================================
// TESTS
// =============================================================================
