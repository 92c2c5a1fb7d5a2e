//! # Transaction Lifecycle Manager
//!
//! Listing, execution, and confirmation of transactions.
//!
//! ```text
//!   create ──► Listed ──execute──► Executed
//!                 │                   │
//!                 └──────approve──────┴──► Confirmed
//! ```
//!
//! Execution overwrites: executing twice re-sets the buyer and the
//! execution date. Approval needs a prior execution only when
//! `LedgerConfig::require_execution_before_confirm` is set.
//!
//! ## Write discipline
//!
//! Every mutation reads, decides, then commits one batch guarded by the
//! exact bytes it read. A listing commits the new transaction, the
//! decremented certificate, and the advanced sequence counter together;
//! if any of them changed in between, the batch is refused with
//! `RecError::Conflict` and nothing is written.

use crate::config::LedgerConfig;
use crate::query::read_present;
use crate::record::Record;
use crate::registry::{validate_id, validate_party};
use crate::sequence::SequenceAllocator;
use crate::store::{LedgerStore, WriteBatch};
use crate::types::{RecError, SaleRequest, Transaction, UnixSeconds};

/// The TransactionManager drives transactions through their lifecycle.
pub struct TransactionManager;

impl TransactionManager {
    /// `createTransaction`: list part of a certificate for sale.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the target certificate does not exist
    /// - `InsufficientQuantity` if `quantity` exceeds what the certificate holds
    /// - `InvalidInput` on a supplier mismatch (when enforced) or bad arguments
    /// - `Conflict` if the certificate or sequence changed concurrently
    pub fn create<S: LedgerStore>(
        store: &mut S,
        config: &LedgerConfig,
        now: UnixSeconds,
        request: &SaleRequest,
    ) -> Result<Transaction, RecError> {
        validate_id(&request.target)?;
        validate_party("supplier", &request.supplier)?;

        let observed = read_present(store, &request.target)?;
        let mut certificate = Record::decode_certificate(&request.target, &observed)?;

        if config.enforce_supplier_match && certificate.supplier != request.supplier {
            return Err(RecError::InvalidInput(format!(
                "supplier {} does not hold {}",
                request.supplier, certificate.id
            )));
        }

        if let Err(e) = certificate.withdraw(request.quantity) {
            tracing::warn!(
                target_id = %request.target,
                requested = request.quantity,
                "sale rejected: {}",
                e
            );
            return Err(e);
        }

        let reservation = SequenceAllocator::reserve(store)?;
        let transaction = Transaction::listed(
            reservation.id(),
            &certificate,
            request.price,
            request.quantity,
            now,
        );

        let mut batch = WriteBatch::new();
        batch
            .expect_value(certificate.id.as_str(), Some(observed))
            .expect_absent(transaction.id.as_str());
        reservation.stage(&mut batch)?;
        batch
            .put(
                transaction.id.as_str(),
                Record::from(transaction.clone()).encode()?,
            )
            .put(
                certificate.id.as_str(),
                Record::from(certificate.clone()).encode()?,
            );

        store.commit(batch).map_err(|e| match e {
            RecError::Conflict(key) if key == transaction.id => RecError::AlreadyExists(key),
            other => other,
        })?;

        tracing::info!(
            id = %transaction.id,
            target_id = %certificate.id,
            quantity = transaction.quantity,
            remaining = certificate.quantity,
            "listed transaction"
        );
        Ok(transaction)
    }

    /// `executeTransaction`: record the buyer and execution time.
    ///
    /// Re-execution silently overwrites buyer and date.
    pub fn execute<S: LedgerStore>(
        store: &mut S,
        now: UnixSeconds,
        id: &str,
        buyer: &str,
    ) -> Result<Transaction, RecError> {
        validate_party("buyer", buyer)?;
        let updated = Self::rewrite(store, id, |tx| {
            if tx.is_executed() {
                tracing::debug!(id = %tx.id, previous = ?tx.buyer, "re-executing transaction");
            }
            tx.buyer = Some(buyer.to_string());
            tx.executed_date = Some(now);
            Ok(())
        })?;
        tracing::info!(id = %updated.id, buyer = %buyer, "executed transaction");
        Ok(updated)
    }

    /// `approveTransaction`: mark confirmed.
    pub fn approve<S: LedgerStore>(
        store: &mut S,
        config: &LedgerConfig,
        id: &str,
    ) -> Result<Transaction, RecError> {
        let updated = Self::rewrite(store, id, |tx| {
            if config.require_execution_before_confirm && tx.buyer.is_none() {
                return Err(RecError::NotExecuted(tx.id.clone()));
            }
            tx.is_confirmed = true;
            Ok(())
        })?;
        tracing::info!(id = %updated.id, "confirmed transaction");
        Ok(updated)
    }

    /// `queryTransactionById`.
    pub fn get<S: LedgerStore>(store: &S, id: &str) -> Result<Transaction, RecError> {
        validate_id(id)?;
        let bytes = read_present(store, id)?;
        Record::decode_transaction(id, &bytes)
    }

    /// Read a transaction, apply `mutate`, write it back guarded by the bytes read.
    fn rewrite<S, F>(store: &mut S, id: &str, mutate: F) -> Result<Transaction, RecError>
    where
        S: LedgerStore,
        F: FnOnce(&mut Transaction) -> Result<(), RecError>,
    {
        validate_id(id)?;
        let observed = read_present(store, id)?;
        let mut transaction = Record::decode_transaction(id, &observed)?;
        mutate(&mut transaction)?;

        let mut batch = WriteBatch::new();
        batch
            .expect_value(id, Some(observed))
            .put(id, Record::from(transaction.clone()).encode()?);
        store.commit(batch)?;
        Ok(transaction)
    }
}
