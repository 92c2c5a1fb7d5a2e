//! # Core Type Definitions
//!
//! This module contains all core types for the REC ledger state machine:
//! - Record payloads (`Certificate`, `Transaction`)
//! - Record discriminator (`RecordKind`) and lifecycle state (`TransactionState`)
//! - Operation inputs (`CertificateRequest`, `SaleRequest`)
//! - Error types (`RecError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Quantities are unsigned, so a negative balance is unrepresentable
//! - Timestamps are supplied by the caller's clock, never read here

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Seconds since the Unix epoch, as stamped on records.
pub type UnixSeconds = i64;

// =============================================================================
// RECORD KIND
// =============================================================================

/// The kind of a ledger record.
///
/// Serialized as the `docType` field of every record written by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// A supplier-issued certificate batch.
    Certificate,
    /// A sale listing against a certificate.
    Transaction,
}

impl RecordKind {
    /// All record kinds, in key order.
    pub const ALL: [RecordKind; 2] = [RecordKind::Certificate, RecordKind::Transaction];

    /// Label used as the wrapper key in query output (`{ "Certificate": ... }`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Certificate => "Certificate",
            Self::Transaction => "Transaction",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// CERTIFICATE
// =============================================================================

/// A batch of renewable-energy certificates issued by one supplier.
///
/// `quantity` is the remaining, unsold amount. It only ever decreases,
/// and only when a transaction is listed against this certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// `CERTIFICATE_<unixSeconds>`.
    pub id: String,
    /// Issuing party.
    pub supplier: String,
    /// Remaining quantity.
    pub quantity: u64,
    /// Provenance flag.
    pub is_jeju: bool,
    /// Supply date (opaque integer, not validated).
    pub supply_date: i64,
    /// Expiry date (opaque integer, not validated).
    pub expire_date: i64,
}

impl Certificate {
    /// Remove `amount` from the remaining quantity.
    ///
    /// Returns `RecError::InsufficientQuantity` and leaves `self` untouched
    /// if the certificate does not hold enough.
    pub fn withdraw(&mut self, amount: u64) -> Result<(), RecError> {
        match self.quantity.checked_sub(amount) {
            Some(rest) => {
                self.quantity = rest;
                Ok(())
            }
            None => Err(RecError::InsufficientQuantity {
                certificate: self.id.clone(),
                requested: amount,
                available: self.quantity,
            }),
        }
    }
}

// =============================================================================
// TRANSACTION
// =============================================================================

/// Observable lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// Listed for sale, no buyer yet.
    Listed,
    /// A buyer executed the purchase.
    Executed,
    /// The transaction was approved.
    Confirmed,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listed => f.write_str("listed"),
            Self::Executed => f.write_str("executed"),
            Self::Confirmed => f.write_str("confirmed"),
        }
    }
}

/// A sale of part of a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// `TRANSACTION_<sequence>`.
    pub id: String,
    /// Id of the certificate being sold.
    pub target: String,
    /// Unit price.
    pub price: u64,
    /// Amount sold.
    pub quantity: u64,
    /// Seller, copied from the certificate.
    pub supplier: String,
    /// Set on execution.
    #[serde(default)]
    pub buyer: Option<String>,
    /// Set on creation.
    #[serde(rename = "registeredDate")]
    pub registered_date: UnixSeconds,
    /// Set on execution.
    #[serde(rename = "executedDate", default)]
    pub executed_date: Option<UnixSeconds>,
    /// Set by approval.
    #[serde(default)]
    pub is_confirmed: bool,
}

impl Transaction {
    /// A new transaction in the `Listed` state.
    #[must_use]
    pub fn listed(
        id: String,
        certificate: &Certificate,
        price: u64,
        quantity: u64,
        registered_date: UnixSeconds,
    ) -> Self {
        Self {
            id,
            target: certificate.id.clone(),
            price,
            quantity,
            supplier: certificate.supplier.clone(),
            buyer: None,
            registered_date,
            executed_date: None,
            is_confirmed: false,
        }
    }

    /// True once a buyer executed the purchase.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.executed_date.is_some()
    }

    /// Current lifecycle state. Confirmation dominates execution.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        if self.is_confirmed {
            TransactionState::Confirmed
        } else if self.is_executed() {
            TransactionState::Executed
        } else {
            TransactionState::Listed
        }
    }
}

// =============================================================================
// OPERATION INPUTS
// =============================================================================

/// Input of `register_certificate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRequest {
    pub supplier: String,
    pub quantity: u64,
    pub is_jeju: bool,
    pub supply_date: i64,
    pub expire_date: i64,
}

/// Input of `create_transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    /// Certificate id.
    pub target: String,
    pub price: u64,
    pub quantity: u64,
    /// Seller, must own `target` unless supplier matching is disabled.
    pub supplier: String,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the ledger core.
///
/// Every operation error aborts the current invocation and is surfaced
/// verbatim. Only scans recover locally from `MalformedRecord`.
#[derive(Debug, Error)]
pub enum RecError {
    /// The requested id has no record (absent or empty read).
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A record with this id already exists.
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// A sale asked for more than the certificate holds.
    #[error(
        "Insufficient quantity on {certificate}: requested {requested}, available {available}"
    )]
    InsufficientQuantity {
        certificate: String,
        requested: u64,
        available: u64,
    },

    /// Stored bytes are not a valid record of the expected kind.
    #[error("Malformed record at {key}: {reason}")]
    MalformedRecord { key: String, reason: String },

    /// An argument failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Confirmation was refused because the transaction has no buyer yet.
    #[error("Transaction not executed: {0}")]
    NotExecuted(String),

    /// A conditional write found the key changed since it was read.
    #[error("Conflicting write on {0}")]
    Conflict(String),

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// TESTS
// =============================================================================
