//! # rectrade-core
//!
//! The deterministic ledger state machine for Renewable Energy Certificate
//! (REC) issuance and trading - THE LOGIC.
//!
//! Suppliers register certificates holding a quantity of RECs, list part of
//! that quantity for sale as transactions, buyers execute them, and
//! confirmation finalizes the trade. Every rule lives here; persistence is
//! an external collaborator reached through the `LedgerStore` trait.
//!
//! ## Architectural Constraints
//!
//! - Deterministic: ordered scans, no floats, no randomness. Every replica
//!   executing the same operations against the same state reaches the same
//!   state.
//! - Atomic mutations: each operation commits one conditional batch; a lost
//!   update surfaces as `RecError::Conflict`, never as an oversell.
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod clock;
pub mod config;
pub mod export;
pub mod formats;
pub mod keys;
pub mod ledger;
pub mod lifecycle;
pub mod primitives;
pub mod query;
pub mod record;
pub mod registry;
pub mod sequence;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Certificate, CertificateRequest, RecError, RecordKind, SaleRequest, Transaction,
    TransactionState, UnixSeconds,
};

// =============================================================================
// RE-EXPORTS: State Machine
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
#[cfg(feature = "crypto-hash")]
pub use export::state_crypto_hash;
pub use export::{
    LedgerSnapshot, SnapshotEntry, SnapshotHeader, export_snapshot, import_snapshot,
    state_checksum,
};
pub use ledger::Ledger;
pub use lifecycle::TransactionManager;
pub use query::{
    CertificateFilter, KeyedRecord, QueryEngine, QueryOutput, QueryType, TransactionFilter,
};
pub use record::Record;
pub use registry::CertificateRegistry;
pub use sequence::{Reservation, SequenceAllocator};
pub use store::{LedgerStore, MemoryStore, Precondition, RedbStore, StorageBackend, WriteBatch};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{render, to_value};
