//! # Ledger Configuration
//!
//! Policy switches for rules that changed across historical revisions of
//! the ledger logic. Every replica of one ledger must run with the same
//! configuration.

use serde::{Deserialize, Serialize};

/// Ledger policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Refuse `approve_transaction` until a buyer executed the purchase.
    ///
    /// Off by default: later revisions confirm regardless of execution.
    pub require_execution_before_confirm: bool,

    /// Reject a sale whose `supplier` differs from the certificate's.
    ///
    /// The stored supplier is always the certificate's either way.
    pub enforce_supplier_match: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            require_execution_before_confirm: false,
            enforce_supplier_match: true,
        }
    }
}

impl LedgerConfig {
    /// Builder-style setter for `require_execution_before_confirm`.
    #[must_use]
    pub fn with_execution_before_confirm(mut self, required: bool) -> Self {
        self.require_execution_before_confirm = required;
        self
    }

    /// Builder-style setter for `enforce_supplier_match`.
    #[must_use]
    pub fn with_supplier_match(mut self, enforced: bool) -> Self {
        self.enforce_supplier_match = enforced;
        self
    }
}
