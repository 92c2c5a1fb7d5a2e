//! # Ledger Primitives
//!
//! Hardcoded constants for the ledger state machine.
//!
//! These values are part of the replicated state format: every replica
//! must agree on them, so they are compiled in and immutable at runtime.

/// Key and id prefix of certificate records.
pub const CERTIFICATE_PREFIX: &str = "CERTIFICATE_";

/// Key and id prefix of transaction records.
pub const TRANSACTION_PREFIX: &str = "TRANSACTION_";

/// Persisted next-transaction-sequence key.
///
/// `~` sorts after every record prefix, so the key never falls inside a
/// record range scan.
pub const TRANSACTION_SEQUENCE_KEY: &str = "~sequence/TRANSACTION";

/// First sequence handed out on a fresh ledger.
pub const FIRST_TRANSACTION_SEQUENCE: u64 = 1;

/// JSON field carrying the record discriminator.
pub const DOC_TYPE_FIELD: &str = "docType";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a supplier or buyer identifier.
pub const MAX_PARTY_LENGTH: usize = 256;

/// Maximum length of a record id passed by a caller.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum size of a single stored record value.
///
/// Larger values are treated as malformed rather than parsed.
pub const MAX_RECORD_SIZE: usize = 64 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_key_sorts_after_record_prefixes() {
        assert!(TRANSACTION_SEQUENCE_KEY > TRANSACTION_PREFIX);
        assert!(TRANSACTION_SEQUENCE_KEY > CERTIFICATE_PREFIX);
        assert!(!TRANSACTION_SEQUENCE_KEY.starts_with(TRANSACTION_PREFIX));
    }

    #[test]
    fn prefixes_do_not_overlap() {
        assert!(!CERTIFICATE_PREFIX.starts_with(TRANSACTION_PREFIX));
        assert!(!TRANSACTION_PREFIX.starts_with(CERTIFICATE_PREFIX));
    }
}
