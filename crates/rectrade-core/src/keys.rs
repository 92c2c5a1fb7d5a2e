//! # Key Codec
//!
//! Builds and parses the string keys of ledger records.
//!
//! A record's key equals its id: `"<TYPE>_<value>"` with
//! `TYPE ∈ {CERTIFICATE, TRANSACTION}`. The prefix keeps certificate and
//! transaction records in disjoint key ranges of the shared namespace, so
//! each kind can be range-scanned on its own.

use crate::primitives::{CERTIFICATE_PREFIX, TRANSACTION_PREFIX};
use crate::types::{RecordKind, UnixSeconds};
use std::fmt::Display;

/// Key prefix of a record kind.
#[must_use]
pub const fn prefix(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Certificate => CERTIFICATE_PREFIX,
        RecordKind::Transaction => TRANSACTION_PREFIX,
    }
}

/// Build `"<TYPE>_<value>"`.
#[must_use]
pub fn record_key(kind: RecordKind, value: impl Display) -> String {
    format!("{}{}", prefix(kind), value)
}

/// Certificate id for a registration at `issued_at`.
#[must_use]
pub fn certificate_id(issued_at: UnixSeconds) -> String {
    record_key(RecordKind::Certificate, issued_at)
}

/// Transaction id for a sequence number.
#[must_use]
pub fn transaction_id(sequence: u64) -> String {
    record_key(RecordKind::Transaction, sequence)
}

/// Record kind encoded in an id, if its prefix is known.
#[must_use]
pub fn kind_of(id: &str) -> Option<RecordKind> {
    RecordKind::ALL
        .into_iter()
        .find(|&kind| id.starts_with(prefix(kind)))
}

/// Sequence number of a transaction id.
///
/// Returns `None` for non-transaction ids and for suffixes that are not
/// plain decimal numbers.
#[must_use]
pub fn transaction_sequence(id: &str) -> Option<u64> {
    let suffix = id.strip_prefix(TRANSACTION_PREFIX)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Half-open key range `[start, end)` holding every key of `kind`.
#[must_use]
pub fn kind_range(kind: RecordKind) -> (String, String) {
    let start = prefix(kind);
    (start.to_string(), prefix_end(start))
}

/// Smallest string greater than every string starting with `prefix`.
///
/// Prefixes are ASCII, so bumping the last byte stays valid UTF-8.
fn prefix_end(prefix: &str) -> String {
    let mut bytes = prefix.as_bytes().to_vec();
    while let Some(last) = bytes.pop() {
        if last < 0x7f {
            bytes.push(last + 1);
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_prefixed_keys() {
        assert_eq!(certificate_id(1_700_000_000), "CERTIFICATE_1700000000");
        assert_eq!(transaction_id(7), "TRANSACTION_7");
    }

    #[test]
    fn parses_kind_from_prefix() {
        assert_eq!(kind_of("CERTIFICATE_1"), Some(RecordKind::Certificate));
        assert_eq!(kind_of("TRANSACTION_12"), Some(RecordKind::Transaction));
        assert_eq!(kind_of("~sequence/TRANSACTION"), None);
        assert_eq!(kind_of("certificate_1"), None);
    }

    #[test]
    fn parses_transaction_sequence() {
        assert_eq!(transaction_sequence("TRANSACTION_42"), Some(42));
        assert_eq!(transaction_sequence("TRANSACTION_"), None);
        assert_eq!(transaction_sequence("TRANSACTION_+4"), None);
        assert_eq!(transaction_sequence("TRANSACTION_abc"), None);
        assert_eq!(transaction_sequence("CERTIFICATE_42"), None);
    }

    #[test]
    fn kind_range_bounds_the_prefix() {
        let (start, end) = kind_range(RecordKind::Certificate);
        assert_eq!(start, "CERTIFICATE_");
        assert_eq!(end, "CERTIFICATE`");
        assert!("CERTIFICATE_9999999999".to_string() < end);
        assert!("CERTIFICATE_".to_string() >= start);
        assert!("TRANSACTION_1".to_string() > end);
    }
}
