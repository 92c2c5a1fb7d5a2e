//! # Record Model
//!
//! JSON encoding of ledger records.
//!
//! Records of both kinds share one flat key namespace. The discriminator is
//! carried twice: as the typed `docType` field written by this crate, and as
//! the id prefix (`CERTIFICATE_` / `TRANSACTION_`). Records written before
//! `docType` existed are decoded from the id prefix alone. When both are
//! present they must agree.

use crate::keys;
use crate::primitives::{DOC_TYPE_FIELD, MAX_RECORD_SIZE};
use crate::types::{Certificate, RecError, RecordKind, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "docType", rename_all = "lowercase")]
pub enum Record {
    Certificate(Certificate),
    Transaction(Transaction),
}

impl Record {
    /// Kind of this record.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Certificate(_) => RecordKind::Certificate,
            Self::Transaction(_) => RecordKind::Transaction,
        }
    }

    /// Id (and storage key) of this record.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Certificate(c) => &c.id,
            Self::Transaction(t) => &t.id,
        }
    }

    /// Encode as UTF-8 JSON, including `docType`.
    pub fn encode(&self) -> Result<Vec<u8>, RecError> {
        serde_json::to_vec(self).map_err(|e| RecError::Serialization(e.to_string()))
    }

    /// Decode the value stored under `key`.
    ///
    /// Fails with `RecError::MalformedRecord` when the bytes are not a JSON
    /// object, the kind cannot be determined, the `docType` and id prefix
    /// disagree, or the fields do not match the kind.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, RecError> {
        let malformed = |reason: String| RecError::MalformedRecord {
            key: key.to_string(),
            reason,
        };

        if bytes.len() > MAX_RECORD_SIZE {
            return Err(malformed(format!(
                "{} bytes exceeds maximum {}",
                bytes.len(),
                MAX_RECORD_SIZE
            )));
        }

        let mut value: Value =
            serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| malformed("not a JSON object".to_string()))?;

        let id_kind = object
            .get("id")
            .and_then(Value::as_str)
            .and_then(keys::kind_of);
        let tagged_kind = match object.remove(DOC_TYPE_FIELD) {
            Some(tag) => Some(
                serde_json::from_value::<RecordKind>(tag)
                    .map_err(|e| malformed(format!("bad {}: {}", DOC_TYPE_FIELD, e)))?,
            ),
            None => None,
        };

        let kind = match (tagged_kind, id_kind) {
            (Some(tagged), Some(prefixed)) if tagged != prefixed => {
                return Err(malformed(format!(
                    "{} says {} but id prefix says {}",
                    DOC_TYPE_FIELD, tagged, prefixed
                )));
            }
            (Some(kind), _) | (None, Some(kind)) => kind,
            (None, None) => return Err(malformed("unknown record kind".to_string())),
        };

        let record = match kind {
            RecordKind::Certificate => serde_json::from_value(value).map(Self::Certificate),
            RecordKind::Transaction => serde_json::from_value(value).map(Self::Transaction),
        }
        .map_err(|e| malformed(e.to_string()))?;

        if record.id() != key {
            return Err(malformed(format!("id {} does not match key", record.id())));
        }
        Ok(record)
    }

    /// Decode, requiring a certificate.
    pub fn decode_certificate(key: &str, bytes: &[u8]) -> Result<Certificate, RecError> {
        match Self::decode(key, bytes)? {
            Self::Certificate(c) => Ok(c),
            Self::Transaction(_) => Err(RecError::MalformedRecord {
                key: key.to_string(),
                reason: "expected a certificate".to_string(),
            }),
        }
    }

    /// Decode, requiring a transaction.
    pub fn decode_transaction(key: &str, bytes: &[u8]) -> Result<Transaction, RecError> {
        match Self::decode(key, bytes)? {
            Self::Transaction(t) => Ok(t),
            Self::Certificate(_) => Err(RecError::MalformedRecord {
                key: key.to_string(),
                reason: "expected a transaction".to_string(),
            }),
        }
    }
}

impl From<Certificate> for Record {
    fn from(c: Certificate) -> Self {
        Self::Certificate(c)
    }
}

impl From<Transaction> for Record {
    fn from(t: Transaction) -> Self {
        Self::Transaction(t)
    }
}
