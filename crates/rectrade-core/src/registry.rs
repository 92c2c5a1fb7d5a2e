//! # Certificate Registry
//!
//! Registration of certificates and per-supplier queries over them.
//!
//! Certificate ids are derived from the registration second
//! (`CERTIFICATE_<unixSeconds>`). Registration is guarded by an
//! absent-key precondition, so a second registration within the same
//! second fails with `AlreadyExists` instead of overwriting the first.

use crate::keys;
use crate::primitives::{MAX_ID_LENGTH, MAX_PARTY_LENGTH};
use crate::query::{CertificateFilter, QueryEngine};
use crate::record::Record;
use crate::store::{LedgerStore, WriteBatch};
use crate::types::{Certificate, CertificateRequest, RecError, UnixSeconds};

/// The CertificateRegistry issues certificates and aggregates them by supplier.
pub struct CertificateRegistry;

impl CertificateRegistry {
    /// Validate a registration request.
    pub fn validate(request: &CertificateRequest) -> Result<(), RecError> {
        validate_party("supplier", &request.supplier)
    }

    /// Register a new certificate issued at `issued_at`.
    ///
    /// Exactly one ledger write on success.
    pub fn register<S: LedgerStore>(
        store: &mut S,
        issued_at: UnixSeconds,
        request: &CertificateRequest,
    ) -> Result<Certificate, RecError> {
        Self::validate(request)?;

        let certificate = Certificate {
            id: keys::certificate_id(issued_at),
            supplier: request.supplier.clone(),
            quantity: request.quantity,
            is_jeju: request.is_jeju,
            supply_date: request.supply_date,
            expire_date: request.expire_date,
        };

        let bytes = Record::from(certificate.clone()).encode()?;
        let mut batch = WriteBatch::new();
        batch
            .expect_absent(certificate.id.as_str())
            .put(certificate.id.as_str(), bytes);

        store.commit(batch).map_err(|e| match e {
            RecError::Conflict(id) => RecError::AlreadyExists(id),
            other => other,
        })?;

        tracing::info!(
            id = %certificate.id,
            supplier = %certificate.supplier,
            quantity = certificate.quantity,
            "registered certificate"
        );
        Ok(certificate)
    }

    /// `queryCertificatesBySupplier`: exact supplier match, scan order.
    pub fn by_supplier<S: LedgerStore>(
        store: &S,
        supplier: &str,
    ) -> Result<Vec<Certificate>, RecError> {
        QueryEngine::certificates(store, &CertificateFilter::BySupplier(supplier.to_string()))
    }

    /// `sumCertificateQuantityBySupplier`: 0 when the supplier has none.
    pub fn quantity_by_supplier<S: LedgerStore>(
        store: &S,
        supplier: &str,
    ) -> Result<u64, RecError> {
        QueryEngine::certificate_quantity(
            store,
            &CertificateFilter::BySupplier(supplier.to_string()),
        )
    }
}

/// Validate a supplier or buyer identifier.
pub(crate) fn validate_party(field: &str, value: &str) -> Result<(), RecError> {
    if value.trim().is_empty() {
        return Err(RecError::InvalidInput(format!("{} must not be empty", field)));
    }
    if value.len() > MAX_PARTY_LENGTH {
        return Err(RecError::InvalidInput(format!(
            "{} longer than {} bytes",
            field, MAX_PARTY_LENGTH
        )));
    }
    Ok(())
}

/// Validate a caller-supplied record id.
pub(crate) fn validate_id(id: &str) -> Result<(), RecError> {
    if id.is_empty() || id.len() > MAX_ID_LENGTH {
        return Err(RecError::InvalidInput(format!("invalid record id: {:?}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn request(supplier: &str, quantity: u64) -> CertificateRequest {
        CertificateRequest {
            supplier: supplier.to_string(),
            quantity,
            is_jeju: true,
            supply_date: 20240301,
            expire_date: 20270301,
        }
    }

    #[test]
    fn register_writes_one_record() {
        let mut store = MemoryStore::new();
        let cert = CertificateRegistry::register(&mut store, 1_700_000_000, &request("S1", 100))
            .expect("register");

        assert_eq!(cert.id, "CERTIFICATE_1700000000");
        assert_eq!(store.len(), 1);
        assert_eq!(
            QueryEngine::certificate(&store, &cert.id).expect("read"),
            cert
        );
    }

    #[test]
    fn same_second_registration_is_rejected() {
        let mut store = MemoryStore::new();
        CertificateRegistry::register(&mut store, 5, &request("S1", 1)).expect("first");
        let err = CertificateRegistry::register(&mut store, 5, &request("S2", 2))
            .expect_err("collision");
        assert!(matches!(err, RecError::AlreadyExists(ref id) if id == "CERTIFICATE_5"));
        assert_eq!(
            QueryEngine::certificate(&store, "CERTIFICATE_5")
                .expect("read")
                .supplier,
            "S1"
        );
    }

    #[test]
    fn supplier_queries() {
        let mut store = MemoryStore::new();
        CertificateRegistry::register(&mut store, 1, &request("S1", 100)).expect("register");
        CertificateRegistry::register(&mut store, 2, &request("S2", 7)).expect("register");
        CertificateRegistry::register(&mut store, 3, &request("S1", 0)).expect("register");

        assert_eq!(
            CertificateRegistry::by_supplier(&store, "S1")
                .expect("query")
                .len(),
            2
        );
        assert_eq!(
            CertificateRegistry::quantity_by_supplier(&store, "S1").expect("sum"),
            100
        );
        assert_eq!(
            CertificateRegistry::quantity_by_supplier(&store, "nobody").expect("sum"),
            0
        );
    }

    #[test]
    fn empty_supplier_rejected() {
        let mut store = MemoryStore::new();
        let err = CertificateRegistry::register(&mut store, 1, &request("  ", 1))
            .expect_err("invalid");
        assert!(matches!(err, RecError::InvalidInput(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn id_validation() {
        assert!(validate_id("TRANSACTION_1").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id(&"x".repeat(MAX_ID_LENGTH + 1)).is_err());
    }
}
