//! # Property-Based Tests
//!
//! Conservation and determinism invariants of the ledger under random
//! operation sequences.

use proptest::collection::vec;
use proptest::prelude::*;
use rectrade_core::{
    CertificateRequest, Ledger, LedgerConfig, ManualClock, RecError, SaleRequest, StorageBackend,
};
use std::sync::Arc;

fn fresh_ledger() -> (Ledger, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let ledger = Ledger::open(StorageBackend::default(), LedgerConfig::default())
        .expect("open")
        .with_clock(Arc::clone(&clock));
    (ledger, clock)
}

fn register(ledger: &mut Ledger, clock: &ManualClock, supplier: &str, quantity: u64) -> String {
    clock.advance(1);
    ledger
        .register_certificate(&CertificateRequest {
            supplier: supplier.to_string(),
            quantity,
            is_jeju: false,
            supply_date: 0,
            expire_date: 0,
        })
        .expect("register")
        .id
}

fn sale(target: &str, quantity: u64) -> SaleRequest {
    SaleRequest {
        target: target.to_string(),
        price: 1,
        quantity,
        supplier: "S1".to_string(),
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Remaining quantity plus everything listed equals what was issued.
    #[test]
    fn quantity_is_conserved(
        issued in 0u64..1_000,
        requests in vec(0u64..300, 1..20)
    ) {
        let (mut ledger, clock) = fresh_ledger();
        let cert_id = register(&mut ledger, &clock, "S1", issued);

        for amount in &requests {
            match ledger.create_transaction(&sale(&cert_id, *amount)) {
                Ok(_) | Err(RecError::InsufficientQuantity { .. }) => {}
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }

        let remaining = ledger.query_certificate_by_id(&cert_id).expect("get").quantity;
        let listed: u64 = ledger
            .query_all_transactions()
            .expect("all")
            .iter()
            .map(|tx| tx.quantity)
            .sum();
        prop_assert_eq!(remaining + listed, issued);
    }

    /// A sale succeeds exactly when it fits in the remaining quantity.
    #[test]
    fn sale_succeeds_iff_it_fits(issued in 0u64..500, amount in 0u64..1_000) {
        let (mut ledger, clock) = fresh_ledger();
        let cert_id = register(&mut ledger, &clock, "S1", issued);

        let result = ledger.create_transaction(&sale(&cert_id, amount));
        let remaining = ledger.query_certificate_by_id(&cert_id).expect("get").quantity;
        if amount <= issued {
            prop_assert!(result.is_ok());
            prop_assert_eq!(remaining, issued - amount);
        } else {
            let is_insufficient = matches!(result, Err(RecError::InsufficientQuantity { .. }));
            prop_assert!(is_insufficient);
            prop_assert_eq!(remaining, issued);
        }
    }

    /// The supplier sum equals the sum over the supplier's certificates.
    #[test]
    fn supplier_sum_matches_listing(
        certificates in vec((0usize..3, 0u64..1_000), 0..15)
    ) {
        let suppliers = ["S1", "S2", "S3"];
        let (mut ledger, clock) = fresh_ledger();
        for (who, quantity) in &certificates {
            register(&mut ledger, &clock, suppliers[*who], *quantity);
        }

        for supplier in suppliers {
            let listed: u64 = ledger
                .query_certificates_by_supplier(supplier)
                .expect("query")
                .iter()
                .map(|c| c.quantity)
                .sum();
            prop_assert_eq!(
                ledger.sum_certificate_quantity_by_supplier(supplier).expect("sum"),
                listed
            );
        }
    }

    /// Executed and unexecuted views partition all transactions.
    #[test]
    fn execution_views_partition(executed in vec(any::<bool>(), 1..15)) {
        let (mut ledger, clock) = fresh_ledger();
        let cert_id = register(&mut ledger, &clock, "S1", 1_000);

        for execute in &executed {
            let tx = ledger.create_transaction(&sale(&cert_id, 1)).expect("sell");
            if *execute {
                ledger.execute_transaction(&tx.id, "B1").expect("buy");
            }
        }

        let all = ledger.query_all_transactions().expect("all");
        let done = ledger.query_executed_transactions().expect("executed");
        let open = ledger.query_unexecuted_transactions().expect("unexecuted");
        prop_assert_eq!(done.len() + open.len(), all.len());
        prop_assert_eq!(done.len(), executed.iter().filter(|e| **e).count());
        prop_assert!(done.iter().all(|tx| tx.executed_date.is_some()));
        prop_assert!(open.iter().all(|tx| tx.buyer.is_none()));
    }

    /// Replaying the same operations yields the same state checksum.
    #[test]
    fn replay_is_deterministic(amounts in vec(1u64..50, 1..10)) {
        let run = |amounts: &[u64]| {
            let (mut ledger, clock) = fresh_ledger();
            let cert_id = register(&mut ledger, &clock, "S1", 200);
            for amount in amounts {
                if let Ok(tx) = ledger.create_transaction(&sale(&cert_id, *amount)) {
                    ledger.execute_transaction(&tx.id, "B1").expect("buy");
                    ledger.approve_transaction(&tx.id).expect("approve");
                }
            }
            ledger.checksum().expect("checksum")
        };
        prop_assert_eq!(run(&amounts), run(&amounts));
    }

    /// The buyer sum counts confirmed purchases only.
    #[test]
    fn buyer_sum_counts_confirmed_only(
        steps in vec((1u64..20, any::<bool>()), 1..10)
    ) {
        let (mut ledger, clock) = fresh_ledger();
        let cert_id = register(&mut ledger, &clock, "S1", 1_000);

        let mut expected = 0u64;
        for (amount, confirm) in &steps {
            let tx = ledger.create_transaction(&sale(&cert_id, *amount)).expect("sell");
            ledger.execute_transaction(&tx.id, "B1").expect("buy");
            if *confirm {
                ledger.approve_transaction(&tx.id).expect("approve");
                expected += amount;
            }
        }
        prop_assert_eq!(ledger.sum_certificate_quantity_by_buyer("B1").expect("sum"), expected);
    }
}
