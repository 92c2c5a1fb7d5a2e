//! # Ledger Benchmarks
//!
//! Performance benchmarks for rectrade-core ledger operations.
//!
//! Run with: `cargo bench -p rectrade-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rectrade_core::{
    CertificateRequest, Ledger, LedgerConfig, ManualClock, SaleRequest, StorageBackend,
};
use std::hint::black_box;
use std::sync::Arc;

/// A ledger with `size` certificates, each with one executed sale.
fn create_traded_ledger(size: usize) -> Ledger {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut ledger = Ledger::open(StorageBackend::default(), LedgerConfig::default())
        .expect("open")
        .with_clock(Arc::clone(&clock));

    for i in 0..size {
        clock.advance(1);
        let supplier = format!("S{}", i % 10);
        let cert = ledger
            .register_certificate(&CertificateRequest {
                supplier: supplier.clone(),
                quantity: 100,
                is_jeju: i % 2 == 0,
                supply_date: 0,
                expire_date: 0,
            })
            .expect("register");
        let tx = ledger
            .create_transaction(&SaleRequest {
                target: cert.id,
                price: 10,
                quantity: 10,
                supplier,
            })
            .expect("sell");
        ledger
            .execute_transaction(&tx.id, &format!("B{}", i % 7))
            .expect("buy");
    }

    ledger
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_create_transaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_transaction");

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let clock = Arc::new(ManualClock::new(1));
                let mut ledger =
                    Ledger::open(StorageBackend::default(), LedgerConfig::default())
                        .expect("open")
                        .with_clock(Arc::clone(&clock));
                let cert = ledger
                    .register_certificate(&CertificateRequest {
                        supplier: "S1".to_string(),
                        quantity: size as u64,
                        is_jeju: false,
                        supply_date: 0,
                        expire_date: 0,
                    })
                    .expect("register");
                for _ in 0..size {
                    let _ = ledger.create_transaction(&SaleRequest {
                        target: cert.id.clone(),
                        price: 1,
                        quantity: 1,
                        supplier: "S1".to_string(),
                    });
                }
                black_box(ledger)
            });
        });
    }

    group.finish();
}

fn bench_scan_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_queries");

    for size in [100, 1000].iter() {
        let ledger = create_traded_ledger(*size);

        group.bench_with_input(BenchmarkId::new("executed", size), size, |b, _| {
            b.iter(|| black_box(ledger.query_executed_transactions()));
        });
        group.bench_with_input(BenchmarkId::new("supplier_sum", size), size, |b, _| {
            b.iter(|| black_box(ledger.sum_certificate_quantity_by_supplier("S3")));
        });
    }

    group.finish();
}

fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_checksum");

    for size in [100, 1000].iter() {
        let ledger = create_traded_ledger(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(ledger.checksum()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_create_transaction,
    bench_scan_queries,
    bench_checksum,
);

criterion_main!(benches);
