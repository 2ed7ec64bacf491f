//! Benchmark for the capture hook on the write path.
//!
//! Measures the latency of:
//! 1. Capturing each operation kind, with audit records serialized
//! 2. The error path taken when the catalog has no entry
//! 3. Changed-field detection on wide rows

use capture_hook::diff::changed_fields;
use capture_hook::{
    AuditError, AuditRecord, AuditStore, BroadcastNotifier, CaptureHook, CatalogEntry,
    MemoryCatalog, Mutation,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Map, Value, json};
use std::hint::black_box;

/// Serializes each record and drops it, so the store does not grow.
struct DiscardAudit;

impl AuditStore for DiscardAudit {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        serde_json::to_vec(record)
            .map(|line| {
                black_box(line);
            })
            .map_err(|err| AuditError::Encode(err.to_string()))
    }
}

fn catalog() -> MemoryCatalog {
    MemoryCatalog::from_entries([CatalogEntry::new(
        "orders",
        &["id"],
        &["customer_id", "warehouse_id"],
        &["status", "placed_at"],
    )])
}

fn order(status: &str) -> Value {
    json!({
        "id": 1,
        "customer_id": 7,
        "warehouse_id": 3,
        "status": status,
        "placed_at": "2024-01-01T10:00:00Z",
        "total": 129.5,
        "notes": "leave at the door",
    })
}

fn wide_row(columns: usize, changed_every: usize) -> (Map<String, Value>, Map<String, Value>) {
    let old: Map<String, Value> = (0..columns)
        .map(|i| (format!("col_{i}"), json!(i)))
        .collect();
    let new: Map<String, Value> = (0..columns)
        .map(|i| {
            let value = if i % changed_every == 0 { json!(i + 1) } else { json!(i) };
            (format!("col_{i}"), value)
        })
        .collect();
    (new, old)
}

fn bench_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("capture");

    let mutations = [
        ("insert", Mutation::insert(1, "public", "orders", order("NEW"))),
        (
            "update",
            Mutation::update(2, "public", "orders", order("NEW"), order("SHIPPED")),
        ),
        ("delete", Mutation::delete(3, "public", "orders", order("SHIPPED"))),
        ("truncate", Mutation::truncate(4, "public", "orders")),
        (
            "missing_catalog",
            Mutation::insert(5, "public", "legacy_items", order("NEW")),
        ),
    ];

    for (name, mutation) in &mutations {
        let hook = CaptureHook::new(catalog(), BroadcastNotifier::new("shop"), DiscardAudit);
        let _subscription = hook.notifier().subscribe();
        group.bench_with_input(BenchmarkId::from_parameter(name), mutation, |b, mutation| {
            b.iter(|| black_box(hook.capture(black_box(mutation))));
        });
    }

    group.finish();
}

fn bench_changed_fields(c: &mut Criterion) {
    let mut group = c.benchmark_group("changed_fields");

    for columns in [8, 64, 512] {
        let (new, old) = wide_row(columns, 4);
        group.bench_with_input(BenchmarkId::from_parameter(columns), &columns, |b, _| {
            b.iter(|| black_box(changed_fields(black_box(&new), black_box(&old))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_capture, bench_changed_fields);
criterion_main!(benches);
