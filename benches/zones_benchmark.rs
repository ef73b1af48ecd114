//! Benchmarks for pressure zone detection and store writes

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use depth_pressure::orderbook::{compute_zones, detect_zones, OrderbookSnapshot, PriceLevel, Side};
use depth_pressure::{OrderbookStore, SyntheticBook};

fn create_snapshot(levels: usize) -> OrderbookSnapshot {
    let bids: Vec<PriceLevel> = (0..levels)
        .map(|i| PriceLevel::new(50000.0 - i as f64, 1.5 + (i % 7) as f64))
        .collect();

    let asks: Vec<PriceLevel> = (0..levels)
        .map(|i| PriceLevel::new(50001.0 + i as f64, 1.5 + (i % 5) as f64))
        .collect();

    OrderbookSnapshot { bids, asks }
}

fn benchmark_detect_zones(c: &mut Criterion) {
    let snapshot = create_snapshot(50);

    c.bench_function("detect_zones_50_levels", |b| {
        b.iter(|| black_box(detect_zones(black_box(&snapshot.bids), Side::Bid)))
    });

    c.bench_function("compute_zones_50_levels", |b| {
        b.iter(|| black_box(compute_zones(black_box(&snapshot))))
    });
}

fn benchmark_store_write(c: &mut Criterion) {
    let store = OrderbookStore::new();
    let mut book = SyntheticBook::seeded(50000.0, 11);

    c.bench_function("set_orderbook_synthetic", |b| {
        b.iter(|| store.set_orderbook(book.next_snapshot()))
    });

    c.bench_function("get_state", |b| b.iter(|| black_box(store.get_state())));
}

criterion_group!(benches, benchmark_detect_zones, benchmark_store_write);
criterion_main!(benches);
