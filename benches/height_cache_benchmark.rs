//! HeightCache rebuild and lookup cost at large entry counts.
//!
//! Run with: cargo bench --bench height_cache_benchmark

#![allow(missing_docs)] // criterion macros generate undocumented items

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use logview::view_state::{HeightCache, VisibleRange};

const SIZES: &[usize] = &[10_000, 100_000, 1_000_000];

/// Cache with every fifth index measured at a varying extent.
fn measured_cache(count: usize) -> HeightCache {
    let mut cache = HeightCache::new(1.0);
    for index in (0..count).step_by(5) {
        cache.set_height(index, (index % 7 + 1) as f64);
    }
    cache.rebuild(count);
    cache
}

fn benchmark_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("height_cache_rebuild");
    for &count in SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut cache = measured_cache(count);
            b.iter(|| {
                // One new measurement dirties the prefix sums.
                cache.set_height(count / 2, 3.0);
                cache.rebuild(black_box(count));
            })
        });
    }
    group.finish();
}

fn benchmark_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("height_cache_lookup");
    for &count in SIZES {
        let cache = measured_cache(count);
        let total = cache.total_height();
        group.bench_with_input(BenchmarkId::from_parameter(count), &cache, |b, cache| {
            let mut offset = 0.0;
            b.iter(|| {
                offset = (offset + 997.0) % total;
                black_box(VisibleRange::compute(cache, count, offset, 50.0, 5))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_rebuild, benchmark_lookup);
criterion_main!(benches);
