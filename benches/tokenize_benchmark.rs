//! Tokenizer and filter throughput.
//!
//! Run with: cargo bench --bench tokenize_benchmark

#![allow(missing_docs)] // criterion macros generate undocumented items

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use logview::filter::FilterState;
use logview::model::{EntryId, LogEntry};
use logview::store::LogStore;
use logview::tokenizer::tokenize;

/// Representative lines: plain, structured, styled, URL-heavy.
const SAMPLES: &[(&str, &str)] = &[
    ("plain", "worker finished processing the queue without incident"),
    (
        "structured",
        "2024-04-08T19:10:00.000Z [INFO] [worker-3] user=alice status=200 took=35ms ip=10.0.0.12",
    ),
    (
        "styled",
        "\x1b[1m\x1b[38;5;208mWARN\x1b[0m \x1b[2mcache miss\x1b[0m key=\"session:42\" retry=3",
    ),
    (
        "urls",
        "GET https://api.example.com:8443/v1/items?page=2 -> /var/log/app/error.log failed",
    ),
];

fn benchmark_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    for (name, line) in SAMPLES {
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| tokenize(black_box(line), false))
        });
    }
    group.bench_function("styled_stripped", |b| {
        b.iter(|| tokenize(black_box(SAMPLES[2].1), true))
    });
    group.finish();
}

/// Full-store filter scan over 10k lines, tokenizing from a cold cache.
fn benchmark_filter_scan(c: &mut Criterion) {
    let entries: Vec<LogEntry> = (0..10_000u64)
        .map(|i| {
            let (_, line) = SAMPLES[(i % SAMPLES.len() as u64) as usize];
            LogEntry::new(EntryId::from_sequence(i), format!("{line} #{i}"), i as i64)
        })
        .collect();

    for query in ["timeout", "@@tag=\"[INFO]\"", "@@http-method,url api"] {
        c.bench_function(&format!("filter_scan_10k/{query}"), |b| {
            b.iter_batched(
                || {
                    let mut store = LogStore::new(20_000);
                    store.append(entries.clone()).expect("unique ids");
                    store
                },
                |mut store| {
                    store
                        .set_filter(Some(FilterState::parse(query)))
                        .expect("filter scan");
                    black_box(store.visible_count())
                },
                BatchSize::LargeInput,
            )
        });
    }
}

criterion_group!(benches, benchmark_tokenize, benchmark_filter_scan);
criterion_main!(benches);
