//! FILENAME: core/engine/benches/evaluate.rs
//! Throughput of parse + evaluate over a representative document.

use calcmark_engine::{evaluate, evaluate_document, Context};
use calcmark_parser::parse;
use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const DOCUMENT: &str = "\
@globals.tax = 8.25%
rent = $1,850
utilities = $240
monthly = (rent + utilities) * (1 + tax)
yearly = monthly * 12
bandwidth = 250 MB/s
daily_transfer = bandwidth over 1 day
daily_transfer in TB
servers = 45,000 req/s at 1,200 req/s per server with 25% buffer
budget = 99.95% downtime per month
launch = September 1, 2025 + 6 weeks
launch - today
average of 12 kg, 15 kg, 9.5 kg
2 ^ 10 * 3.5k as napkin
";

fn reference_context() -> Context {
    Context::with_today(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap_or_default())
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_document", |b| {
        b.iter(|| parse(black_box(DOCUMENT)).unwrap())
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let nodes = parse(DOCUMENT).unwrap();
    c.bench_function("evaluate_parsed", |b| {
        b.iter(|| {
            let mut ctx = reference_context();
            evaluate(black_box(&nodes), &mut ctx).unwrap()
        })
    });
}

fn bench_end_to_end(c: &mut Criterion) {
    c.bench_function("evaluate_document", |b| {
        b.iter(|| {
            let mut ctx = reference_context();
            evaluate_document(black_box(DOCUMENT), &mut ctx).unwrap()
        })
    });
}

criterion_group!(benches, bench_parse, bench_evaluate, bench_end_to_end);
criterion_main!(benches);
