//! Benchmarks for retry delay computation

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use wifiqr_core::{AdapterError, AllowListClassifier, ErrorClassifier};
use wifiqr_runtime::{Backoff, EngineConfig};

fn bench_backoff_delay(c: &mut Criterion) {
    let backoff = Backoff::new(&EngineConfig::default().with_jitter_seed(1));

    c.bench_function("backoff_delay", |b| b.iter(|| backoff.delay(black_box(4))));
}

fn bench_classify(c: &mut Criterion) {
    let classifier = AllowListClassifier::corewlan();
    let errors = [
        AdapterError::new(16, "NSPOSIXErrorDomain", "busy"),
        AdapterError::new(-3913, "com.apple.coreWLAN.error", "timeout"),
        AdapterError::new(-1, "unknown", "fatal"),
    ];

    c.bench_function("classify", |b| {
        b.iter(|| {
            for error in &errors {
                black_box(classifier.classify(black_box(error)));
            }
        })
    });
}

criterion_group!(benches, bench_backoff_delay, bench_classify);
criterion_main!(benches);
