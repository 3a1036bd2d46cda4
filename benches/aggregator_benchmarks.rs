use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use netgate_telemetry::stats::{AggregatorConfig, StatsAggregator};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

fn bench_record_single_thread(c: &mut Criterion) {
    let stats = StatsAggregator::new(AggregatorConfig::default())
        .expect("Failed to create aggregator for benchmark");
    let mut timestamp = 0u64;

    let mut group = c.benchmark_group("record");
    group.throughput(Throughput::Elements(1));
    group.bench_function("single_thread", |b| {
        b.iter(|| {
            timestamp += 1_000;
            stats.record(black_box((timestamp % 1500) as u32), timestamp);
        });
    });
    group.finish();
}

fn bench_record_contended(c: &mut Criterion) {
    const PER_THREAD: u64 = 10_000;

    let mut group = c.benchmark_group("record_contended");
    for &threads in &[2usize, 4, 8] {
        group.throughput(Throughput::Elements(PER_THREAD * threads as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let stats = Arc::new(
                    StatsAggregator::new(AggregatorConfig::default())
                        .expect("Failed to create aggregator for benchmark"),
                );
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let stats = stats.clone();
                        thread::spawn(move || {
                            for i in 0..PER_THREAD {
                                stats.record(((i * 7 + t as u64) % 1500) as u32, i);
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().expect("benchmark thread panicked");
                }
            });
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let stats = StatsAggregator::new(AggregatorConfig {
        bucket_width: 100,
        bucket_count: 64,
    })
    .expect("Failed to create aggregator for benchmark");
    for i in 0..100_000u64 {
        stats.record((i % 6400) as u32, i * 100);
    }
    let baseline = stats.snapshot(None);

    c.bench_function("snapshot_with_rates", |b| {
        b.iter(|| black_box(stats.snapshot(Some(&baseline))));
    });
}

criterion_group!(
    benches,
    bench_record_single_thread,
    bench_record_contended,
    bench_snapshot
);
criterion_main!(benches);
