use netgate_telemetry::stats::{AggregatorConfig, StatsAggregator};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn aggregator(bucket_width: u32, bucket_count: usize) -> StatsAggregator {
    StatsAggregator::new(AggregatorConfig {
        bucket_width,
        bucket_count,
    })
    .unwrap()
}

#[test]
fn test_reference_scenario() {
    let stats = aggregator(200, 8);
    stats.record(100, 1000);
    stats.record(2000, 1500);
    stats.record(500, 2600);

    let snapshot = stats.snapshot(None);
    assert_eq!(snapshot.total_packets, 3);
    assert_eq!(snapshot.total_bytes, 2600);
    assert!((snapshot.avg_size - 866.666_666).abs() < 1e-3);
    assert_eq!(snapshot.min_size, Some(100));
    assert_eq!(snapshot.max_size, 2000);
    assert_eq!(snapshot.histogram, vec![1, 0, 1, 0, 0, 0, 0, 1]);
    assert!((snapshot.jitter_ns - 800.0).abs() < f64::EPSILON);
    assert_eq!(snapshot.pps, 0.0);
}

#[test]
fn test_rates_are_zero_without_new_packets() {
    let stats = aggregator(200, 8);
    stats.record(1000, 1);
    let first = stats.snapshot(None);
    thread::sleep(Duration::from_millis(5));

    let second = stats.snapshot(Some(&first));
    assert_eq!(second.pps, 0.0);
    assert_eq!(second.throughput_mbps, 0.0);
}

#[test]
fn test_rates_follow_the_delta() {
    let stats = aggregator(200, 8);
    let first = stats.snapshot(None);
    thread::sleep(Duration::from_millis(20));
    for i in 0..100 {
        stats.record(1250, i);
    }

    let second = stats.snapshot(Some(&first));
    let elapsed = second.captured_at.duration_since(first.captured_at).as_secs_f64();
    assert!((second.pps - 100.0 / elapsed).abs() < 1e-6);
    assert!((second.throughput_mbps - 1.0 / elapsed).abs() < 1e-6);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn concurrent_recording_keeps_exact_totals(
        batches in prop::collection::vec(
            prop::collection::vec(0u32..100_000, 1..200),
            1..6,
        ),
    ) {
        let stats = Arc::new(aggregator(200, 8));

        let handles: Vec<_> = batches
            .iter()
            .cloned()
            .map(|batch| {
                let stats = stats.clone();
                thread::spawn(move || {
                    for (i, size) in batch.into_iter().enumerate() {
                        stats.record(size, i as u64);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let all: Vec<u32> = batches.into_iter().flatten().collect();
        let snapshot = stats.snapshot(None);

        prop_assert_eq!(snapshot.total_packets, all.len() as u64);
        prop_assert_eq!(snapshot.total_bytes, all.iter().map(|&s| u64::from(s)).sum::<u64>());
        prop_assert_eq!(snapshot.min_size, all.iter().copied().min());
        prop_assert_eq!(snapshot.max_size, all.iter().copied().max().unwrap_or(0));
        prop_assert_eq!(snapshot.histogram.iter().sum::<u64>(), snapshot.total_packets);
    }

    #[test]
    fn histogram_bucket_matches_size(size in any::<u32>(), width in 1u32..5_000, count in 1usize..32) {
        let stats = aggregator(width, count);
        stats.record(size, 0);

        let expected = ((size / width) as usize).min(count - 1);
        let snapshot = stats.snapshot(None);
        prop_assert_eq!(snapshot.histogram[expected], 1);
        prop_assert_eq!(stats.bucket_index(size), expected);
    }
}
