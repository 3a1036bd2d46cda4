// Lock-free packet statistics using atomic operations
//
// Every worker records into the same aggregator without external locking.
// Each counter is its own atomic, so updates to totals, extremes and
// histogram buckets never serialize behind one another.

use super::error::StatsError;
use super::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

/// Internal "no data yet" value for the running minimum.
const NO_MIN: u32 = u32::MAX;
/// Internal "no arrival yet" value for the last arrival time.
const NO_ARRIVAL: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Width of each histogram bucket in bytes
    pub bucket_width: u32,
    /// Number of buckets; the last one collects every larger packet
    pub bucket_count: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            bucket_width: 200,
            bucket_count: 8,
        }
    }
}

#[derive(Debug)]
pub struct StatsAggregator {
    config: AggregatorConfig,
    total_packets: AtomicU64,
    total_bytes: AtomicU64,
    min_size: AtomicU32,
    max_size: AtomicU32,
    histogram: Box<[AtomicU64]>,
    last_arrival_ns: AtomicU64,
    jitter_sum_ns: AtomicU64,
    jitter_samples: AtomicU64,
}

impl StatsAggregator {
    pub fn new(config: AggregatorConfig) -> Result<Self, StatsError> {
        if config.bucket_width == 0 {
            return Err(StatsError::InvalidBucketWidth);
        }
        if config.bucket_count == 0 {
            return Err(StatsError::InvalidBucketCount(config.bucket_count));
        }

        Ok(Self {
            config,
            total_packets: AtomicU64::new(0),
            total_bytes: AtomicU64::new(0),
            min_size: AtomicU32::new(NO_MIN),
            max_size: AtomicU32::new(0),
            histogram: (0..config.bucket_count).map(|_| AtomicU64::new(0)).collect(),
            last_arrival_ns: AtomicU64::new(NO_ARRIVAL),
            jitter_sum_ns: AtomicU64::new(0),
            jitter_samples: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> AggregatorConfig {
        self.config
    }

    /// Bucket a packet of `size` bytes falls into; oversized packets clamp
    /// into the last bucket.
    pub fn bucket_index(&self, size: u32) -> usize {
        ((size / self.config.bucket_width) as usize).min(self.config.bucket_count - 1)
    }

    /// Record one processed packet.
    pub fn record(&self, size: u32, timestamp_ns: u64) {
        self.total_packets.fetch_add(1, Ordering::Relaxed);
        self.total_bytes.fetch_add(size as u64, Ordering::Relaxed);

        update_min(&self.min_size, size);
        update_max(&self.max_size, size);

        self.histogram[self.bucket_index(size)].fetch_add(1, Ordering::Relaxed);

        // The arrival time is always replaced; only forward gaps count.
        let previous = self.last_arrival_ns.swap(timestamp_ns, Ordering::AcqRel);
        if previous != NO_ARRIVAL && timestamp_ns > previous {
            self.jitter_sum_ns
                .fetch_add(timestamp_ns - previous, Ordering::Relaxed);
            self.jitter_samples.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Capture every counter, deriving rates against `previous` when given.
    pub fn snapshot(&self, previous: Option<&Snapshot>) -> Snapshot {
        let captured_at = Instant::now();
        let total_packets = self.total_packets.load(Ordering::Relaxed);
        let total_bytes = self.total_bytes.load(Ordering::Relaxed);

        let min_size = match self.min_size.load(Ordering::Relaxed) {
            NO_MIN => None,
            size => Some(size),
        };
        let max_size = self.max_size.load(Ordering::Relaxed);

        let avg_size = if total_packets > 0 {
            total_bytes as f64 / total_packets as f64
        } else {
            0.0
        };

        let jitter_samples = self.jitter_samples.load(Ordering::Relaxed);
        let jitter_ns = if jitter_samples > 0 {
            self.jitter_sum_ns.load(Ordering::Relaxed) as f64 / jitter_samples as f64
        } else {
            0.0
        };

        let histogram = self
            .histogram
            .iter()
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .collect();

        let mut snapshot = Snapshot {
            total_packets,
            total_bytes,
            avg_size,
            min_size,
            max_size,
            pps: 0.0,
            throughput_mbps: 0.0,
            jitter_ns,
            histogram,
            bucket_width: self.config.bucket_width,
            captured_at,
        };

        if let Some(previous) = previous {
            let rates = snapshot.rates_since(previous);
            snapshot.pps = rates.pps;
            snapshot.throughput_mbps = rates.throughput_mbps;
        }

        snapshot
    }

    /// Restore the initial state. Not meant to race with `record`.
    pub fn reset(&self) {
        self.total_packets.store(0, Ordering::Relaxed);
        self.total_bytes.store(0, Ordering::Relaxed);
        self.min_size.store(NO_MIN, Ordering::Relaxed);
        self.max_size.store(0, Ordering::Relaxed);
        for bucket in &self.histogram {
            bucket.store(0, Ordering::Relaxed);
        }
        self.last_arrival_ns.store(NO_ARRIVAL, Ordering::Relaxed);
        self.jitter_sum_ns.store(0, Ordering::Relaxed);
        self.jitter_samples.store(0, Ordering::Relaxed);
    }
}

fn update_min(target: &AtomicU32, value: u32) {
    let mut current = target.load(Ordering::Relaxed);
    while value < current {
        match target.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

fn update_max(target: &AtomicU32, value: u32) {
    let mut current = target.load(Ordering::Relaxed);
    while value > current {
        match target.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn aggregator() -> StatsAggregator {
        StatsAggregator::new(AggregatorConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config() {
        let zero_width = AggregatorConfig {
            bucket_width: 0,
            bucket_count: 8,
        };
        assert_eq!(
            StatsAggregator::new(zero_width).unwrap_err(),
            StatsError::InvalidBucketWidth
        );

        let zero_buckets = AggregatorConfig {
            bucket_width: 200,
            bucket_count: 0,
        };
        assert_eq!(
            StatsAggregator::new(zero_buckets).unwrap_err(),
            StatsError::InvalidBucketCount(0)
        );
    }

    #[test]
    fn test_reference_scenario() {
        let stats = aggregator();
        stats.record(100, 1000);
        stats.record(2000, 1500);
        stats.record(500, 2600);

        let snapshot = stats.snapshot(None);
        assert_eq!(snapshot.total_packets, 3);
        assert_eq!(snapshot.total_bytes, 2600);
        assert!((snapshot.avg_size - 866.666).abs() < 0.01);
        assert_eq!(snapshot.min_size, Some(100));
        assert_eq!(snapshot.max_size, 2000);
        assert_eq!(snapshot.histogram, vec![1, 0, 1, 0, 0, 0, 0, 1]);
        assert!((snapshot.jitter_ns - 800.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_snapshot_has_no_min() {
        let snapshot = aggregator().snapshot(None);
        assert_eq!(snapshot.total_packets, 0);
        assert_eq!(snapshot.min_size, None);
        assert_eq!(snapshot.max_size, 0);
        assert_eq!(snapshot.avg_size, 0.0);
        assert_eq!(snapshot.jitter_ns, 0.0);
        assert_eq!(snapshot.pps, 0.0);
        assert!(snapshot.histogram.iter().all(|&count| count == 0));
    }

    #[test]
    fn test_bucket_clamping() {
        let stats = aggregator();
        assert_eq!(stats.bucket_index(0), 0);
        assert_eq!(stats.bucket_index(199), 0);
        assert_eq!(stats.bucket_index(200), 1);
        assert_eq!(stats.bucket_index(1599), 7);
        assert_eq!(stats.bucket_index(1600), 7);
        assert_eq!(stats.bucket_index(u32::MAX), 7);
    }

    #[test]
    fn test_jitter_ignores_backward_and_duplicate_timestamps() {
        let stats = aggregator();
        stats.record(100, 1000);
        stats.record(100, 1000); // duplicate
        stats.record(100, 900); // out of order, becomes the new last arrival
        stats.record(100, 1300); // 1300 - 900

        let snapshot = stats.snapshot(None);
        assert!((snapshot.jitter_ns - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_timestamp_counts_as_prior_arrival() {
        let stats = aggregator();
        stats.record(64, 0);
        stats.record(64, 250);
        assert!((stats.snapshot(None).jitter_ns - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset() {
        let stats = aggregator();
        stats.record(300, 10);
        stats.record(900, 20);
        stats.reset();

        let snapshot = stats.snapshot(None);
        assert_eq!(snapshot.total_packets, 0);
        assert_eq!(snapshot.total_bytes, 0);
        assert_eq!(snapshot.min_size, None);
        assert_eq!(snapshot.max_size, 0);
        assert_eq!(snapshot.jitter_ns, 0.0);

        // No prior arrival after a reset, so the first gap is not counted.
        stats.record(100, 5000);
        assert_eq!(stats.snapshot(None).jitter_ns, 0.0);
    }

    #[test]
    fn test_concurrent_access() {
        let stats = Arc::new(aggregator());
        let mut handles = vec![];

        for i in 0..8u32 {
            let stats_clone = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for j in 0..1000u32 {
                    let size = 64 + (i * 1000 + j) % 1437;
                    stats_clone.record(size, u64::from(i * 1000 + j));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot(None);
        assert_eq!(snapshot.total_packets, 8000);
        assert_eq!(snapshot.histogram.iter().sum::<u64>(), 8000);
        assert_eq!(snapshot.min_size, Some(64));
        assert_eq!(snapshot.max_size, 1500);
    }
}
