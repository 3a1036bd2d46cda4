use serde::Serialize;
use std::fmt::Write as _;
use std::time::Instant;

/// Immutable point-in-time copy of the aggregate counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub total_packets: u64,
    pub total_bytes: u64,
    pub avg_size: f64,
    /// `None` until the first packet is recorded.
    pub min_size: Option<u32>,
    pub max_size: u32,
    /// Packets per second since the previous snapshot.
    pub pps: f64,
    /// Megabits per second since the previous snapshot.
    pub throughput_mbps: f64,
    /// Mean forward inter-arrival gap in nanoseconds.
    pub jitter_ns: f64,
    pub histogram: Vec<u64>,
    pub bucket_width: u32,
    #[serde(skip)]
    pub captured_at: Instant,
}

/// Rates derived from two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rates {
    pub pps: f64,
    pub throughput_mbps: f64,
    pub elapsed_secs: f64,
}

impl Snapshot {
    /// Rates between `previous` and this snapshot.
    ///
    /// Zero elapsed time (or a `previous` taken later than `self`) yields
    /// zero rates rather than a division fault.
    pub fn rates_since(&self, previous: &Snapshot) -> Rates {
        let elapsed_secs = self
            .captured_at
            .saturating_duration_since(previous.captured_at)
            .as_secs_f64();
        if elapsed_secs <= 0.0 {
            return Rates::default();
        }

        let packets = self.total_packets.saturating_sub(previous.total_packets);
        let bytes = self.total_bytes.saturating_sub(previous.total_bytes);

        Rates {
            pps: packets as f64 / elapsed_secs,
            throughput_mbps: bytes as f64 * 8.0 / 1_000_000.0 / elapsed_secs,
            elapsed_secs,
        }
    }

    pub fn megabytes_processed(&self) -> f64 {
        self.total_bytes as f64 / 1_000_000.0
    }

    /// Minimum size for consumers that cannot express absence.
    pub fn min_size_or_zero(&self) -> u32 {
        self.min_size.unwrap_or(0)
    }

    /// Render the size histogram as one bar per bucket, longest bar
    /// `max_bar` characters wide.
    pub fn histogram_bars(&self, max_bar: usize) -> String {
        let peak = self.histogram.iter().copied().max().unwrap_or(0).max(1);
        let last = self.histogram.len().saturating_sub(1);
        let width = u64::from(self.bucket_width);

        let mut out = String::new();
        for (i, &count) in self.histogram.iter().enumerate() {
            let lo = i as u64 * width;
            let range = if i == last {
                format!("{lo}+")
            } else {
                format!("{lo}-{}", lo + width - 1)
            };
            let bar_len = (count as u128 * max_bar as u128 / peak as u128) as usize;
            let _ = writeln!(out, "[{range}] {} {count}", "#".repeat(bar_len));
        }
        out
    }
}
