use super::error::PublishError;
use crate::stats::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkStatus {
    Connected,
    Disconnected,
}

impl SinkStatus {
    pub fn from_connected(connected: bool) -> Self {
        if connected {
            SinkStatus::Connected
        } else {
            SinkStatus::Disconnected
        }
    }

    pub fn is_connected(self) -> bool {
        self == SinkStatus::Connected
    }
}

/// One reporting cycle as seen by external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    pub packets: u64,
    pub bytes: u64,
    pub megabytes_processed: f64,
    pub avg_size: f64,
    /// Absent until the first packet is recorded
    pub min_size: Option<u32>,
    pub max_size: u32,
    pub pps: f64,
    pub throughput_mbps: f64,
    pub jitter_ns: f64,
    pub histogram: Vec<u64>,
    pub queue_depth: usize,
    pub predicted_delay_ms: f64,
    pub sink: SinkStatus,
}

impl TelemetryRecord {
    pub fn from_snapshot(
        snapshot: &Snapshot,
        queue_depth: usize,
        predicted_delay_ms: f64,
        sink: SinkStatus,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            packets: snapshot.total_packets,
            bytes: snapshot.total_bytes,
            megabytes_processed: snapshot.megabytes_processed(),
            avg_size: snapshot.avg_size,
            min_size: snapshot.min_size,
            max_size: snapshot.max_size,
            pps: snapshot.pps,
            throughput_mbps: snapshot.throughput_mbps,
            jitter_ns: snapshot.jitter_ns,
            histogram: snapshot.histogram.clone(),
            queue_depth,
            predicted_delay_ms,
            sink,
        }
    }

    /// Single-line JSON terminated by `\n`.
    pub fn to_json_line(&self) -> Result<String, PublishError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
