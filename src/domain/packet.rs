use serde::{Deserialize, Serialize};

/// A synthetic packet observation.
///
/// Created by the producer, moved through the queue and consumed by exactly
/// one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketEvent {
    /// Producer-assigned sequence number, starting at 1.
    pub id: u64,
    /// Packet size in bytes.
    pub size: u32,
    /// Monotonic clock reading at generation time, in nanoseconds.
    pub timestamp_ns: u64,
}

impl PacketEvent {
    pub fn new(id: u64, size: u32, timestamp_ns: u64) -> Self {
        Self {
            id,
            size,
            timestamp_ns,
        }
    }
}

/// Element carried by the pipeline queue.
///
/// `Stop` is the shutdown sentinel: one is enqueued per worker so that a
/// worker parked on an empty queue wakes up and exits. It is never recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItem {
    Packet(PacketEvent),
    Stop,
}

impl WorkItem {
    pub fn is_stop(&self) -> bool {
        matches!(self, WorkItem::Stop)
    }
}

impl From<PacketEvent> for WorkItem {
    fn from(event: PacketEvent) -> Self {
        WorkItem::Packet(event)
    }
}
