use super::stop::StopSignal;
use crate::buffer::BoundedQueue;
use crate::domain::WorkItem;
use crate::stats::StatsAggregator;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Worker lifecycle: `Running -> Draining -> Stopped`, no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Running,
    Draining,
    Stopped,
}

impl WorkerState {
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        matches!(
            (self, next),
            (WorkerState::Running, WorkerState::Draining)
                | (WorkerState::Draining, WorkerState::Stopped)
        )
    }
}

/// Why a worker left `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopRequested,
    Sentinel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: usize,
    pub processed: u64,
    pub state: WorkerState,
    pub exit_reason: ExitReason,
}

/// Drains the queue into the aggregator until stopped.
pub struct Worker {
    id: usize,
    queue: Arc<BoundedQueue<WorkItem>>,
    aggregator: Arc<StatsAggregator>,
    stop: StopSignal,
    work_spin: u32,
    state: WorkerState,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: Arc<BoundedQueue<WorkItem>>,
        aggregator: Arc<StatsAggregator>,
        stop: StopSignal,
        work_spin: u32,
    ) -> Self {
        Self {
            id,
            queue,
            aggregator,
            stop,
            work_spin,
            state: WorkerState::Running,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn run(mut self) -> WorkerReport {
        info!(worker = self.id, "worker started");

        let mut processed = 0u64;
        let exit_reason = loop {
            if self.stop.is_stopped() {
                break ExitReason::StopRequested;
            }
            match self.queue.dequeue() {
                WorkItem::Packet(event) => {
                    simulate_processing(self.work_spin);
                    self.aggregator.record(event.size, event.timestamp_ns);
                    processed += 1;
                }
                WorkItem::Stop => break ExitReason::Sentinel,
            }
        };

        self.transition(WorkerState::Draining);
        self.transition(WorkerState::Stopped);
        info!(worker = self.id, processed, reason = ?exit_reason, "worker stopped");

        WorkerReport {
            id: self.id,
            processed,
            state: self.state,
            exit_reason,
        }
    }

    fn transition(&mut self, next: WorkerState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid worker transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(worker = self.id, from = ?self.state, to = ?next, "worker state change");
        self.state = next;
    }
}

/// Synthetic per-packet CPU cost.
fn simulate_processing(spin: u32) {
    for i in 0..spin {
        std::hint::black_box(i);
    }
}
