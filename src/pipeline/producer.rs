use super::stop::StopSignal;
use crate::buffer::BoundedQueue;
use crate::domain::{MonotonicClock, PacketEvent, WorkItem};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerConfig {
    /// Pause between two generated events
    pub interval: Duration,
    /// Smallest synthetic packet size (inclusive)
    pub min_size: u32,
    /// Largest synthetic packet size (inclusive)
    pub max_size: u32,
    /// Fixed RNG seed, mainly for tests
    pub seed: Option<u64>,
    /// Stop on its own after this many events
    pub limit: Option<u64>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_micros(100),
            min_size: 64,
            max_size: 1500,
            seed: None,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerReport {
    pub produced: u64,
}

/// Generates synthetic packet events into the queue until stopped.
pub struct Producer {
    queue: Arc<BoundedQueue<WorkItem>>,
    stop: StopSignal,
    clock: MonotonicClock,
    config: ProducerConfig,
}

impl Producer {
    pub fn new(
        queue: Arc<BoundedQueue<WorkItem>>,
        stop: StopSignal,
        clock: MonotonicClock,
        config: ProducerConfig,
    ) -> Self {
        Self {
            queue,
            stop,
            clock,
            config,
        }
    }

    pub fn run(self) -> ProducerReport {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        info!(
            "producer started (sizes {}..={} bytes, interval {:?})",
            self.config.min_size, self.config.max_size, self.config.interval
        );

        let mut produced = 0u64;
        while !self.stop.is_stopped() {
            if self.config.limit.is_some_and(|limit| produced >= limit) {
                debug!("producer reached its event limit");
                break;
            }

            produced += 1;
            let size = rng.random_range(self.config.min_size..=self.config.max_size);
            let event = PacketEvent::new(produced, size, self.clock.now_ns());
            self.queue.enqueue(WorkItem::Packet(event));

            if !self.config.interval.is_zero() {
                std::thread::sleep(self.config.interval);
            }
        }

        info!(produced, "producer stopped");
        ProducerReport { produced }
    }
}
