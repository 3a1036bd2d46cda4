//! Producer, workers and reporter wired around one queue and one aggregator.

pub mod error;
pub mod producer;
pub mod reporter;
pub mod shutdown;
pub mod stop;
pub mod worker;

pub use error::PipelineError;
pub use producer::{Producer, ProducerConfig, ProducerReport};
pub use reporter::{Reporter, ReporterReport};
pub use shutdown::deliver_sentinels;
pub use stop::StopSignal;
pub use worker::{ExitReason, Worker, WorkerReport, WorkerState};

use crate::buffer::BoundedQueue;
use crate::domain::{MonotonicClock, WorkItem};
use crate::stats::{AggregatorConfig, StatsAggregator};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    pub workers: usize,
    /// Spin iterations per packet, standing in for real processing work
    pub work_spin: u32,
    pub producer: ProducerConfig,
    pub aggregator: AggregatorConfig,
    /// Pause between sentinel attempts while the queue is full
    pub sentinel_retry: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 5000,
            workers: 3,
            work_spin: 500,
            producer: ProducerConfig::default(),
            aggregator: AggregatorConfig::default(),
            sentinel_retry: Duration::from_millis(1),
        }
    }
}

/// Shared state of one pipeline run.
///
/// Owns the queue, the aggregator and the stop signal; nothing is global, so
/// an aggregator can be exercised without starting any thread.
pub struct Pipeline {
    config: PipelineConfig,
    queue: Arc<BoundedQueue<WorkItem>>,
    aggregator: Arc<StatsAggregator>,
    stop: StopSignal,
    clock: MonotonicClock,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        if config.workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "at least one worker is required".to_string(),
            ));
        }
        if config.producer.min_size > config.producer.max_size {
            return Err(PipelineError::InvalidConfig(format!(
                "min packet size ({}) exceeds max packet size ({})",
                config.producer.min_size, config.producer.max_size
            )));
        }

        let queue = Arc::new(BoundedQueue::new(config.queue_capacity)?);
        let aggregator = Arc::new(StatsAggregator::new(config.aggregator)?);

        Ok(Self {
            config,
            queue,
            aggregator,
            stop: StopSignal::new(),
            clock: MonotonicClock::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<BoundedQueue<WorkItem>> {
        &self.queue
    }

    pub fn aggregator(&self) -> &Arc<StatsAggregator> {
        &self.aggregator
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Spawn the producer and every worker thread.
    pub fn start(&self) -> Result<RunningPipeline, PipelineError> {
        let mut workers = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let worker = Worker::new(
                id,
                self.queue.clone(),
                self.aggregator.clone(),
                self.stop.clone(),
                self.config.work_spin,
            );
            let name = format!("worker-{id}");
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker.run());
            match handle {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    self.abort_spawned(&workers);
                    return Err(PipelineError::Spawn {
                        thread: name,
                        source,
                    });
                }
            }
        }

        let producer = Producer::new(
            self.queue.clone(),
            self.stop.clone(),
            self.clock,
            self.config.producer.clone(),
        );
        let producer = match thread::Builder::new()
            .name("producer".to_string())
            .spawn(move || producer.run())
        {
            Ok(handle) => handle,
            Err(source) => {
                self.abort_spawned(&workers);
                return Err(PipelineError::Spawn {
                    thread: "producer".to_string(),
                    source,
                });
            }
        };

        info!(
            "pipeline started: {} workers, queue capacity {}",
            self.config.workers, self.config.queue_capacity
        );

        Ok(RunningPipeline {
            queue: self.queue.clone(),
            stop: self.stop.clone(),
            sentinel_retry: self.config.sentinel_retry,
            producer: Some(producer),
            workers,
        })
    }

    fn abort_spawned(&self, workers: &[JoinHandle<WorkerReport>]) {
        self.stop.request_stop();
        deliver_sentinels(&self.queue, workers, self.config.sentinel_retry);
    }
}

/// Outcome of a completed shutdown sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// `None` when the producer thread panicked
    pub produced: Option<u64>,
    pub discarded: usize,
    pub sentinels_delivered: usize,
    pub workers: Vec<WorkerReport>,
    pub panicked_threads: usize,
}

impl ShutdownReport {
    pub fn processed(&self) -> u64 {
        self.workers.iter().map(|worker| worker.processed).sum()
    }
}

/// Handles of the running data-plane threads.
///
/// Dropping it without [`RunningPipeline::shutdown`] still runs the stop
/// sequence and joins every thread; only the report is lost.
pub struct RunningPipeline {
    queue: Arc<BoundedQueue<WorkItem>>,
    stop: StopSignal,
    sentinel_retry: Duration,
    /// `None` once the threads have been joined
    producer: Option<JoinHandle<ProducerReport>>,
    workers: Vec<JoinHandle<WorkerReport>>,
}

impl RunningPipeline {
    pub fn is_producer_finished(&self) -> bool {
        self.producer.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the data plane and wait for every thread. Blocking.
    ///
    /// Order matters: raise the stop flag, empty the queue so a producer
    /// blocked on a full queue can return, join the producer, then wake any
    /// worker parked on the now empty queue with one sentinel each.
    pub fn shutdown(mut self) -> ShutdownReport {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> ShutdownReport {
        info!("stopping pipeline");
        self.stop.request_stop();

        let discarded = self.queue.discard_pending();
        if discarded > 0 {
            info!(discarded, "discarded pending packets");
        }

        let mut panicked_threads = 0;
        let produced = match self.producer.take().map(JoinHandle::join) {
            Some(Ok(report)) => Some(report.produced),
            Some(Err(_)) => {
                error!("producer thread panicked");
                panicked_threads += 1;
                None
            }
            None => None,
        };

        // The producer may have pushed one last event after the discard.
        let discarded = discarded + self.queue.discard_pending();

        let workers = std::mem::take(&mut self.workers);
        let sentinels_delivered = deliver_sentinels(&self.queue, &workers, self.sentinel_retry);

        let mut reports = Vec::with_capacity(workers.len());
        for handle in workers {
            match handle.join() {
                Ok(report) => reports.push(report),
                Err(_) => {
                    error!("worker thread panicked");
                    panicked_threads += 1;
                }
            }
        }

        if reports.iter().any(|report| report.state != WorkerState::Stopped) {
            warn!("a worker returned without reaching the stopped state");
        }

        let report = ShutdownReport {
            produced,
            discarded,
            sentinels_delivered,
            workers: reports,
            panicked_threads,
        };
        info!(
            "pipeline stopped: produced={:?} processed={} discarded={} sentinels={}",
            report.produced,
            report.processed(),
            report.discarded,
            report.sentinels_delivered
        );
        report
    }
}

impl Drop for RunningPipeline {
    fn drop(&mut self) {
        if self.producer.is_none() && self.workers.is_empty() {
            return;
        }
        warn!("running pipeline dropped without shutdown, stopping its threads");
        self.stop_and_join();
    }
}
