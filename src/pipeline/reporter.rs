use crate::buffer::BoundedQueue;
use crate::domain::WorkItem;
#[cfg(feature = "metrics")]
use crate::sender::MetricsExporter;
use crate::sender::{PublishOutcome, Publisher, RemoteSink, SinkError, TelemetryRecord};
use crate::stats::{DelayPredictor, Snapshot, StatsAggregator};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const HISTOGRAM_BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub struct ReporterReport {
    pub cycles: u64,
    pub published: u64,
    pub dropped: u64,
    pub sink_pushes: u64,
    pub last_snapshot: Snapshot,
}

/// Periodic snapshot loop.
///
/// Each cycle diffs against the previous snapshot, asks the predictor for a
/// delay estimate, pushes to the remote sink, publishes a JSON record and
/// refreshes the exporter. Collaborator failures are logged, never fatal.
pub struct Reporter {
    aggregator: Arc<StatsAggregator>,
    queue: Arc<BoundedQueue<WorkItem>>,
    predictor: DelayPredictor,
    sink: RemoteSink,
    publisher: Publisher,
    interval: Duration,
    #[cfg(feature = "metrics")]
    exporter: Option<MetricsExporter>,
}

impl Reporter {
    pub fn new(
        aggregator: Arc<StatsAggregator>,
        queue: Arc<BoundedQueue<WorkItem>>,
        predictor: DelayPredictor,
        sink: RemoteSink,
        publisher: Publisher,
        interval: Duration,
    ) -> Self {
        Self {
            aggregator,
            queue,
            predictor,
            sink,
            publisher,
            interval,
            #[cfg(feature = "metrics")]
            exporter: None,
        }
    }

    #[cfg(feature = "metrics")]
    pub fn with_exporter(mut self, exporter: MetricsExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Run until `cancel` fires, then close the sink and the publisher.
    pub async fn run(mut self, cancel: CancellationToken) -> ReporterReport {
        info!("reporter started (interval {:?})", self.interval);

        let mut previous = self.aggregator.snapshot(None);
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let (snapshot, _record) = self.report_cycle(&previous).await;
                    previous = snapshot;
                    cycles += 1;
                }
            }
        }

        self.sink.close().await;
        self.publisher.close().await;
        info!(cycles, "reporter stopped");

        ReporterReport {
            cycles,
            published: self.publisher.written(),
            dropped: self.publisher.dropped(),
            sink_pushes: self.sink.pushed(),
            last_snapshot: previous,
        }
    }

    /// One reporting cycle against `previous`.
    pub async fn report_cycle(&mut self, previous: &Snapshot) -> (Snapshot, TelemetryRecord) {
        let snapshot = self.aggregator.snapshot(Some(previous));
        let delay_ms = self
            .predictor
            .predict(snapshot.total_packets, snapshot.total_bytes);

        match self.sink.push(&snapshot).await {
            Ok(()) => {}
            Err(e @ (SinkError::Disabled | SinkError::NotConnected)) => {
                debug!("remote sink skipped: {}", e);
            }
            Err(e) => warn!("remote sink unavailable: {}", e),
        }

        let record = TelemetryRecord::from_snapshot(
            &snapshot,
            self.queue.len(),
            delay_ms,
            self.sink.status(),
        );

        match self.publisher.publish(&record).await {
            Ok(PublishOutcome::Written | PublishOutcome::Dropped) => {}
            Err(e) => warn!("failed to publish telemetry record: {}", e),
        }

        #[cfg(feature = "metrics")]
        if let Some(exporter) = &self.exporter {
            exporter.update(&record);
        }

        info!(
            "pps={:.0} throughput={:.2} Mbps avg={} bytes jitter={:.0} ns delay={:.3} ms",
            snapshot.pps,
            snapshot.throughput_mbps,
            snapshot.avg_size as u64,
            snapshot.jitter_ns,
            delay_ms
        );
        debug!("size histogram:\n{}", snapshot.histogram_bars(HISTOGRAM_BAR_WIDTH));

        (snapshot, record)
    }
}
