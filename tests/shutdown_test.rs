use netgate_telemetry::buffer::BoundedQueue;
use netgate_telemetry::domain::{PacketEvent, WorkItem};
use netgate_telemetry::pipeline::{
    ExitReason, Pipeline, PipelineConfig, ProducerConfig, StopSignal, Worker, WorkerState,
    deliver_sentinels,
};
use netgate_telemetry::stats::{AggregatorConfig, StatsAggregator};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_parked_workers_stop_on_sentinels() {
    let queue = Arc::new(BoundedQueue::new(16).unwrap());
    let aggregator = Arc::new(StatsAggregator::new(AggregatorConfig::default()).unwrap());
    let stop = StopSignal::new();

    let workers: Vec<_> = (0..3)
        .map(|id| {
            let worker = Worker::new(id, queue.clone(), aggregator.clone(), stop.clone(), 0);
            thread::spawn(move || worker.run())
        })
        .collect();

    for id in 1..=30 {
        queue.enqueue(WorkItem::Packet(PacketEvent::new(id, 100, id)));
    }
    while !queue.is_empty() {
        thread::sleep(Duration::from_millis(1));
    }
    // Let the workers park on the empty queue.
    thread::sleep(Duration::from_millis(50));

    stop.request_stop();
    let delivered = deliver_sentinels(&queue, &workers, Duration::from_millis(1));
    assert_eq!(delivered, 3);

    let reports: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert!(reports.iter().all(|r| r.state == WorkerState::Stopped));
    assert!(reports.iter().all(|r| r.exit_reason == ExitReason::Sentinel));

    // Every packet processed exactly once.
    let processed: u64 = reports.iter().map(|r| r.processed).sum();
    assert_eq!(processed, 30);
    assert_eq!(aggregator.snapshot(None).total_packets, 30);
    assert!(queue.is_empty());
}

#[test]
fn test_shutdown_with_blocked_producer() {
    // A tiny queue and slow workers keep the producer blocked on `enqueue`.
    let config = PipelineConfig {
        queue_capacity: 2,
        workers: 2,
        work_spin: 200_000,
        producer: ProducerConfig {
            interval: Duration::ZERO,
            seed: Some(3),
            ..ProducerConfig::default()
        },
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config).unwrap();
    let running = pipeline.start().unwrap();
    thread::sleep(Duration::from_millis(50));

    let report = running.shutdown();

    assert_eq!(report.panicked_threads, 0);
    assert_eq!(report.workers.len(), 2);
    assert!(report.workers.iter().all(|w| w.state == WorkerState::Stopped));
    let produced = report.produced.unwrap();
    assert!(produced > 0);
    // Nothing is processed twice and nothing is invented.
    assert!(report.processed() + report.discarded as u64 <= produced);
    assert_eq!(
        pipeline.aggregator().snapshot(None).total_packets,
        report.processed()
    );
}

#[test]
fn test_shutdown_when_workers_left_through_the_flag() {
    let config = PipelineConfig {
        queue_capacity: 1,
        workers: 4,
        work_spin: 0,
        producer: ProducerConfig {
            interval: Duration::from_micros(10),
            ..ProducerConfig::default()
        },
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config).unwrap();
    let running = pipeline.start().unwrap();
    thread::sleep(Duration::from_millis(20));

    let report = running.shutdown();
    assert_eq!(report.workers.len(), 4);
    assert!(report.sentinels_delivered <= 4);
    assert!(report.workers.iter().all(|w| w.state == WorkerState::Stopped));
}

#[test]
fn test_dropped_pipeline_stops_its_threads() {
    let config = PipelineConfig {
        queue_capacity: 4,
        workers: 3,
        work_spin: 1_000,
        producer: ProducerConfig {
            interval: Duration::ZERO,
            seed: Some(11),
            ..ProducerConfig::default()
        },
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config).unwrap();
    let running = pipeline.start().unwrap();
    thread::sleep(Duration::from_millis(20));

    drop(running);

    assert!(pipeline.stop_signal().is_stopped());
    let after_drop = pipeline.aggregator().snapshot(None).total_packets;
    assert!(after_drop > 0);
    thread::sleep(Duration::from_millis(50));
    // Every thread was joined, so nothing records or produces any more.
    assert_eq!(pipeline.aggregator().snapshot(None).total_packets, after_drop);
    assert!(pipeline.queue().len() <= 3);
}
