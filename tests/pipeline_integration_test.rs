use netgate_telemetry::pipeline::{
    Pipeline, PipelineConfig, PipelineError, ProducerConfig, Reporter, WorkerState,
};
use netgate_telemetry::sender::{Publisher, PublisherConfig, RemoteSink};
use netgate_telemetry::stats::{AggregatorConfig, DelayModel, DelayPredictor};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn limited_config(limit: u64) -> PipelineConfig {
    PipelineConfig {
        queue_capacity: 64,
        workers: 3,
        work_spin: 10,
        producer: ProducerConfig {
            interval: Duration::ZERO,
            min_size: 100,
            max_size: 900,
            seed: Some(42),
            limit: Some(limit),
        },
        aggregator: AggregatorConfig::default(),
        ..PipelineConfig::default()
    }
}

#[test]
fn test_invalid_pipeline_config() {
    let no_workers = PipelineConfig {
        workers: 0,
        ..PipelineConfig::default()
    };
    assert!(matches!(
        Pipeline::new(no_workers),
        Err(PipelineError::InvalidConfig(_))
    ));

    let no_queue = PipelineConfig {
        queue_capacity: 0,
        ..PipelineConfig::default()
    };
    assert!(matches!(Pipeline::new(no_queue), Err(PipelineError::Buffer(_))));

    let bad_histogram = PipelineConfig {
        aggregator: AggregatorConfig {
            bucket_width: 0,
            bucket_count: 8,
        },
        ..PipelineConfig::default()
    };
    assert!(matches!(Pipeline::new(bad_histogram), Err(PipelineError::Stats(_))));
}

#[test]
fn test_limited_run_processes_everything() {
    let pipeline = Pipeline::new(limited_config(2_000)).unwrap();
    let running = pipeline.start().unwrap();

    while !running.is_producer_finished() || !pipeline.queue().is_empty() {
        std::thread::sleep(Duration::from_millis(5));
    }
    // Give the workers time to record the last dequeued packets.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while pipeline.aggregator().snapshot(None).total_packets < 2_000
        && std::time::Instant::now() < deadline
    {
        std::thread::sleep(Duration::from_millis(5));
    }

    let report = running.shutdown();
    assert_eq!(report.produced, Some(2_000));
    assert_eq!(report.discarded, 0);
    assert_eq!(report.processed(), 2_000);
    assert!(report.sentinels_delivered <= 3);
    assert!(report.workers.iter().all(|w| w.state == WorkerState::Stopped));

    let snapshot = pipeline.aggregator().snapshot(None);
    assert_eq!(snapshot.total_packets, 2_000);
    assert!(snapshot.min_size.is_some_and(|min| min >= 100));
    assert!(snapshot.max_size <= 900);
    assert_eq!(snapshot.histogram.iter().sum::<u64>(), 2_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pipeline_with_reporter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("telemetry.jsonl");
    std::fs::write(&path, "").unwrap();

    let pipeline = Pipeline::new(limited_config(500)).unwrap();
    let publisher = Publisher::open(&PublisherConfig { path: path.clone() })
        .await
        .unwrap();
    let reporter = Reporter::new(
        pipeline.aggregator().clone(),
        pipeline.queue().clone(),
        DelayPredictor::new(DelayModel::Simulated),
        RemoteSink::disabled(),
        publisher,
        Duration::from_millis(25),
    );

    let cancel = CancellationToken::new();
    let reporter = tokio::spawn(reporter.run(cancel.clone()));
    let running = pipeline.start().unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let shutdown = tokio::task::spawn_blocking(move || running.shutdown())
        .await
        .unwrap();
    cancel.cancel();
    let report = reporter.await.unwrap();

    assert_eq!(shutdown.produced, Some(500));
    assert!(report.cycles >= 2);
    assert_eq!(report.published, report.cycles);

    let contents = std::fs::read_to_string(&path).unwrap();
    let records: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len() as u64, report.cycles);

    // Cumulative totals never go backwards.
    let packets: Vec<u64> = records
        .iter()
        .map(|r| r["packets"].as_u64().unwrap())
        .collect();
    assert!(packets.windows(2).all(|w| w[0] <= w[1]));
    assert!(records.iter().all(|r| r["sink"] == "disconnected"));
}
