use super::config::{Config, ConfigError};
use super::shutdown::{ShutdownReason, SignalHandler};
use crate::pipeline::{
    Pipeline, PipelineError, Reporter, ReporterReport, RunningPipeline, ShutdownReport,
};
#[cfg(feature = "metrics")]
use crate::sender::MetricsExporter;
use crate::sender::{MetricsError, PublishError, Publisher, RemoteSink};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] PipelineError),
    #[error("Publication error: {0}")]
    PublishError(#[from] PublishError),
    #[error("Metrics error: {0}")]
    MetricsError(#[from] MetricsError),
    #[error("Task failed: {component}: {details}")]
    TaskFailed { component: String, details: String },
}

/// Everything observed while stopping.
#[derive(Debug, Clone)]
pub struct ServiceReport {
    pub reason: ShutdownReason,
    pub pipeline: ShutdownReport,
    pub reporter: ReporterReport,
}

/// Owns the pipeline and its collaborators for one process lifetime.
pub struct ServiceManager {
    config: Config,
    pipeline: Pipeline,
    shutdown: CancellationToken,
}

impl ServiceManager {
    pub fn new(config: Config) -> Result<Self, ServiceError> {
        config.validate()?;
        let pipeline = Pipeline::new(config.pipeline_config())?;
        Ok(Self {
            config,
            pipeline,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Cancelling this token stops a service started with [`Self::run`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Open the collaborators and start every thread and task.
    ///
    /// The publication channel and the metrics endpoint are required; the
    /// remote sink is not.
    pub async fn start(&self) -> Result<RunningService, ServiceError> {
        let publisher = Publisher::open(&self.config.publisher_config()).await?;

        let sink_config = self.config.sink_config();
        let mut sink = RemoteSink::new(sink_config);
        if sink.config().enabled {
            if let Err(e) = sink.connect().await {
                warn!("Remote sink unavailable, continuing without it: {}", e);
            }
        } else {
            info!("Remote sink disabled");
        }

        let reporter = Reporter::new(
            self.pipeline.aggregator().clone(),
            self.pipeline.queue().clone(),
            self.config.delay_predictor(),
            sink,
            publisher,
            self.config.report_interval(),
        );

        let metrics_cancel = self.shutdown.child_token();
        #[cfg(feature = "metrics")]
        let reporter = {
            let metrics_config = self.config.metrics_config();
            if metrics_config.enabled {
                let exporter = MetricsExporter::new()?;
                exporter.serve(metrics_config.export_port, metrics_cancel.clone())?;
                reporter.with_exporter(exporter)
            } else {
                reporter
            }
        };

        let pipeline = self.pipeline.start()?;

        let reporter_cancel = CancellationToken::new();
        let reporter = tokio::spawn(reporter.run(reporter_cancel.clone()));

        info!("netgate-telemetry started");
        Ok(RunningService {
            pipeline,
            reporter,
            reporter_cancel,
            metrics_cancel,
        })
    }

    /// Start, wait for SIGINT/SIGTERM (or the shutdown token), then stop.
    pub async fn run(&self) -> Result<ServiceReport, ServiceError> {
        let running = self.start().await?;
        let reason = SignalHandler::new(self.shutdown.clone()).wait().await;
        let (pipeline, reporter) = running.stop().await?;
        Ok(ServiceReport {
            reason,
            pipeline,
            reporter,
        })
    }
}

pub struct RunningService {
    pipeline: RunningPipeline,
    reporter: JoinHandle<ReporterReport>,
    reporter_cancel: CancellationToken,
    metrics_cancel: CancellationToken,
}

impl RunningService {
    /// Stop the data plane first, then the reporter, so the last record
    /// still sees live collaborators.
    pub async fn stop(self) -> Result<(ShutdownReport, ReporterReport), ServiceError> {
        let RunningService {
            pipeline,
            reporter,
            reporter_cancel,
            metrics_cancel,
        } = self;

        let pipeline_report = tokio::task::spawn_blocking(move || pipeline.shutdown())
            .await
            .map_err(|e| ServiceError::TaskFailed {
                component: "pipeline shutdown".to_string(),
                details: e.to_string(),
            })?;

        reporter_cancel.cancel();
        let reporter_report = reporter.await.map_err(|e| ServiceError::TaskFailed {
            component: "reporter".to_string(),
            details: e.to_string(),
        })?;

        metrics_cancel.cancel();
        Ok((pipeline_report, reporter_report))
    }
}
