pub mod config;
pub mod logging_system;
pub mod service;
pub mod shutdown;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging};
pub use service::{RunningService, ServiceError, ServiceManager, ServiceReport};
pub use shutdown::{ShutdownReason, SignalHandler};

use anyhow::Context;
use tracing::{error, info};

pub struct App {
    service_manager: ServiceManager,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, ServiceError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::from_args(args)?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, ServiceError> {
        info!("Starting netgate-telemetry v{}", crate::VERSION);
        info!(
            "Configuration: workers={}, queue_capacity={}, report_interval={}ms, publish_path={}, sink={}",
            config.workers,
            config.queue_capacity,
            config.report_interval_ms,
            config.publish_path.display(),
            if config.disable_sink {
                "disabled"
            } else {
                config.sink_address.as_str()
            }
        );
        let service_manager = ServiceManager::new(config)?;
        Ok(Self { service_manager })
    }

    pub fn service_manager(&self) -> &ServiceManager {
        &self.service_manager
    }

    pub async fn run(self) -> Result<ServiceReport, ServiceError> {
        let report = self.service_manager.run().await?;
        info!(
            "netgate-telemetry stopped after {}: produced={:?} processed={} records={}",
            report.reason,
            report.pipeline.produced,
            report.pipeline.processed(),
            report.reporter.published
        );
        Ok(report)
    }
}

pub async fn main() -> anyhow::Result<()> {
    let config = match Config::from_args(std::env::args_os()) {
        Ok(config) => config,
        // --help, --version and usage errors print and exit the clap way.
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e).context("invalid configuration"),
    };

    setup_logging(config.log_level, config.log_format).context("failed to initialize logging")?;

    let app = App::from_config(config).context("failed to set up service")?;
    if let Err(e) = app.run().await {
        error!("netgate-telemetry failed: {}", e);
        return Err(e.into());
    }
    Ok(())
}
