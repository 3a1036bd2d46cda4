use super::{ConfigError, LogFormat, LogLevel};
use crate::stats::DelayModel;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Number of worker threads draining the queue
    #[arg(long, env = "NETGATE_WORKERS", default_value = "3")]
    pub workers: usize,

    /// Capacity of the bounded packet queue
    #[arg(long, env = "NETGATE_QUEUE_CAPACITY", default_value = "5000")]
    pub queue_capacity: usize,

    /// Pause between synthetic packets in microseconds
    #[arg(long, env = "NETGATE_PRODUCER_INTERVAL_US", default_value = "100")]
    pub producer_interval_us: u64,

    /// Smallest synthetic packet size in bytes
    #[arg(long, env = "NETGATE_MIN_PACKET_SIZE", default_value = "64")]
    pub min_packet_size: u32,

    /// Largest synthetic packet size in bytes
    #[arg(long, env = "NETGATE_MAX_PACKET_SIZE", default_value = "1500")]
    pub max_packet_size: u32,

    /// Fixed seed for the packet size generator
    #[arg(long, env = "NETGATE_SEED")]
    pub seed: Option<u64>,

    /// Stop producing after this many packets
    #[arg(long, env = "NETGATE_PACKET_LIMIT")]
    pub packet_limit: Option<u64>,

    /// Spin iterations of synthetic work per packet
    #[arg(long, env = "NETGATE_WORK_SPIN", default_value = "500")]
    pub work_spin: u32,

    /// Width of one histogram bucket in bytes
    #[arg(long, env = "NETGATE_BUCKET_WIDTH", default_value = "200")]
    pub bucket_width: u32,

    /// Number of histogram buckets, the last one is open ended
    #[arg(long, env = "NETGATE_BUCKET_COUNT", default_value = "8")]
    pub bucket_count: usize,

    /// Reporting interval in milliseconds
    #[arg(long, env = "NETGATE_REPORT_INTERVAL_MS", default_value = "1000")]
    pub report_interval_ms: u64,

    /// Where telemetry records are published (named pipe or file)
    #[arg(
        long,
        env = "NETGATE_PUBLISH_PATH",
        default_value = "/tmp/netgate_stats.fifo"
    )]
    pub publish_path: PathBuf,

    /// Do not push snapshots to the remote sink
    #[arg(long, env = "NETGATE_DISABLE_SINK")]
    pub disable_sink: bool,

    /// Remote sink console address
    #[arg(long, env = "NETGATE_SINK_ADDRESS", default_value = "127.0.0.1:3302")]
    pub sink_address: String,

    /// Remote sink connect timeout in milliseconds
    #[arg(long, env = "NETGATE_SINK_CONNECT_TIMEOUT_MS", default_value = "1000")]
    pub sink_connect_timeout_ms: u64,

    /// How long to wait for a console reply in milliseconds
    #[arg(long, env = "NETGATE_SINK_REPLY_TIMEOUT_MS", default_value = "30")]
    pub sink_reply_timeout_ms: u64,

    /// Seconds between reconnect attempts, 0 disables reconnecting
    #[arg(long, env = "NETGATE_SINK_RECONNECT_SECS", default_value = "10")]
    pub sink_reconnect_secs: u64,

    /// Remote procedure receiving the statistics
    #[arg(long, env = "NETGATE_SINK_PROCEDURE", default_value = "push_stats")]
    pub sink_procedure: String,

    /// Delay prediction model
    #[arg(long, env = "NETGATE_DELAY_MODEL", default_value = "linear")]
    pub delay_model: DelayModel,

    /// Enable the Prometheus endpoint
    #[arg(long, env = "NETGATE_ENABLE_METRICS")]
    pub enable_metrics: bool,

    /// Prometheus endpoint port
    #[arg(long, env = "NETGATE_METRICS_PORT", default_value = "9090")]
    pub metrics_port: u16,

    /// Log level
    #[arg(long, env = "NETGATE_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "NETGATE_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Configuration file path (TOML); replaces command line values
    #[arg(long, env = "NETGATE_CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 3,
            queue_capacity: 5000,
            producer_interval_us: 100,
            min_packet_size: 64,
            max_packet_size: 1500,
            seed: None,
            packet_limit: None,
            work_spin: 500,
            bucket_width: 200,
            bucket_count: 8,
            report_interval_ms: 1000,
            publish_path: PathBuf::from("/tmp/netgate_stats.fifo"),
            disable_sink: false,
            sink_address: "127.0.0.1:3302".to_string(),
            sink_connect_timeout_ms: 1000,
            sink_reply_timeout_ms: 30,
            sink_reconnect_secs: 10,
            sink_procedure: "push_stats".to_string(),
            delay_model: DelayModel::Linear,
            enable_metrics: false,
            metrics_port: 9090,
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            config_file: None,
        }
    }
}

impl Config {
    /// Parse command line arguments (with environment fallbacks). When a
    /// config file is named, its contents become the configuration.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::try_parse_from(args)?;
        if let Some(path) = &config.config_file {
            let mut from_file = Config::from_file(path)?;
            from_file.config_file = Some(path.clone());
            return Ok(from_file);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_parser_defaults() {
        let parsed = Config::try_parse_from(["netgate-telemetry"]).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_from_args_overrides() {
        let config = Config::from_args([
            "netgate-telemetry",
            "--workers",
            "5",
            "--queue-capacity",
            "64",
            "--delay-model",
            "simulated",
            "--disable-sink",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(config.workers, 5);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.delay_model, DelayModel::Simulated);
        assert!(config.disable_sink);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_from_args_rejects_invalid_values() {
        let result = Config::from_args(["netgate-telemetry", "--workers", "0"]);
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));

        let result = Config::from_args(["netgate-telemetry", "--workers", "many"]);
        assert!(matches!(result, Err(ConfigError::Cli(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            workers = 2
            report_interval_ms = 250
            delay_model = "simulated"
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.workers, 2);
        assert_eq!(config.report_interval_ms, 250);
        assert_eq!(config.delay_model, DelayModel::Simulated);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.queue_capacity, 5000);
    }

    #[test]
    fn test_config_file_replaces_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netgate.toml");
        std::fs::write(&path, "workers = 7\nbucket_count = 4\n").unwrap();

        let config = Config::from_args([
            "netgate-telemetry",
            "--workers",
            "2",
            "--config-file",
            path.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(config.workers, 7);
        assert_eq!(config.bucket_count, 4);
        assert_eq!(config.config_file.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        assert!(matches!(
            Config::from_toml("workers = \"three\""),
            Err(ConfigError::ParseError(_))
        ));
    }
}
