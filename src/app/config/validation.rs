use super::{Config, ConfigError};
use crate::buffer::MAX_CAPACITY;

const MAX_WORKERS: usize = 1024;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidConfig(format!(
                "Worker count must be between 1 and {MAX_WORKERS}, got {}",
                self.workers
            )));
        }

        if self.queue_capacity == 0 || self.queue_capacity > MAX_CAPACITY {
            return Err(ConfigError::InvalidConfig(format!(
                "Queue capacity must be between 1 and {MAX_CAPACITY}, got {}",
                self.queue_capacity
            )));
        }

        if self.max_packet_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Max packet size must be greater than 0".to_string(),
            ));
        }
        if self.min_packet_size > self.max_packet_size {
            return Err(ConfigError::InvalidConfig(format!(
                "Min packet size ({}) must not exceed max packet size ({})",
                self.min_packet_size, self.max_packet_size
            )));
        }

        if self.bucket_width == 0 {
            return Err(ConfigError::InvalidConfig(
                "Histogram bucket width must be greater than 0".to_string(),
            ));
        }
        if self.bucket_count == 0 {
            return Err(ConfigError::InvalidConfig(
                "Histogram bucket count must be greater than 0".to_string(),
            ));
        }

        if self.report_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Report interval must be greater than 0".to_string(),
            ));
        }

        if self.publish_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Publish path must not be empty".to_string(),
            ));
        }
        if let Some(parent) = self.publish_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Publish path parent directory does not exist: {}",
                parent.display()
            )));
        }

        if !self.disable_sink {
            self.validate_sink()?;
        }

        if self.enable_metrics && cfg!(not(feature = "metrics")) {
            return Err(ConfigError::InvalidConfig(
                "Metrics endpoint requested but the metrics feature is not compiled in"
                    .to_string(),
            ));
        }

        Ok(())
    }

    fn validate_sink(&self) -> Result<(), ConfigError> {
        let valid_address = self
            .sink_address
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
        if !valid_address {
            return Err(ConfigError::InvalidAddress(format!(
                "Invalid sink address '{}', expected host:port",
                self.sink_address
            )));
        }

        if self.sink_connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Sink connect timeout must be greater than 0".to_string(),
            ));
        }

        // The procedure name is spliced into a console command line.
        let valid_procedure = !self.sink_procedure.is_empty()
            && self
                .sink_procedure
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':'));
        if !valid_procedure {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid sink procedure name: '{}'",
                self.sink_procedure
            )));
        }

        Ok(())
    }
}
