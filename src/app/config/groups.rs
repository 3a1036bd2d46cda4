use super::Config;
use crate::pipeline::{PipelineConfig, ProducerConfig};
use crate::sender::{MetricsConfig, PublisherConfig, SinkConfig};
use crate::stats::{AggregatorConfig, DelayPredictor};
use std::time::Duration;

impl Config {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            queue_capacity: self.queue_capacity,
            workers: self.workers,
            work_spin: self.work_spin,
            producer: ProducerConfig {
                interval: Duration::from_micros(self.producer_interval_us),
                min_size: self.min_packet_size,
                max_size: self.max_packet_size,
                seed: self.seed,
                limit: self.packet_limit,
            },
            aggregator: AggregatorConfig {
                bucket_width: self.bucket_width,
                bucket_count: self.bucket_count,
            },
            ..PipelineConfig::default()
        }
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            enabled: !self.disable_sink,
            address: self.sink_address.clone(),
            connect_timeout: Duration::from_millis(self.sink_connect_timeout_ms),
            reply_timeout: Duration::from_millis(self.sink_reply_timeout_ms),
            reconnect_interval: (self.sink_reconnect_secs > 0)
                .then(|| Duration::from_secs(self.sink_reconnect_secs)),
            procedure: self.sink_procedure.clone(),
        }
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            path: self.publish_path.clone(),
        }
    }

    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            enabled: self.enable_metrics,
            export_port: self.metrics_port,
        }
    }

    pub fn delay_predictor(&self) -> DelayPredictor {
        DelayPredictor::new(self.delay_model)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}
