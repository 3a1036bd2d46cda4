#[cfg(feature = "metrics")]
use super::error::MetricsError;
#[cfg(feature = "metrics")]
use super::record::TelemetryRecord;
#[cfg(feature = "metrics")]
use prometheus::{Encoder, Gauge, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::net::SocketAddr;
#[cfg(feature = "metrics")]
use tokio_util::sync::CancellationToken;
#[cfg(feature = "metrics")]
use warp::{Filter, Reply};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub export_port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            export_port: 9090,
        }
    }
}

/// Prometheus gauges mirroring the latest telemetry record.
#[cfg(feature = "metrics")]
#[derive(Clone)]
pub struct MetricsExporter {
    registry: Registry,
    packets: IntGauge,
    bytes: IntGauge,
    avg_size: Gauge,
    min_size: IntGauge,
    max_size: IntGauge,
    pps: Gauge,
    throughput_mbps: Gauge,
    jitter_ns: Gauge,
    queue_depth: IntGauge,
    predicted_delay_ms: Gauge,
    sink_connected: IntGauge,
    histogram: IntGaugeVec,
}

#[cfg(feature = "metrics")]
impl MetricsExporter {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let packets = IntGauge::new("netgate_packets_total", "Packets recorded so far")?;
        let bytes = IntGauge::new("netgate_bytes_total", "Bytes recorded so far")?;
        let avg_size = Gauge::new("netgate_packet_size_avg_bytes", "Mean packet size")?;
        let min_size = IntGauge::new(
            "netgate_packet_size_min_bytes",
            "Smallest packet size, 0 before the first packet",
        )?;
        let max_size = IntGauge::new("netgate_packet_size_max_bytes", "Largest packet size")?;
        let pps = Gauge::new("netgate_packets_per_second", "Packet rate over the last cycle")?;
        let throughput_mbps = Gauge::new(
            "netgate_throughput_mbps",
            "Throughput over the last cycle in megabits per second",
        )?;
        let jitter_ns = Gauge::new("netgate_jitter_nanoseconds", "Mean inter-arrival gap")?;
        let queue_depth = IntGauge::new("netgate_queue_depth", "Events waiting in the queue")?;
        let predicted_delay_ms =
            Gauge::new("netgate_predicted_delay_ms", "Predicted delay in milliseconds")?;
        let sink_connected = IntGauge::new(
            "netgate_sink_connected",
            "1 while the remote sink connection is up",
        )?;
        let histogram = IntGaugeVec::new(
            Opts::new("netgate_packet_size_bucket", "Packets per size bucket"),
            &["bucket"],
        )?;

        registry.register(Box::new(packets.clone()))?;
        registry.register(Box::new(bytes.clone()))?;
        registry.register(Box::new(avg_size.clone()))?;
        registry.register(Box::new(min_size.clone()))?;
        registry.register(Box::new(max_size.clone()))?;
        registry.register(Box::new(pps.clone()))?;
        registry.register(Box::new(throughput_mbps.clone()))?;
        registry.register(Box::new(jitter_ns.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;
        registry.register(Box::new(predicted_delay_ms.clone()))?;
        registry.register(Box::new(sink_connected.clone()))?;
        registry.register(Box::new(histogram.clone()))?;

        Ok(Self {
            registry,
            packets,
            bytes,
            avg_size,
            min_size,
            max_size,
            pps,
            throughput_mbps,
            jitter_ns,
            queue_depth,
            predicted_delay_ms,
            sink_connected,
            histogram,
        })
    }

    pub fn update(&self, record: &TelemetryRecord) {
        self.packets.set(clamp_i64(record.packets));
        self.bytes.set(clamp_i64(record.bytes));
        self.avg_size.set(record.avg_size);
        self.min_size.set(i64::from(record.min_size.unwrap_or(0)));
        self.max_size.set(i64::from(record.max_size));
        self.pps.set(record.pps);
        self.throughput_mbps.set(record.throughput_mbps);
        self.jitter_ns.set(record.jitter_ns);
        self.queue_depth.set(clamp_i64(record.queue_depth as u64));
        self.predicted_delay_ms.set(record.predicted_delay_ms);
        self.sink_connected.set(i64::from(record.sink.is_connected()));
        for (i, &count) in record.histogram.iter().enumerate() {
            self.histogram
                .with_label_values(&[i.to_string().as_str()])
                .set(clamp_i64(count));
        }
    }

    pub fn export(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8_lossy(&buffer).to_string())
    }

    /// Bind `/metrics` and `/health` and serve them until `shutdown` fires.
    /// Returns the bound address; binding failure is a setup error.
    pub fn serve(
        &self,
        port: u16,
        shutdown: CancellationToken,
    ) -> Result<SocketAddr, MetricsError> {
        let exporter = self.clone();
        let metrics = warp::path!("metrics")
            .and(warp::get())
            .map(move || match exporter.export() {
                Ok(text) => {
                    warp::reply::with_header(text, "content-type", "text/plain; version=0.0.4")
                        .into_response()
                }
                Err(_) => warp::reply::with_status(
                    "Internal Server Error",
                    warp::http::StatusCode::INTERNAL_SERVER_ERROR,
                )
                .into_response(),
            });
        let health = warp::path!("health").and(warp::get()).map(|| "OK");
        let routes = metrics.or(health);

        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
                shutdown.cancelled().await;
            })
            .map_err(|e| MetricsError::Server(e.to_string()))?;

        tokio::spawn(server);
        tracing::info!("Prometheus metrics server listening on {}", addr);
        Ok(addr)
    }
}

#[cfg(feature = "metrics")]
fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
