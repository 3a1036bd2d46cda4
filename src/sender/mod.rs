//! Outbound collaborators fed once per reporting cycle.

pub mod error;
pub mod metrics;
pub mod publisher;
pub mod record;
pub mod remote;

pub use error::{MetricsError, PublishError, SinkError};
pub use metrics::MetricsConfig;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use publisher::{PublishOutcome, Publisher, PublisherConfig};
pub use record::{SinkStatus, TelemetryRecord};
pub use remote::{RemoteSink, SinkConfig, console_command};
