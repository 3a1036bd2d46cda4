use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Remote sink is disabled")]
    Disabled,
    #[error("Remote sink is not connected")]
    NotConnected,
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Connection to {0} timed out")]
    ConnectTimeout(String),
    #[error("Remote sink closed the connection")]
    Closed,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to open publication channel {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Publication channel is closed")]
    Closed,
    #[error("Write failed: {0}")]
    Write(#[from] std::io::Error),
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum MetricsError {
    #[cfg(feature = "metrics")]
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("Metrics server error: {0}")]
    Server(String),
}
