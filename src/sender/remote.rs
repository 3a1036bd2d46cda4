use super::error::SinkError;
use super::record::SinkStatus;
use crate::stats::Snapshot;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub enabled: bool,
    /// Console endpoint, `host:port`
    pub address: String,
    pub connect_timeout: Duration,
    /// How long to wait for a greeting or reply before moving on
    pub reply_timeout: Duration,
    /// `None` disables reconnect attempts after a failure
    pub reconnect_interval: Option<Duration>,
    /// Remote procedure invoked once per cycle
    pub procedure: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "127.0.0.1:3302".to_string(),
            connect_timeout: Duration::from_secs(1),
            reply_timeout: Duration::from_millis(30),
            reconnect_interval: Some(Duration::from_secs(10)),
            procedure: "push_stats".to_string(),
        }
    }
}

/// Console command pushing one snapshot, newline terminated.
///
/// Arguments: packets, bytes, avg size, min size (0 when absent), max size,
/// pps, throughput in Mbps.
pub fn console_command(procedure: &str, snapshot: &Snapshot) -> String {
    format!(
        "{procedure}({}, {}, {}, {}, {}, {}, {})\n",
        snapshot.total_packets,
        snapshot.total_bytes,
        snapshot.avg_size,
        snapshot.min_size_or_zero(),
        snapshot.max_size,
        snapshot.pps,
        snapshot.throughput_mbps,
    )
}

/// Best-effort pusher speaking a line-oriented console protocol over TCP.
///
/// Never fatal: every failure drops the connection and reports
/// `Disconnected` until a later reconnect succeeds.
pub struct RemoteSink {
    config: SinkConfig,
    stream: Option<TcpStream>,
    last_attempt: Option<Instant>,
    pushed: u64,
    failures: u64,
}

impl RemoteSink {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            stream: None,
            last_attempt: None,
            pushed: 0,
            failures: 0,
        }
    }

    pub fn disabled() -> Self {
        Self::new(SinkConfig {
            enabled: false,
            ..SinkConfig::default()
        })
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn status(&self) -> SinkStatus {
        SinkStatus::from_connected(self.is_connected())
    }

    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Open the console connection and skip the greeting banner.
    pub async fn connect(&mut self) -> Result<(), SinkError> {
        if !self.config.enabled {
            return Err(SinkError::Disabled);
        }
        self.last_attempt = Some(Instant::now());
        self.stream = None;

        let address = self.config.address.clone();
        let mut stream = match timeout(self.config.connect_timeout, TcpStream::connect(&address))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                self.failures += 1;
                return Err(SinkError::Connect { address, source });
            }
            Err(_) => {
                self.failures += 1;
                return Err(SinkError::ConnectTimeout(address));
            }
        };
        let _ = stream.set_nodelay(true);

        drain_reply(&mut stream, self.config.reply_timeout).await?;
        info!("Connected to remote sink at {}", address);
        self.stream = Some(stream);
        Ok(())
    }

    /// Push one snapshot. Reconnects first when disconnected and the
    /// reconnect interval has elapsed.
    pub async fn push(&mut self, snapshot: &Snapshot) -> Result<(), SinkError> {
        if !self.config.enabled {
            return Err(SinkError::Disabled);
        }
        if self.stream.is_none() {
            if !self.reconnect_due() {
                return Err(SinkError::NotConnected);
            }
            debug!("Attempting to reconnect to remote sink");
            self.connect().await?;
        }

        let command = console_command(&self.config.procedure, snapshot);
        let reply_timeout = self.config.reply_timeout;
        let Some(stream) = self.stream.as_mut() else {
            return Err(SinkError::NotConnected);
        };

        let result = match stream.write_all(command.as_bytes()).await {
            Ok(()) => drain_reply(stream, reply_timeout).await,
            Err(e) => Err(SinkError::Io(e)),
        };

        match result {
            Ok(()) => {
                self.pushed += 1;
                Ok(())
            }
            Err(e) => {
                warn!("Remote sink push failed, disconnecting: {}", e);
                self.failures += 1;
                self.stream = None;
                Err(e)
            }
        }
    }

    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Error while closing remote sink connection: {}", e);
            }
            info!("Remote sink connection closed");
        }
    }

    fn reconnect_due(&self) -> bool {
        match (self.config.reconnect_interval, self.last_attempt) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(interval), Some(last)) => last.elapsed() >= interval,
        }
    }
}

/// Read whatever the console sends back within `wait`. Silence is fine,
/// EOF means the peer went away.
async fn drain_reply(stream: &mut TcpStream, wait: Duration) -> Result<(), SinkError> {
    let mut buf = [0u8; 4096];
    match timeout(wait, stream.read(&mut buf)).await {
        Ok(Ok(0)) => Err(SinkError::Closed),
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(SinkError::Io(e)),
        Err(_) => Ok(()),
    }
}
