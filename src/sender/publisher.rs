use super::error::PublishError;
use super::record::TelemetryRecord;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
#[cfg(unix)]
use tokio::net::unix::pipe;
use tracing::{debug, info, warn};

/// Upper bound on waiting for pipe space before a record is dropped.
const FIFO_WRITE_WAIT: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    pub path: PathBuf,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/tmp/netgate_stats.fifo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Written,
    /// The pipe had no room for the whole record
    Dropped,
}

enum Channel {
    #[cfg(unix)]
    Fifo(pipe::Sender),
    File(File),
}

/// Writes one JSON line per reporting cycle.
///
/// A missing path is created as a named pipe (mode 0666, minus umask) and
/// unlinked again by [`Publisher::close`]. Pipes are written without
/// blocking, so a slow or absent reader costs dropped records, never a
/// stalled reporter. An existing regular file is appended to.
pub struct Publisher {
    path: PathBuf,
    channel: Option<Channel>,
    created_fifo: bool,
    written: u64,
    dropped: u64,
}

impl Publisher {
    pub async fn open(config: &PublisherConfig) -> Result<Self, PublishError> {
        let path = config.path.clone();
        let (channel, created_fifo) =
            open_channel(&path).await.map_err(|source| PublishError::Open {
                path: path.clone(),
                source,
            })?;

        info!(
            "Publication channel opened: {} ({}{})",
            path.display(),
            channel.kind(),
            if created_fifo { ", created" } else { "" }
        );
        Ok(Self {
            path,
            channel: Some(channel),
            created_fifo,
            written: 0,
            dropped: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_fifo(&self) -> bool {
        self.channel.as_ref().is_some_and(Channel::is_fifo)
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub async fn publish(
        &mut self,
        record: &TelemetryRecord,
    ) -> Result<PublishOutcome, PublishError> {
        let line = record.to_json_line()?;
        let channel = self.channel.as_mut().ok_or(PublishError::Closed)?;

        let outcome = match channel {
            #[cfg(unix)]
            Channel::Fifo(sender) => write_fifo(sender, line.as_bytes()).await?,
            Channel::File(file) => {
                file.write_all(line.as_bytes()).await?;
                file.flush().await?;
                PublishOutcome::Written
            }
        };

        match outcome {
            PublishOutcome::Written => self.written += 1,
            PublishOutcome::Dropped => {
                self.dropped += 1;
                debug!(dropped = self.dropped, "Pipe full, record dropped");
            }
        }
        Ok(outcome)
    }

    pub async fn close(&mut self) {
        match self.channel.take() {
            Some(Channel::File(mut file)) => {
                if let Err(e) = file.flush().await {
                    warn!("Failed to flush {}: {}", self.path.display(), e);
                }
            }
            #[cfg(unix)]
            Some(Channel::Fifo(sender)) => {
                drop(sender);
                if self.created_fifo {
                    if let Err(e) = tokio::fs::remove_file(&self.path).await {
                        warn!("Failed to remove pipe {}: {}", self.path.display(), e);
                    }
                }
            }
            None => return,
        }
        info!(
            "Publication channel closed: {} written, {} dropped",
            self.written, self.dropped
        );
    }
}

impl Channel {
    fn is_fifo(&self) -> bool {
        match self {
            #[cfg(unix)]
            Channel::Fifo(_) => true,
            Channel::File(_) => false,
        }
    }

    fn kind(&self) -> &'static str {
        if self.is_fifo() { "fifo" } else { "file" }
    }
}

#[cfg(unix)]
async fn write_fifo(sender: &pipe::Sender, bytes: &[u8]) -> Result<PublishOutcome, PublishError> {
    // Readiness is only known after the reactor has seen the descriptor, so
    // a bare try_write straight after open would report WouldBlock.
    match tokio::time::timeout(FIFO_WRITE_WAIT, sender.writable()).await {
        Ok(ready) => ready?,
        Err(_) => return Ok(PublishOutcome::Dropped),
    }

    match sender.try_write(bytes) {
        Ok(n) if n == bytes.len() => Ok(PublishOutcome::Written),
        Ok(n) => {
            warn!("Partial record written to pipe ({} of {} bytes)", n, bytes.len());
            Ok(PublishOutcome::Dropped)
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(PublishOutcome::Dropped),
        Err(e) => Err(PublishError::Write(e)),
    }
}

/// Opens the channel at `path`, reporting whether a pipe was created for it.
async fn open_channel(path: &Path) -> io::Result<(Channel, bool)> {
    #[cfg(unix)]
    {
        use nix::sys::stat::Mode;
        use std::os::unix::fs::FileTypeExt;

        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.file_type().is_fifo() => {
                return open_fifo(path).map(|channel| (channel, false));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                nix::unistd::mkfifo(path, Mode::from_bits_truncate(0o666))
                    .map_err(io::Error::from)?;
                return match open_fifo(path) {
                    Ok(channel) => Ok((channel, true)),
                    Err(e) => {
                        let _ = tokio::fs::remove_file(path).await;
                        Err(e)
                    }
                };
            }
            Err(e) => return Err(e),
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    Ok((Channel::File(file), false))
}

#[cfg(unix)]
fn open_fifo(path: &Path) -> io::Result<Channel> {
    let mut options = pipe::OpenOptions::new();
    // Holding the read end too keeps the open from failing while no
    // consumer is attached.
    #[cfg(target_os = "linux")]
    options.read_write(true);
    options.open_sender(path).map(Channel::Fifo)
}
