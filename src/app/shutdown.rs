use std::fmt;
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    /// Cancelled from inside the process
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupt => write!(f, "SIGINT"),
            ShutdownReason::Terminate => write!(f, "SIGTERM"),
            ShutdownReason::Requested => write!(f, "shutdown request"),
        }
    }
}

/// Turns SIGINT/SIGTERM into cancellation of a shared token.
#[derive(Debug, Clone)]
pub struct SignalHandler {
    token: CancellationToken,
}

impl SignalHandler {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Wait for a signal or for the token to be cancelled elsewhere, then
    /// make sure the token is cancelled.
    pub async fn wait(&self) -> ShutdownReason {
        let reason = tokio::select! {
            () = self.token.cancelled() => ShutdownReason::Requested,
            reason = wait_for_signal() => reason,
        };
        if reason != ShutdownReason::Requested {
            info!("Received {}, initiating graceful shutdown", reason);
        }
        self.token.cancel();
        reason
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> ShutdownReason {
    let mut sigterm = match unix_signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        reason = wait_for_ctrl_c() => reason,
        _ = sigterm.recv() => ShutdownReason::Terminate,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> ShutdownReason {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> ShutdownReason {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for SIGINT: {}", e);
        // Without a handler only an internal request can stop us.
        std::future::pending::<()>().await;
    }
    ShutdownReason::Interrupt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_internal_cancel_ends_wait() {
        let token = CancellationToken::new();
        let handler = SignalHandler::new(token.clone());

        let waiter = tokio::spawn(async move { handler.wait().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        assert_eq!(waiter.await.unwrap(), ShutdownReason::Requested);
    }
}
