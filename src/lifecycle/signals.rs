//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGTERM/SIGINT (Ctrl+C)
//! - Translate them into a [`Shutdown`] trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Signals only request a stop; teardown still runs through the orchestrator

use std::future::Future;

use tokio::signal;
use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Which signal ended the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    CtrlC,
    Terminate,
}

/// Wait for the first termination signal.
pub async fn wait_for_shutdown() -> std::io::Result<ShutdownSignal> {
    let received = tokio::select! {
        result = wait_ctrl_c() => result?,
        result = wait_sigterm() => result?,
    };

    tracing::info!(signal = ?received, "Shutdown signal received");
    Ok(received)
}

/// Spawn a task that triggers `shutdown` on the first termination signal.
///
/// If signal handlers cannot be installed the task falls back to Ctrl+C only.
/// If that fails too, the task never triggers and exits once `shutdown` is
/// triggered elsewhere.
pub fn trigger_on_signal(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(trigger_when(shutdown, async {
        if let Err(e) = wait_for_shutdown().await {
            tracing::warn!(error = %e, "Signal listener failed; falling back to Ctrl+C");
            signal::ctrl_c().await?;
        }
        Ok::<(), std::io::Error>(())
    }))
}

async fn trigger_when<F>(shutdown: Shutdown, received: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = received => match result {
            Ok(()) => shutdown.trigger(),
            Err(e) => {
                tracing::error!(error = %e, "No signal handler installed; waiting for an explicit shutdown");
                shutdown.triggered().await;
            }
        },
        _ = shutdown.triggered() => {}
    }
}

async fn wait_ctrl_c() -> std::io::Result<ShutdownSignal> {
    signal::ctrl_c().await.map_err(|e| {
        tracing::error!(error = %e, "Error handling Ctrl+C signal");
        e
    })?;
    Ok(ShutdownSignal::CtrlC)
}

#[cfg(unix)]
async fn wait_sigterm() -> std::io::Result<ShutdownSignal> {
    let mut handler = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
        tracing::error!(error = %e, "Failed to install SIGTERM handler");
        e
    })?;
    handler.recv().await;
    Ok(ShutdownSignal::Terminate)
}

#[cfg(not(unix))]
async fn wait_sigterm() -> std::io::Result<ShutdownSignal> {
    std::future::pending().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_listener_exits_when_already_triggered() {
        let shutdown = Shutdown::new();
        let listener = trigger_on_signal(shutdown.clone());
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), listener)
            .await
            .expect("listener should exit")
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_listener_does_not_trigger() {
        let shutdown = Shutdown::new();
        let listener = tokio::spawn(trigger_when(shutdown.clone(), async {
            Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "no handler"))
        }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!shutdown.is_triggered());
        assert!(!listener.is_finished());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), listener)
            .await
            .expect("listener should exit")
            .unwrap();
    }

    #[tokio::test]
    async fn test_received_signal_triggers() {
        let shutdown = Shutdown::new();
        trigger_when(shutdown.clone(), async { Ok::<(), std::io::Error>(()) }).await;
        assert!(shutdown.is_triggered());
    }
}
