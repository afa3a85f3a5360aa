//! Signal handling for graceful shutdown.

use std::io;
use tokio::signal::unix::{SignalKind, signal};

/// Completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C). Fails only if the handlers
/// cannot be installed.
pub async fn shutdown_signal() -> io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
    Ok(())
}
