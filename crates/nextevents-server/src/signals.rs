//! Shutdown signal handling.
//!
//! SIGTERM and SIGINT (Ctrl+C elsewhere) stop the listener; in-flight
//! requests are allowed to finish.

use tracing::{info, warn};

/// Resolves when the process is asked to stop.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => Some(sigterm),
        Err(e) => {
            warn!("failed to install SIGTERM handler: {}", e);
            None
        }
    };

    tokio::select! {
        _ = ctrl_c() => info!("received SIGINT, shutting down"),
        _ = async {
            match sigterm.as_mut() {
                Some(sigterm) => { sigterm.recv().await; }
                None => std::future::pending::<()>().await,
            }
        } => info!("received SIGTERM, shutting down"),
    }
}

/// Resolves when the process is asked to stop.
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    ctrl_c().await;
    info!("received Ctrl+C, shutting down");
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
