//! Graceful shutdown handling
//!
//! - Signal handling (SIGTERM, SIGINT)
//! - A cloneable shutdown signal for background tasks (ingestion)
//! - Axum serving that stops accepting requests on shutdown

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Shutdown signal that can be cloned and shared
///
/// Dropping the owning coordinator counts as shutdown.
#[derive(Clone)]
pub struct ShutdownSignal {
    watch_rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Check if shutdown has been initiated
    pub fn is_shutdown(&self) -> bool {
        *self.watch_rx.borrow()
    }

    /// Wait for shutdown; returns immediately if already initiated
    pub async fn wait(&self) {
        let mut rx = self.watch_rx.clone();
        let _ = rx.wait_for(|down| *down).await;
    }
}

/// Owns the shutdown state for the process
pub struct ShutdownCoordinator {
    watch_tx: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(false);
        Self { watch_tx }
    }

    /// Get a shutdown signal that can be cloned
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            watch_rx: self.watch_tx.subscribe(),
        }
    }

    /// Initiate shutdown; idempotent
    pub fn shutdown(&self) {
        let initiated = self.watch_tx.send_if_modified(|down| {
            if *down {
                false
            } else {
                *down = true;
                true
            }
        });
        if initiated {
            info!("Initiating graceful shutdown...");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.watch_tx.borrow()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete when the process receives Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

/// Configuration for graceful shutdown
#[derive(Debug, Clone)]
pub struct GracefulShutdownConfig {
    /// Delay between the signal and closing the listener (load balancer grace)
    pub shutdown_delay: Duration,
}

impl Default for GracefulShutdownConfig {
    fn default() -> Self {
        Self {
            shutdown_delay: Duration::from_secs(1),
        }
    }
}

/// Serve `router` until the coordinator signals shutdown
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve_with_shutdown(
    listener: tokio::net::TcpListener,
    router: axum::Router,
    coordinator: Arc<ShutdownCoordinator>,
    config: GracefulShutdownConfig,
) -> Result<(), std::io::Error> {
    let signal = coordinator.signal();

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            signal.wait().await;
            info!(
                delay_ms = config.shutdown_delay.as_millis() as u64,
                "Shutdown signal received, draining HTTP connections"
            );
            tokio::time::sleep(config.shutdown_delay).await;
        })
        .await
}
