//! Supervision of the ingestion loop
//!
//! The loop runs as a background task. When it terminates with an error the
//! supervisor waits with exponential backoff, opens a new subscription and
//! runs it again. Once the restart budget is spent ingestion is marked
//! unhealthy, which the readiness probe reports.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{IngestState, ProofIngestor, ProofSource, SourceFactory};
use crate::infra::{Result, RetryConfig, ShutdownSignal};

pub struct IngestSupervisor {
    ingestor: Arc<ProofIngestor>,
    factory: Arc<dyn SourceFactory>,
    restart: RetryConfig,
}

impl IngestSupervisor {
    pub fn new(ingestor: Arc<ProofIngestor>, factory: Arc<dyn SourceFactory>) -> Self {
        Self {
            ingestor,
            factory,
            restart: RetryConfig::restart(),
        }
    }

    /// Backoff between restarts; `max_retries` is the restart budget.
    pub fn with_restart_policy(mut self, restart: RetryConfig) -> Self {
        self.restart = restart;
        self
    }

    /// Subscribe and spawn the supervised loop.
    ///
    /// A failure to subscribe here is returned to the caller; later
    /// subscription failures count against the restart budget.
    pub async fn start(self, shutdown: ShutdownSignal) -> Result<JoinHandle<()>> {
        let monitor = self.ingestor.monitor();
        monitor.set_state(IngestState::Starting);

        let source = match self.factory.subscribe().await {
            Ok(source) => source,
            Err(e) => {
                monitor.record_failure(e.to_string(), 0);
                monitor.set_healthy(false);
                monitor.set_state(IngestState::Stopped);
                return Err(e);
            }
        };

        Ok(tokio::spawn(self.supervise(source, shutdown)))
    }

    async fn supervise(self, mut source: Box<dyn ProofSource>, shutdown: ShutdownSignal) {
        let monitor = self.ingestor.monitor();
        let mut failures: u32 = 0;
        let mut restarts: u32 = 0;

        loop {
            let handled_before = monitor.current().stats.handled();

            let error = match self.ingestor.run(source.as_mut(), &shutdown).await {
                Ok(()) => {
                    info!(restarts, "Ingestion supervisor exiting");
                    return;
                }
                Err(e) => e,
            };

            if monitor.current().stats.handled() > handled_before {
                failures = 0;
            }
            monitor.record_failure(error.to_string(), restarts);

            // Back off and resubscribe until a subscription succeeds.
            source = loop {
                failures += 1;
                if failures > self.restart.max_retries {
                    error!(
                        restarts,
                        max_restarts = self.restart.max_retries,
                        "Proof ingestion failed permanently, giving up"
                    );
                    monitor.set_healthy(false);
                    monitor.set_state(IngestState::Stopped);
                    return;
                }

                let delay = self.restart.delay_for_attempt(failures - 1);
                warn!(
                    attempt = failures,
                    max_restarts = self.restart.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Restarting proof ingestion"
                );

                tokio::select! {
                    biased;
                    _ = shutdown.wait() => {
                        info!("Shutdown during ingestion restart backoff");
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                monitor.set_state(IngestState::Starting);
                match self.factory.subscribe().await {
                    Ok(source) => break source,
                    Err(e) => {
                        warn!(error = %e, "Resubscribe failed");
                        monitor.record_failure(e.to_string(), restarts);
                        monitor.set_state(IngestState::Stopped);
                    }
                }
            };

            restarts += 1;
            monitor.set_restarts(restarts);
        }
    }
}
