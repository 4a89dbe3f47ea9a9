//! Proof ingestion runner
//!
//! Drains the proof topic into the proof store. Each delivered message is
//! decoded and inserted once per delivery; the stream itself is
//! at-least-once, so redelivered messages become additional rows.
//!
//! The offset of a message is acknowledged only after its insert succeeded
//! (or it was deliberately skipped), so a crash between the two leads to
//! redelivery rather than loss.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use super::{IngestMonitor, IngestState};
use crate::domain::decode_proof;
use crate::infra::{GatewayError, ProofStore, Result, Retry, RetryConfig, ShutdownSignal};

/// A message delivered by the event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

/// A live subscription to the proof topic
#[async_trait]
pub trait ProofSource: Send {
    /// Wait for the next message; `None` once the stream has ended.
    ///
    /// Must be cancel-safe: dropping the future loses no message.
    async fn recv(&mut self) -> Result<Option<StreamMessage>>;

    /// Mark a message as handled so it is not redelivered.
    async fn ack(&mut self, message: &StreamMessage) -> Result<()>;

    /// Close the subscription.
    async fn close(&mut self);
}

/// Creates subscriptions; used again for every restart.
#[async_trait]
pub trait SourceFactory: Send + Sync {
    async fn subscribe(&self) -> Result<Box<dyn ProofSource>>;
}

/// Ingestion runner configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Acknowledge and skip undecodable messages (true) or stop (false)
    pub skip_malformed: bool,

    /// Retry policy for transient store errors
    pub store_retry: RetryConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            skip_malformed: true,
            store_retry: RetryConfig::database(),
        }
    }
}

impl IngestConfig {
    /// Any decode or store failure terminates the loop, with no retries.
    pub fn strict() -> Self {
        Self {
            skip_malformed: false,
            store_retry: RetryConfig::immediate(0),
        }
    }
}

/// Stream-to-store ingestion loop
pub struct ProofIngestor {
    store: Arc<dyn ProofStore>,
    config: IngestConfig,
    retry: Retry,
    monitor: Arc<IngestMonitor>,
}

impl ProofIngestor {
    pub fn new(store: Arc<dyn ProofStore>, config: IngestConfig) -> Self {
        let retry = Retry::new(config.store_retry.clone());
        Self {
            store,
            config,
            retry,
            monitor: Arc::new(IngestMonitor::new()),
        }
    }

    /// Publish status on an existing monitor
    pub fn with_monitor(mut self, monitor: Arc<IngestMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn monitor(&self) -> Arc<IngestMonitor> {
        self.monitor.clone()
    }

    /// Run until shutdown, end of stream, or an unrecovered failure.
    ///
    /// The subscription is closed on every exit path.
    #[instrument(skip_all)]
    pub async fn run(&self, source: &mut dyn ProofSource, shutdown: &ShutdownSignal) -> Result<()> {
        self.monitor.set_state(IngestState::Running);
        info!("Proof ingestion running");

        let outcome = self.drain(source, shutdown).await;

        self.monitor.set_state(IngestState::Stopping);
        source.close().await;
        self.monitor.set_state(IngestState::Stopped);

        let stats = self.monitor.current().stats;
        match &outcome {
            Ok(()) => info!(
                received = stats.received,
                inserted = stats.inserted,
                skipped = stats.skipped,
                "Proof ingestion stopped"
            ),
            Err(e) => error!(
                error = %e,
                received = stats.received,
                inserted = stats.inserted,
                failed = stats.failed,
                "Proof ingestion terminated"
            ),
        }

        outcome
    }

    async fn drain(&self, source: &mut dyn ProofSource, shutdown: &ShutdownSignal) -> Result<()> {
        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    info!("Shutdown requested, cancelling pending receive");
                    return Ok(());
                }
                received = source.recv() => received?,
            };

            let Some(message) = received else {
                info!("Proof stream ended");
                return Ok(());
            };

            self.monitor.update_stats(|s| s.received += 1);
            if !self.handle_message(&message, shutdown).await? {
                info!(
                    offset = message.offset,
                    "Shutdown requested during insert, leaving message unacknowledged"
                );
                return Ok(());
            }

            source.ack(&message).await?;
            self.monitor
                .update_stats(|s| s.last_offset = Some(message.offset));
        }
    }

    /// Decode and store one message.
    ///
    /// Returns `false` when shutdown interrupted the insert; the message
    /// must not be acknowledged then.
    #[instrument(skip(self, message, shutdown), fields(
        topic = %message.topic,
        partition = message.partition,
        offset = message.offset
    ))]
    async fn handle_message(
        &self,
        message: &StreamMessage,
        shutdown: &ShutdownSignal,
    ) -> Result<bool> {
        let proof = match decode_proof(&message.payload) {
            Ok(proof) => proof,
            Err(e) if self.config.skip_malformed => {
                warn!(error = %e, "Skipping malformed proof message");
                self.monitor.update_stats(|s| s.skipped += 1);
                return Ok(true);
            }
            Err(e) => return Err(e.into()),
        };

        if proof.has_inverted_window() {
            warn!(
                property_id = %proof.property_id,
                start_ts = %proof.start_ts,
                end_ts = %proof.end_ts,
                "Proof window ends before it starts; storing as received"
            );
        }

        // Backoff between retries can run to seconds; shutdown cuts it short
        let result = tokio::select! {
            biased;
            _ = shutdown.wait() => return Ok(false),
            result = self.retry.run_with_predicate(
                "insert_proof",
                || self.store.insert_proof(&proof),
                GatewayError::is_transient,
            ) => result,
        };

        match result.into_result() {
            Ok(record) => {
                debug!(id = record.id, property_id = %record.property_id, "Proof stored");
                self.monitor.update_stats(|s| s.inserted += 1);
                Ok(true)
            }
            Err(e) => {
                self.monitor.update_stats(|s| s.failed += 1);
                Err(e)
            }
        }
    }
}
