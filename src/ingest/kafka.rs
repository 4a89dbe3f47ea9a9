//! Kafka proof source (librdkafka `StreamConsumer`)
//!
//! Offsets are stored manually after each handled message and committed
//! by the client's auto-commit timer, so only handled messages are ever
//! committed.
//!
//! Creating a consumer and subscribing are local to librdkafka, so every
//! subscription first fetches topic metadata. An unreachable cluster then
//! fails `subscribe` instead of leaving `recv` waiting forever.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::Message;
use tracing::{debug, info};

use super::{ProofSource, SourceFactory, StreamMessage};
use crate::config::KafkaSettings;
use crate::infra::{GatewayError, Result};

/// Subscribes to the proof topic with a fresh consumer per subscription.
pub struct KafkaSourceFactory {
    settings: KafkaSettings,
}

impl KafkaSourceFactory {
    pub fn new(settings: KafkaSettings) -> Self {
        Self { settings }
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.settings.brokers)
            .set("group.id", &self.settings.group_id)
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", self.settings.auto_offset_reset.as_str());
        config
    }
}

#[async_trait]
impl SourceFactory for KafkaSourceFactory {
    async fn subscribe(&self) -> Result<Box<dyn ProofSource>> {
        let consumer: StreamConsumer = self
            .client_config()
            .create()
            .map_err(|e| GatewayError::Stream(format!("failed to create consumer: {e}")))?;

        // fetch_metadata blocks on the network
        let topic = self.settings.topic.clone();
        let timeout = self.settings.connect_timeout;
        let consumer = tokio::task::spawn_blocking(move || {
            consumer
                .fetch_metadata(Some(&topic), timeout)
                .map(|_| consumer)
        })
        .await
        .map_err(|e| GatewayError::Stream(format!("metadata task failed: {e}")))?
        .map_err(|e| {
            GatewayError::Stream(format!(
                "brokers {} unreachable: {e}",
                self.settings.brokers
            ))
        })?;

        consumer
            .subscribe(&[self.settings.topic.as_str()])
            .map_err(|e| {
                GatewayError::Stream(format!(
                    "failed to subscribe to {}: {e}",
                    self.settings.topic
                ))
            })?;

        info!(
            brokers = %self.settings.brokers,
            topic = %self.settings.topic,
            group_id = %self.settings.group_id,
            "Subscribed to proof topic"
        );

        Ok(Box::new(KafkaProofSource { consumer }))
    }
}

pub struct KafkaProofSource {
    consumer: StreamConsumer,
}

#[async_trait]
impl ProofSource for KafkaProofSource {
    async fn recv(&mut self) -> Result<Option<StreamMessage>> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| GatewayError::Stream(e.to_string()))?;

        Ok(Some(StreamMessage {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            // A tombstone has no payload; it decodes as an empty payload.
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        }))
    }

    async fn ack(&mut self, message: &StreamMessage) -> Result<()> {
        // The stored offset is the next one to consume.
        self.consumer
            .store_offset(&message.topic, message.partition, message.offset + 1)
            .map_err(|e| GatewayError::Stream(format!("failed to store offset: {e}")))
    }

    async fn close(&mut self) {
        // Fails with NoOffset when nothing was stored since the last commit.
        if let Err(e) = self.consumer.commit_consumer_state(CommitMode::Sync) {
            debug!(error = %e, "Final offset commit skipped");
        }
        self.consumer.unsubscribe();
    }
}
