//! Stream-to-store ingestion
//!
//! `ProofIngestor` drains a `ProofSource` into the proof store and
//! `IngestSupervisor` keeps it running in the background. Sources are
//! Kafka (feature `kafka`) or an in-process channel topic.

mod channel;
#[cfg(feature = "kafka")]
mod kafka;
mod runner;
mod status;
mod supervisor;

pub use channel::{ChannelProofSource, ChannelPublisher, ChannelTopic};
#[cfg(feature = "kafka")]
pub use kafka::{KafkaProofSource, KafkaSourceFactory};
pub use runner::{IngestConfig, ProofIngestor, ProofSource, SourceFactory, StreamMessage};
pub use status::{IngestMonitor, IngestState, IngestStats, IngestStatus};
pub use supervisor::IngestSupervisor;
