//! Proof gateway server binary.

use std::sync::Arc;

use proof_gateway::config::Config;
use proof_gateway::ingest::KafkaSourceFactory;
use proof_gateway::telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(&TelemetryConfig::from_env())?;

    let config = Config::from_env()?;
    let factory = Arc::new(KafkaSourceFactory::new(config.kafka.clone()));

    proof_gateway::server::run(config, factory).await
}
