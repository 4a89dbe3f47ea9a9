//! HTTP server bootstrap for the proof gateway.
//!
//! This module wires together:
//! - configuration
//! - database connection pool and proof table
//! - the supervised ingestion task
//! - the Axum router (GraphQL, REST, health)

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::handlers::{health_check, readiness_check};
use crate::api::{create_schema, ProofSchema};
use crate::config::Config;
use crate::infra::{
    serve_with_shutdown, shutdown_signal, GracefulShutdownConfig, PgProofStore, ProofStore,
    RetryConfig, ShutdownCoordinator,
};
use crate::ingest::{IngestConfig, IngestMonitor, IngestSupervisor, ProofIngestor, SourceFactory};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProofStore>,
    pub schema: ProofSchema,
    pub ingest: Arc<IngestMonitor>,
}

impl AppState {
    pub fn new(store: Arc<dyn ProofStore>, ingest: Arc<IngestMonitor>) -> Self {
        let schema = create_schema(store.clone());
        Self {
            store,
            schema,
            ingest,
        }
    }
}

/// Start the gateway: store, ingestion and HTTP server.
///
/// Returns after a shutdown signal once HTTP has drained, ingestion has
/// stopped and the pool is closed.
pub async fn run(config: Config, factory: Arc<dyn SourceFactory>) -> anyhow::Result<()> {
    info!("Starting proof gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("  Listen address: {}", config.listen_addr);
    info!("  Max connections: {}", config.max_connections);
    info!("  Proof topic: {}", config.kafka.topic);

    // Connect to PostgreSQL
    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to PostgreSQL");

    let pg_store = PgProofStore::new(pool.clone());
    pg_store.ensure_schema().await?;
    info!("Proof table ready");
    let store: Arc<dyn ProofStore> = Arc::new(pg_store);

    // Ingestion
    let monitor = Arc::new(IngestMonitor::new());
    let ingest_config = IngestConfig {
        skip_malformed: config.ingest_skip_malformed,
        ..IngestConfig::default()
    };
    let ingestor =
        Arc::new(ProofIngestor::new(store.clone(), ingest_config).with_monitor(monitor.clone()));

    let coordinator = Arc::new(ShutdownCoordinator::new());
    let ingest_task = IngestSupervisor::new(ingestor, factory)
        .with_restart_policy(RetryConfig::restart().with_max_retries(config.ingest_max_restarts))
        .start(coordinator.signal())
        .await?;

    // HTTP
    let state = AppState::new(store, monitor);
    let app = build_router(state, config.cors_allow_origins.as_deref())?;

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    let signal_coordinator = coordinator.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_coordinator.shutdown();
    });

    info!("Proof gateway is ready to accept connections");
    let served = serve_with_shutdown(
        listener,
        app,
        coordinator.clone(),
        GracefulShutdownConfig::default(),
    )
    .await;

    // The server may also stop on an I/O error; stop ingestion either way.
    coordinator.shutdown();
    if let Err(e) = ingest_task.await {
        error!(error = %e, "Ingestion task panicked");
    }

    pool.close().await;
    info!("Proof gateway stopped");

    served?;
    Ok(())
}

/// Build the full router over `state`.
pub fn build_router(state: AppState, cors_allow_origins: Option<&str>) -> anyhow::Result<Router> {
    let mut router = Router::new()
        .merge(crate::api::graphql_router())
        .nest("/api", crate::api::router())
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .fallback(crate::api::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if let Some(cors_layer) = cors_layer(cors_allow_origins)? {
        router = router.layer(cors_layer);
    }

    Ok(router)
}

fn cors_layer(origins: Option<&str>) -> anyhow::Result<Option<CorsLayer>> {
    let origins = match origins.map(str::trim) {
        Some(origins) if !origins.is_empty() => origins,
        _ => return Ok(None),
    };

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
    ))
}
