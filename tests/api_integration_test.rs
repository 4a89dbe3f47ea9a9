//! End-to-end tests over the in-memory store.
//!
//! Proofs enter through a channel topic and the ingestion loop, then are
//! read back through the full router (GraphQL, REST, health).

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};

use proof_gateway::infra::{RetryConfig, ShutdownCoordinator};
use proof_gateway::ingest::{
    ChannelTopic, IngestConfig, IngestMonitor, IngestState, IngestSupervisor, ProofIngestor,
    SourceFactory,
};
use proof_gateway::server::{build_router, AppState};
use proof_gateway::{InMemoryProofStore, ProofFilter, ProofStore};

use common::*;

/// Ingest the P1/P2 fixture through the stream and return a router over it.
async fn ingested_app() -> (axum::Router, Arc<InMemoryProofStore>) {
    let store = Arc::new(InMemoryProofStore::new());
    let monitor = Arc::new(IngestMonitor::new());
    let ingestor = Arc::new(
        ProofIngestor::new(store.clone(), IngestConfig::default()).with_monitor(monitor.clone()),
    );

    let (publisher, topic) = ChannelTopic::new("sentinel.proofs", 16);
    for proof in scenario_proofs() {
        publisher.publish_json(&proof_payload(&proof)).await.unwrap();
    }
    drop(publisher);

    let coordinator = ShutdownCoordinator::new();
    let handle = IngestSupervisor::new(ingestor, Arc::new(topic))
        .with_restart_policy(RetryConfig::immediate(1))
        .start(coordinator.signal())
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(monitor.state(), IngestState::Stopped);

    let state = AppState::new(store.clone(), monitor);
    (build_router(state, None).unwrap(), store)
}

#[tokio::test]
async fn graphql_round_trip_preserves_content() {
    let (app, _) = ingested_app().await;

    let response = graphql(
        &app,
        "{ proofs { id propertyId startTs endTs verdict certHash traceHash } }",
    )
    .await;

    let proofs = response["data"]["proofs"].as_array().unwrap();
    assert_eq!(proofs.len(), 2);
    assert_eq!(proofs[0]["propertyId"], "P1");
    assert_eq!(proofs[0]["startTs"], "2024-01-01T00:00:00Z");
    assert_eq!(proofs[0]["endTs"], "2024-01-02T00:00:00Z");
    assert_eq!(proofs[0]["verdict"], "PASS");
    assert_eq!(proofs[0]["certHash"], "cert-P1-1704067200");
    assert_eq!(proofs[1]["propertyId"], "P2");
    assert_ne!(proofs[0]["id"], proofs[1]["id"]);
}

#[tokio::test]
async fn graphql_filters_by_property_and_window() {
    let (app, _) = ingested_app().await;

    let by_property = graphql(&app, r#"{ proofs(propertyId: "P1") { propertyId } }"#).await;
    assert_eq!(
        by_property["data"]["proofs"],
        serde_json::json!([{ "propertyId": "P1" }])
    );

    let by_from = graphql(&app, r#"{ proofs(from: "2024-01-15T00:00:00Z") { propertyId } }"#).await;
    assert_eq!(
        by_from["data"]["proofs"],
        serde_json::json!([{ "propertyId": "P2" }])
    );

    let window = graphql(
        &app,
        r#"{ proofs(from: "2024-01-01", to: "2024-01-02T00:00:00Z") { propertyId } }"#,
    )
    .await;
    assert_eq!(
        window["data"]["proofs"],
        serde_json::json!([{ "propertyId": "P1" }])
    );

    let unknown = graphql(&app, r#"{ proofs(propertyId: "P3") { id } }"#).await;
    assert_eq!(unknown["data"]["proofs"], serde_json::json!([]));
}

#[tokio::test]
async fn graphql_rejects_unparseable_dates() {
    let (app, _) = ingested_app().await;

    let response = graphql(&app, r#"{ proofs(to: "next tuesday") { id } }"#).await;

    let errors = response["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["extensions"]["code"], "VALIDATION_ERROR");
    assert_eq!(errors[0]["extensions"]["field"], "to");
}

#[tokio::test]
async fn rest_lists_filtered_proofs() {
    let (app, _) = ingested_app().await;

    let (status, _, body) = get_json(&app, "/api/v1/proofs?propertyId=P2").await;
    assert_eq!(status, StatusCode::OK);
    let proofs = body.as_array().unwrap();
    assert_eq!(proofs.len(), 1);
    assert_eq!(proofs[0]["propertyId"], "P2");
    assert_eq!(proofs[0]["startTs"], "2024-02-01T00:00:00Z");

    let (status, _, body) = get_json(&app, "/api/v1/proofs?propertyId=&from=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn rest_rejects_unparseable_dates() {
    let (app, _) = ingested_app().await;

    let (status, headers, body) = get_json(&app, "/api/v1/proofs?from=garbage").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers.get("x-error-code").unwrap(), "INVALID_FIELD_VALUE");
    assert_eq!(body["error"]["code"], "INVALID_FIELD_VALUE");
    assert_eq!(body["error"]["details"]["field"], "from");
}

#[tokio::test]
async fn duplicate_deliveries_are_stored_twice() {
    let store = Arc::new(InMemoryProofStore::new());
    let ingestor = ProofIngestor::new(store.clone(), IngestConfig::default());
    let (publisher, topic) = ChannelTopic::new("sentinel.proofs", 16);

    let payload = proof_payload(&scenario_proofs()[0]);
    publisher.publish_json(&payload).await.unwrap();
    publisher.publish_json(&payload).await.unwrap();
    drop(publisher);

    let mut source = topic.subscribe().await.unwrap();
    let coordinator = ShutdownCoordinator::new();
    ingestor
        .run(source.as_mut(), &coordinator.signal())
        .await
        .unwrap();

    let stored = store
        .query_proofs(&ProofFilter::all().with_property_id("P1"))
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].content(), stored[1].content());
}

#[tokio::test]
async fn health_and_readiness() {
    let (app, _) = ingested_app().await;

    let (status, _, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "proof-gateway");

    let (status, _, body) = get_json(&app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"]["status"], "healthy");
    assert_eq!(body["ingestion"]["stats"]["inserted"], 2);
}

#[tokio::test]
async fn readiness_fails_once_ingestion_gives_up() {
    let store = Arc::new(InMemoryProofStore::new());
    let monitor = Arc::new(IngestMonitor::new());
    monitor.record_failure("broker unreachable", 5);
    monitor.set_healthy(false);

    let app = build_router(AppState::new(store, monitor), None).unwrap();

    let (status, _, body) = get_json(&app, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["ingestion"]["healthy"], false);
    assert_eq!(body["ingestion"]["last_error"], "broker unreachable");
}

#[tokio::test]
async fn graphiql_and_unknown_routes() {
    let (app, _) = ingested_app().await;

    let request = Request::builder().uri("/graphql").body(Body::empty()).unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("graphiql"));

    let (status, headers, _) = get_json(&app, "/api/v1/events").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers.get("x-error-code").unwrap(), "RESOURCE_NOT_FOUND");
}
