//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use proof_gateway::NewProof;

/// UTC midnight of the given day
pub fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// A proof over `[start, end]`
pub fn new_proof(property_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> NewProof {
    NewProof {
        property_id: property_id.to_string(),
        start_ts: start,
        end_ts: end,
        verdict: "PASS".to_string(),
        cert_hash: format!("cert-{property_id}-{}", start.timestamp()),
        trace_hash: format!("trace-{property_id}-{}", start.timestamp()),
    }
}

/// The stream payload for a proof, timestamps as epoch seconds
pub fn proof_payload(proof: &NewProof) -> serde_json::Value {
    json!({
        "property_id": proof.property_id,
        "start_ts": proof.start_ts.timestamp(),
        "end_ts": proof.end_ts.timestamp(),
        "verdict": proof.verdict,
        "cert_hash": proof.cert_hash,
        "trace_hash": proof.trace_hash,
    })
}

/// The P1/P2 fixture: P1 in early January, P2 in early February 2024
pub fn scenario_proofs() -> Vec<NewProof> {
    vec![
        new_proof("P1", day(2024, 1, 1), day(2024, 1, 2)),
        new_proof("P2", day(2024, 2, 1), day(2024, 2, 2)),
    ]
}

/// Send a request through the router and collect the body
pub async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec();
    (status, headers, bytes)
}

/// POST a GraphQL query and parse the response
pub async fn graphql(app: &axum::Router, query: &str) -> serde_json::Value {
    let request = Request::builder()
        .method("POST")
        .uri("/graphql")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({ "query": query })).unwrap(),
        ))
        .unwrap();
    let (status, _, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

/// GET a path and parse the JSON body
pub async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, headers, body) = send(app, request).await;
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, headers, json)
}
