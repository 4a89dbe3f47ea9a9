//! Proof Gateway Library
//!
//! Ingests verification proofs from an event stream into PostgreSQL and
//! serves them back over GraphQL and REST, filtered by property and time
//! window.
//!
//! ## Modules
//!
//! - [`domain`] - Proof records, filters and the stream payload format
//! - [`infra`] - Proof stores (PostgreSQL, in-memory), retry, shutdown
//! - [`ingest`] - Stream-to-store ingestion loop and its supervisor
//! - [`api`] - The `proofs` query over GraphQL and REST
//! - [`config`] - Environment configuration
//! - [`telemetry`] - Structured logging
//! - [`server`] - Process wiring

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
pub mod ingest;
pub mod server;
pub mod telemetry;

// Re-export commonly used types
pub use domain::{decode_proof, DecodeError, NewProof, ProofFilter, ProofRecord};

pub use infra::{GatewayError, InMemoryProofStore, PgProofStore, ProofStore, Result};
