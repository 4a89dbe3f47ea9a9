//! API layer for the proof gateway
//!
//! One read operation, `proofs`, served over GraphQL and REST.

pub mod error;
pub mod handlers;
pub mod query;
mod rest;

pub use error::{ApiError, ErrorCode};
pub use handlers::{create_schema, GqlProof, ProofSchema, QueryRoot};
pub use query::{parse_timestamp, resolve_proofs, Proof, ProofQuery};
pub use rest::*;
