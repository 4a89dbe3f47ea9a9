//! Trait definitions for proof gateway core services

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{NewProof, ProofFilter, ProofRecord};

use super::Result;

/// Proof store is the only path to persisted proof records.
///
/// Invariant: records are append-only; there is no update or delete.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProofStore: Send + Sync {
    /// Create the proof table if absent.
    ///
    /// Idempotent; called once at startup before any other operation.
    async fn ensure_schema(&self) -> Result<()>;

    /// Append one proof and return it with its store-assigned id.
    ///
    /// Content is not validated. Duplicate content produces a new row.
    async fn insert_proof(&self, proof: &NewProof) -> Result<ProofRecord>;

    /// Return all proofs matching the filter, ascending by `start_ts` then `id`.
    ///
    /// No match yields an empty vector, not an error.
    async fn query_proofs(&self, filter: &ProofFilter) -> Result<Vec<ProofRecord>>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<()>;
}
