//! In-memory proof store for development and tests

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{NewProof, ProofFilter, ProofRecord};
use crate::infra::{ProofStore, Result};

/// In-memory implementation of ProofStore
///
/// Same filter and ordering semantics as [`PgProofStore`](super::PgProofStore).
pub struct InMemoryProofStore {
    proofs: RwLock<Vec<ProofRecord>>,
}

impl InMemoryProofStore {
    pub fn new() -> Self {
        Self {
            proofs: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored proofs
    pub async fn len(&self) -> usize {
        self.proofs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.proofs.read().await.is_empty()
    }
}

impl Default for InMemoryProofStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProofStore for InMemoryProofStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_proof(&self, proof: &NewProof) -> Result<ProofRecord> {
        let mut proofs = self.proofs.write().await;
        let id = proofs.last().map(|p| p.id + 1).unwrap_or(1);
        let record = proof.clone().at_store_precision().into_record(id);
        proofs.push(record.clone());
        Ok(record)
    }

    async fn query_proofs(&self, filter: &ProofFilter) -> Result<Vec<ProofRecord>> {
        let proofs = self.proofs.read().await;
        let mut matched: Vec<ProofRecord> = proofs
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.start_ts.cmp(&b.start_ts).then(a.id.cmp(&b.id)));
        Ok(matched)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
