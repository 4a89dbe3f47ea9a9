//! PostgreSQL proof store
//!
//! Append-only storage for proof records ingested from the proof topic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, FromRow};
use tracing::{debug, instrument};

use crate::domain::{NewProof, ProofFilter, ProofRecord};
use crate::infra::{ProofStore, Result};

const CREATE_PROOFS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS proofs (
    id          BIGSERIAL PRIMARY KEY,
    property_id TEXT NOT NULL,
    start_ts    TIMESTAMPTZ NOT NULL,
    end_ts      TIMESTAMPTZ NOT NULL,
    verdict     TEXT NOT NULL,
    cert_hash   TEXT NOT NULL,
    trace_hash  TEXT NOT NULL
)
"#;

const CREATE_PROOFS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS proofs_property_start_idx
    ON proofs (property_id, start_ts)
"#;

/// PostgreSQL-based proof store
#[derive(Clone)]
pub struct PgProofStore {
    pool: PgPool,
}

impl PgProofStore {
    /// Create a new PostgreSQL proof store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create from connection string
    pub async fn from_url(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProofStore for PgProofStore {
    #[instrument(skip(self))]
    async fn ensure_schema(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(CREATE_PROOFS_TABLE).execute(&mut *tx).await?;
        sqlx::query(CREATE_PROOFS_INDEX).execute(&mut *tx).await?;
        tx.commit().await?;

        debug!("Proof schema ensured");
        Ok(())
    }

    #[instrument(skip(self, proof), fields(property_id = %proof.property_id))]
    async fn insert_proof(&self, proof: &NewProof) -> Result<ProofRecord> {
        let proof = proof.clone().at_store_precision();

        // id is cast so tables created with SERIAL by earlier deployments still decode
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO proofs (property_id, start_ts, end_ts, verdict, cert_hash, trace_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id::BIGINT
            "#,
        )
        .bind(&proof.property_id)
        .bind(proof.start_ts)
        .bind(proof.end_ts)
        .bind(&proof.verdict)
        .bind(&proof.cert_hash)
        .bind(&proof.trace_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(proof.into_record(id))
    }

    #[instrument(skip(self))]
    async fn query_proofs(&self, filter: &ProofFilter) -> Result<Vec<ProofRecord>> {
        let rows = sqlx::query_as::<_, ProofRow>(
            r#"
            SELECT id::BIGINT AS id, property_id, start_ts, end_ts,
                   verdict, cert_hash, trace_hash
            FROM proofs
            WHERE ($1::TEXT IS NULL OR property_id = $1)
              AND ($2::TIMESTAMPTZ IS NULL OR start_ts >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR end_ts <= $3)
            ORDER BY start_ts ASC, id ASC
            "#,
        )
        .bind(filter.property_id.as_deref())
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Proofs queried");
        Ok(rows.into_iter().map(ProofRecord::from).collect())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct ProofRow {
    id: i64,
    property_id: String,
    start_ts: DateTime<Utc>,
    end_ts: DateTime<Utc>,
    verdict: String,
    cert_hash: String,
    trace_hash: String,
}

impl From<ProofRow> for ProofRecord {
    fn from(row: ProofRow) -> Self {
        ProofRecord {
            id: row.id,
            property_id: row.property_id,
            start_ts: row.start_ts,
            end_ts: row.end_ts,
            verdict: row.verdict,
            cert_hash: row.cert_hash,
            trace_hash: row.trace_hash,
        }
    }
}
