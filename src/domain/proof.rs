//! Proof record types.
//!
//! A proof record is the persisted outcome of a verification run over a
//! property within a time window. Records are append-only: once the store
//! assigns an `id`, nothing in the gateway mutates or deletes them.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A proof that has not been stored yet.
///
/// No content validation happens here; any well-typed value is accepted,
/// including `end_ts < start_ts` and empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProof {
    pub property_id: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub verdict: String,
    pub cert_hash: String,
    pub trace_hash: String,
}

impl NewProof {
    /// Whether the evaluation window runs backwards.
    pub fn has_inverted_window(&self) -> bool {
        self.end_ts < self.start_ts
    }

    /// Round both timestamps to the microsecond, the precision `TIMESTAMPTZ` keeps.
    pub fn at_store_precision(mut self) -> Self {
        self.start_ts = round_to_micros(self.start_ts);
        self.end_ts = round_to_micros(self.end_ts);
        self
    }

    /// Attach the store-assigned identifier.
    pub fn into_record(self, id: i64) -> ProofRecord {
        ProofRecord {
            id,
            property_id: self.property_id,
            start_ts: self.start_ts,
            end_ts: self.end_ts,
            verdict: self.verdict,
            cert_hash: self.cert_hash,
            trace_hash: self.trace_hash,
        }
    }
}

/// Round to the nearest microsecond.
pub fn round_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_round(TimeDelta::microseconds(1)).unwrap_or(ts)
}

/// A stored proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRecord {
    /// Assigned by the store on insert, unique and increasing.
    pub id: i64,
    pub property_id: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub verdict: String,
    pub cert_hash: String,
    pub trace_hash: String,
}

impl ProofRecord {
    /// The record without its identifier, for comparing stored content.
    pub fn content(&self) -> NewProof {
        NewProof {
            property_id: self.property_id.clone(),
            start_ts: self.start_ts,
            end_ts: self.end_ts,
            verdict: self.verdict.clone(),
            cert_hash: self.cert_hash.clone(),
            trace_hash: self.trace_hash.clone(),
        }
    }
}

/// Filter for proof queries.
///
/// Every field is optional; an absent field imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProofFilter {
    /// Exact match on `property_id`.
    pub property_id: Option<String>,
    /// Inclusive lower bound on `start_ts`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `end_ts`.
    pub to: Option<DateTime<Utc>>,
}

impl ProofFilter {
    /// A filter that matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_property_id(mut self, property_id: impl Into<String>) -> Self {
        self.property_id = Some(property_id.into());
        self
    }

    pub fn with_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.property_id.is_none() && self.from.is_none() && self.to.is_none()
    }

    /// Evaluate the filter against a record.
    ///
    /// Mirrors the `WHERE` clause used by the Postgres store.
    pub fn matches(&self, record: &ProofRecord) -> bool {
        if let Some(property_id) = &self.property_id {
            if &record.property_id != property_id {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.start_ts < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.end_ts > to {
                return false;
            }
        }
        true
    }
}
