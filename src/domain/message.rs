//! Stream payload contract for proof messages.
//!
//! Each message on the proof topic is a JSON object:
//!
//! ```json
//! {"property_id": "P1", "start_ts": 1704067200, "end_ts": 1704070800,
//!  "verdict": "pass", "cert_hash": "ab12...", "trace_hash": "cd34..."}
//! ```
//!
//! Timestamps are epoch seconds, integer or fractional, kept to the
//! microsecond. Unknown keys are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use thiserror::Error;

use super::NewProof;

/// Errors produced while decoding a stream payload.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The message carried no payload at all
    #[error("empty payload")]
    EmptyPayload,

    /// Payload is not a JSON object with the required keys
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Epoch seconds outside the representable timestamp range
    #[error("{field} is not a valid epoch timestamp: {value}")]
    InvalidTimestamp { field: &'static str, value: String },
}

/// A proof message as published by the proof engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofMessage {
    pub property_id: String,
    pub start_ts: Number,
    pub end_ts: Number,
    pub verdict: String,
    pub cert_hash: String,
    pub trace_hash: String,
}

impl ProofMessage {
    /// Parse a raw payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }
        Ok(serde_json::from_slice(payload)?)
    }

    /// Convert into a storable proof, resolving epoch seconds to UTC.
    pub fn into_new_proof(self) -> Result<NewProof, DecodeError> {
        let start_ts = epoch_to_utc("start_ts", &self.start_ts)?;
        let end_ts = epoch_to_utc("end_ts", &self.end_ts)?;

        Ok(NewProof {
            property_id: self.property_id,
            start_ts,
            end_ts,
            verdict: self.verdict,
            cert_hash: self.cert_hash,
            trace_hash: self.trace_hash,
        })
    }
}

/// Decode a raw stream payload straight into a storable proof.
pub fn decode_proof(payload: &[u8]) -> Result<NewProof, DecodeError> {
    ProofMessage::from_slice(payload)?.into_new_proof()
}

/// 4714-11-24 BC 00:00 UTC, the earliest instant `TIMESTAMPTZ` stores.
const MIN_EPOCH_SECS: i64 = -210_866_803_200;

fn epoch_to_utc(field: &'static str, value: &Number) -> Result<DateTime<Utc>, DecodeError> {
    let invalid = || DecodeError::InvalidTimestamp {
        field,
        value: value.to_string(),
    };

    let (whole, micros) = if let Some(secs) = value.as_i64() {
        (secs, 0)
    } else {
        let secs = value.as_f64().filter(|v| v.is_finite()).ok_or_else(invalid)?;
        let whole = secs.floor();
        if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
            return Err(invalid());
        }
        let micros = ((secs - whole) * 1_000_000.0).round() as u32;
        if micros >= 1_000_000 {
            (whole as i64 + 1, 0)
        } else {
            (whole as i64, micros)
        }
    };

    if whole < MIN_EPOCH_SECS {
        return Err(invalid());
    }

    DateTime::<Utc>::from_timestamp(whole, micros * 1_000).ok_or_else(invalid)
}
