//! Proof query façade
//!
//! `resolve_proofs` is the single read operation behind both transports.
//! It validates the optional arguments, queries the store and maps the
//! records to the public `Proof` shape. GraphQL and REST only adapt
//! arguments in and errors out.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{ProofFilter, ProofRecord};
use crate::infra::{GatewayError, ProofStore, Result};

/// Arguments of the `proofs` query, as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofQuery {
    pub property_id: Option<String>,
    /// ISO-8601 lower bound on `start_ts`
    pub from: Option<String>,
    /// ISO-8601 upper bound on `end_ts`
    pub to: Option<String>,
}

impl ProofQuery {
    /// Validate the arguments into a store filter.
    ///
    /// Absent and empty arguments impose no constraint.
    pub fn into_filter(self) -> Result<ProofFilter> {
        let mut filter = ProofFilter::all();

        if let Some(property_id) = non_empty(self.property_id) {
            filter = filter.with_property_id(property_id);
        }
        if let Some(from) = non_empty(self.from) {
            filter = filter.with_from(parse_timestamp("from", &from)?);
        }
        if let Some(to) = non_empty(self.to) {
            filter = filter.with_to(parse_timestamp("to", &to)?);
        }

        Ok(filter)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Public shape of a stored proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    pub id: String,
    pub property_id: String,
    pub start_ts: String,
    pub end_ts: String,
    pub verdict: String,
    pub cert_hash: String,
    pub trace_hash: String,
}

impl From<ProofRecord> for Proof {
    fn from(record: ProofRecord) -> Self {
        Self {
            id: record.id.to_string(),
            property_id: record.property_id,
            start_ts: format_timestamp(&record.start_ts),
            end_ts: format_timestamp(&record.end_ts),
            verdict: record.verdict,
            cert_hash: record.cert_hash,
            trace_hash: record.trace_hash,
        }
    }
}

/// RFC 3339 in UTC with a `Z` suffix; fractional seconds only when present.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an ISO-8601 date-time argument.
///
/// Accepts RFC 3339 with an offset, a date-time without offset (taken as
/// UTC), or a bare date (midnight UTC). Seconds may be omitted.
pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    // Offsets without seconds, or with a space separator
    let zoned = match value.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => value.to_string(),
    };
    for format in [
        "%Y-%m-%dT%H:%M%#z",
        "%Y-%m-%d %H:%M%#z",
        "%Y-%m-%d %H:%M:%S%.f%#z",
    ] {
        if let Ok(ts) = DateTime::parse_from_str(&zoned, format) {
            return Ok(ts.with_timezone(&Utc));
        }
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(GatewayError::validation(
        field,
        format!("expected an ISO-8601 date-time, got {value:?}"),
    ))
}

/// Resolve the `proofs` query against the store.
#[instrument(skip(store))]
pub async fn resolve_proofs(store: &dyn ProofStore, query: ProofQuery) -> Result<Vec<Proof>> {
    let filter = query.into_filter()?;
    let records = store.query_proofs(&filter).await?;
    debug!(count = records.len(), "Resolved proofs");
    Ok(records.into_iter().map(Proof::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewProof;
    use crate::infra::{InMemoryProofStore, MockProofStore};
    use chrono::TimeZone;

    fn proof(property_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> NewProof {
        NewProof {
            property_id: property_id.to_string(),
            start_ts: start,
            end_ts: end,
            verdict: "pass".to_string(),
            cert_hash: format!("cert-{property_id}"),
            trace_hash: format!("trace-{property_id}"),
        }
    }

    fn query(property_id: Option<&str>, from: Option<&str>, to: Option<&str>) -> ProofQuery {
        ProofQuery {
            property_id: property_id.map(str::to_string),
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        }
    }

    async fn seeded_store() -> InMemoryProofStore {
        let store = InMemoryProofStore::new();
        let jan1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let jan2 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let feb1 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let feb2 = Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap();
        store.insert_proof(&proof("P1", jan1, jan2)).await.unwrap();
        store.insert_proof(&proof("P2", feb1, feb2)).await.unwrap();
        store
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();

        assert_eq!(parse_timestamp("from", "2024-01-15T00:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("from", "2024-01-15T02:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("from", "2024-01-15T00:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("from", "2024-01-15 00:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("from", "2024-01-15").unwrap(), expected);

        let half_past = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("from", "2024-01-15T10:30Z").unwrap(), half_past);
        assert_eq!(parse_timestamp("from", "2024-01-15T10:30").unwrap(), half_past);
        assert_eq!(parse_timestamp("from", "2024-01-15 10:30").unwrap(), half_past);
        assert_eq!(parse_timestamp("from", "2024-01-15T12:30+02:00").unwrap(), half_past);
        assert_eq!(parse_timestamp("from", "2024-01-15 12:30:00+02:00").unwrap(), half_past);

        let fractional = parse_timestamp("to", "2024-01-15T00:00:00.250").unwrap();
        assert_eq!(fractional.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        for bad in ["not-a-date", "2024-13-01", "15/01/2024", "1704067200"] {
            let err = parse_timestamp("from", bad).unwrap_err();
            match err {
                GatewayError::Validation { field, .. } => assert_eq!(field, "from"),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_arguments_impose_no_constraint() {
        let filter = query(Some(""), Some(""), Some("")).into_filter().unwrap();
        assert!(filter.is_empty());
        assert!(ProofQuery::default().into_filter().unwrap().is_empty());
    }

    #[test]
    fn test_public_shape() {
        let record = proof(
            "P1",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap(),
        )
        .into_record(17);

        let public = Proof::from(record);
        assert_eq!(public.id, "17");
        assert_eq!(public.start_ts, "2024-01-01T00:00:00Z");
        assert_eq!(public.end_ts, "2024-01-01T00:01:00Z");

        let json = serde_json::to_value(&public).unwrap();
        assert_eq!(json["propertyId"], "P1");
        assert_eq!(json["certHash"], "cert-P1");
        assert_eq!(json["traceHash"], "trace-P1");
    }

    #[tokio::test]
    async fn test_property_filter_scenario() {
        let store = seeded_store().await;

        let proofs = resolve_proofs(&store, query(Some("P1"), None, None))
            .await
            .unwrap();
        assert_eq!(proofs.len(), 1);
        assert_eq!(proofs[0].property_id, "P1");

        let all = resolve_proofs(&store, ProofQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_from_filter_scenario() {
        let store = seeded_store().await;

        let proofs = resolve_proofs(&store, query(None, Some("2024-01-15T00:00:00Z"), None))
            .await
            .unwrap();
        assert_eq!(proofs.len(), 1);
        assert_eq!(proofs[0].property_id, "P2");

        let proofs = resolve_proofs(&store, query(None, None, Some("2024-01-15T00:00:00Z")))
            .await
            .unwrap();
        assert_eq!(proofs.len(), 1);
        assert_eq!(proofs[0].property_id, "P1");

        let none = resolve_proofs(&store, query(Some("P3"), None, None))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_argument_never_reaches_store() {
        let mut store = MockProofStore::new();
        store.expect_query_proofs().never();

        let err = resolve_proofs(&store, query(None, None, Some("yesterday")))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { ref field, .. } if field == "to"));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockProofStore::new();
        store
            .expect_query_proofs()
            .returning(|_| Err(GatewayError::Database(sqlx::Error::PoolTimedOut)));

        let err = resolve_proofs(&store, ProofQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Database(_)));
    }
}
