//! REST rendition of the proof query.

use axum::extract::{Query, State};
use axum::Json;
use tracing::instrument;

use crate::api::error::ApiError;
use crate::api::query::{resolve_proofs, Proof, ProofQuery};
use crate::server::AppState;

/// GET /api/v1/proofs?propertyId=&from=&to= - List proofs.
#[instrument(skip(state))]
pub async fn list_proofs(
    State(state): State<AppState>,
    Query(query): Query<ProofQuery>,
) -> Result<Json<Vec<Proof>>, ApiError> {
    let proofs = resolve_proofs(state.store.as_ref(), query).await?;
    Ok(Json(proofs))
}
