//! REST and GraphQL route table.

use axum::routing::get;
use axum::Router;

use crate::api::error::{ApiError, ErrorCode};
use crate::api::handlers::{graphiql_handler, graphql_handler, list_proofs};
use crate::server::AppState;

/// Routes nested under `/api`.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/proofs", get(list_proofs))
}

/// GraphQL endpoint: POST executes, GET serves GraphiQL.
pub fn graphql_router() -> Router<AppState> {
    Router::new().route("/graphql", get(graphiql_handler).post(graphql_handler))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::new(ErrorCode::ResourceNotFound, "No such route")
}
