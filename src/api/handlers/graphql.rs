//! GraphQL transport for the proof query
//!
//! Endpoints:
//! - POST /graphql - Execute GraphQL queries
//! - GET /graphql - GraphiQL playground

use std::sync::Arc;

use async_graphql::{
    Context, EmptyMutation, EmptySubscription, ErrorExtensions, Object, Result as GqlResult,
    Schema, SimpleObject, ID,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::api::query::{resolve_proofs, Proof, ProofQuery};
use crate::infra::{GatewayError, ProofStore};
use crate::server::AppState;

// ============================================================================
// GRAPHQL TYPES
// ============================================================================

/// GraphQL representation of a stored proof.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Proof")]
pub struct GqlProof {
    pub id: ID,
    pub property_id: String,
    pub start_ts: String,
    pub end_ts: String,
    pub verdict: String,
    pub cert_hash: String,
    pub trace_hash: String,
}

impl From<Proof> for GqlProof {
    fn from(proof: Proof) -> Self {
        Self {
            id: ID(proof.id),
            property_id: proof.property_id,
            start_ts: proof.start_ts,
            end_ts: proof.end_ts,
            verdict: proof.verdict,
            cert_hash: proof.cert_hash,
            trace_hash: proof.trace_hash,
        }
    }
}

impl ErrorExtensions for GatewayError {
    fn extend(&self) -> async_graphql::Error {
        let code = match self {
            GatewayError::Validation { .. } => "VALIDATION_ERROR",
            GatewayError::Database(_) => "DATABASE_ERROR",
            _ => "INTERNAL_ERROR",
        };

        let mut error = async_graphql::Error::new(self.to_string()).extend_with(|_, e| {
            e.set("code", code);
        });
        if let GatewayError::Validation { field, .. } = self {
            let field = field.clone();
            error = error.extend_with(move |_, e| e.set("field", field.as_str()));
        }
        error
    }
}

// ============================================================================
// QUERY RESOLVERS
// ============================================================================

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Proofs filtered by property and time window, ascending by start time.
    async fn proofs(
        &self,
        ctx: &Context<'_>,
        property_id: Option<String>,
        from: Option<String>,
        to: Option<String>,
    ) -> GqlResult<Vec<GqlProof>> {
        let store = ctx.data::<Arc<dyn ProofStore>>()?;
        let query = ProofQuery {
            property_id,
            from,
            to,
        };

        let proofs = resolve_proofs(store.as_ref(), query)
            .await
            .map_err(|e| e.extend())?;
        Ok(proofs.into_iter().map(GqlProof::from).collect())
    }
}

// ============================================================================
// SCHEMA & HANDLERS
// ============================================================================

/// The GraphQL schema type.
pub type ProofSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Create the GraphQL schema over a proof store.
pub fn create_schema(store: Arc<dyn ProofStore>) -> ProofSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(store)
        .finish()
}

/// Handler for GraphQL requests.
pub async fn graphql_handler(State(state): State<AppState>, req: GraphQLRequest) -> GraphQLResponse {
    state.schema.execute(req.into_inner()).await.into()
}

/// Handler for GraphiQL playground.
pub async fn graphiql_handler() -> impl IntoResponse {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}
