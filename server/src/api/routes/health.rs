//! Health check endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::data::{GraphReader, Params};

#[derive(Clone)]
pub struct HealthState {
    pub reader: Arc<dyn GraphReader>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// `up` when the graph store answered a trivial statement
    pub graph: String,
}

pub fn routes(reader: Arc<dyn GraphReader>) -> Router<()> {
    Router::new()
        .route("/", get(health))
        .with_state(HealthState { reader })
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service and graph store are healthy", body = HealthResponse),
        (status = 503, description = "Graph store unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    let (status, code, graph) = match state.reader.run("RETURN 1", &Params::new()).await {
        Ok(_) => ("ok", StatusCode::OK, "up"),
        Err(e) => {
            tracing::warn!(error = %e, "Graph store health check failed");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "down")
        }
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            graph: graph.to_string(),
        }),
    )
}
