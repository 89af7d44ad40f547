//! Tenant-scoped entity query endpoints

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use crate::api::extractors::{TenantEntityPath, ValidatedJson};
use crate::api::types::{ApiError, PaginatedResponse};
use crate::domain::search::compile_search;
use crate::domain::{CompiledQuery, SearchRequest, SearchService};

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
pub struct EntitiesApiState {
    pub search: SearchService,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(search: SearchService) -> Router<()> {
    let state = EntitiesApiState { search };
    Router::new()
        .route("/{tenant}/{entity}/compile", post(compile_query))
        .route("/{tenant}/{entity}/search", post(search_entities))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Compile a filter/sort/page request into Cypher without running it
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant}/{entity}/compile",
    tag = "query",
    params(
        ("tenant" = String, Path, description = "Tenant name"),
        ("entity" = String, Path, description = "Entity type, e.g. organization")
    ),
    responses(
        (status = 200, description = "Compiled count and page statements with parameters"),
        (status = 400, description = "Malformed filter or unknown property"),
        (status = 404, description = "Unknown entity")
    )
)]
pub async fn compile_query(
    State(state): State<EntitiesApiState>,
    path: TenantEntityPath,
    ValidatedJson(req): ValidatedJson<SearchRequest>,
) -> Result<Json<CompiledQuery>, ApiError> {
    let query = compile_search(&path.tenant, path.entity, &req, state.search.limits())?;
    Ok(Json(query))
}

/// Run a tenant-scoped search and return one page of nodes
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant}/{entity}/search",
    tag = "query",
    params(
        ("tenant" = String, Path, description = "Tenant name"),
        ("entity" = String, Path, description = "Entity type, e.g. organization")
    ),
    responses(
        (status = 200, description = "Page of matching nodes with pagination metadata"),
        (status = 400, description = "Malformed filter or unknown property"),
        (status = 404, description = "Unknown entity"),
        (status = 503, description = "Graph store temporarily unavailable")
    )
)]
pub async fn search_entities(
    State(state): State<EntitiesApiState>,
    path: TenantEntityPath,
    ValidatedJson(req): ValidatedJson<SearchRequest>,
) -> Result<Json<PaginatedResponse<Value>>, ApiError> {
    let page = state.search.search(&path.tenant, path.entity, &req).await?;
    Ok(Json(page.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::data::{DataError, GraphReader, Params, Row};
    use crate::domain::QueryLimits;

    struct CountingReader;

    #[async_trait]
    impl GraphReader for CountingReader {
        async fn run(&self, statement: &str, _params: &Params) -> Result<Vec<Row>, DataError> {
            if statement.contains("count(") {
                Ok(vec![vec![json!(1)]])
            } else {
                Ok(vec![vec![json!({"id": "o1", "name": "Acme"})]])
            }
        }
    }

    fn app() -> Router {
        let search = SearchService::new(Arc::new(CountingReader), QueryLimits::default());
        Router::new().nest("/api/v1/tenants", routes(search))
    }

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_compile_endpoint() {
        let (status, body) = post_json(
            "/api/v1/tenants/acme/organization/compile",
            json!({
                "filter": {"filter": {"property": "NAME", "operation": "EQ", "value": {"str": "Acme"}}},
                "page": 2,
                "limit": 10
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["skip"], 10);
        assert_eq!(body["params"]["org_param_1"], "Acme");
        assert!(
            body["countStatement"]
                .as_str()
                .unwrap()
                .contains("WHERE toLower(org.name) = toLower($org_param_1)")
        );
    }

    #[tokio::test]
    async fn test_search_endpoint() {
        let (status, body) =
            post_json("/api/v1/tenants/acme/organization/search", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["name"], "Acme");
        assert_eq!(body["meta"]["total_items"], 1);
        assert_eq!(body["meta"]["total_pages"], 1);
    }

    #[tokio::test]
    async fn test_malformed_filter_rejected() {
        let (status, body) = post_json(
            "/api/v1/tenants/acme/contact/search",
            json!({"filter": {"AND": [{"filter": {"property": "NAME", "value": {"str": "x"}}}]}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MALFORMED_FILTER");
    }

    #[tokio::test]
    async fn test_unknown_property_rejected() {
        let (status, body) = post_json(
            "/api/v1/tenants/acme/contact/compile",
            json!({"sort": [{"by": "SHOE_SIZE"}]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNKNOWN_PROPERTY");
    }

    #[tokio::test]
    async fn test_unknown_entity_not_found() {
        let (status, body) = post_json("/api/v1/tenants/acme/ticket/search", json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNKNOWN_ENTITY");
    }

    #[tokio::test]
    async fn test_negative_limit_rejected() {
        let (status, body) =
            post_json("/api/v1/tenants/acme/user/search", json!({"limit": -1})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}
