// ABOUTME: Semantic search routes over the documents and diagrams of one resource group
// ABOUTME: The scope comes from required query parameters; the query is embedded per tenant

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::ResourceGroupType;
use crate::resources::ServerResources;
use crate::tools::clamp_search_limit;

/// Scope query parameters; both are required
#[derive(Debug, Default, Deserialize)]
pub struct SearchScopeQuery {
    /// `project`, `template`, or `community_template`
    pub resource_group_type: Option<String>,
    /// Group ID
    pub resource_group_id: Option<String>,
}

impl SearchScopeQuery {
    /// Validate into a typed scope
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` or `InvalidInput` (both 400)
    pub fn resolve(&self) -> AppResult<(ResourceGroupType, Uuid)> {
        let group_type = self
            .resource_group_type
            .as_deref()
            .ok_or_else(|| AppError::missing_field("resource_group_type"))?
            .parse::<ResourceGroupType>()
            .map_err(|_| AppError::invalid_input("Invalid resource_group_type"))?;
        let group_id = self
            .resource_group_id
            .as_deref()
            .ok_or_else(|| AppError::missing_field("resource_group_id"))
            .and_then(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| AppError::invalid_input("Invalid resource_group_id"))
            })?;
        Ok((group_type, group_id))
    }
}

/// Search request body
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Free-text query
    pub query: String,
    /// Result count, clamped like the chat search tools
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Search response
#[derive(Debug, Serialize)]
pub struct SearchResponse<T> {
    /// Ranked results, best first
    pub results: Vec<T>,
}

/// Search routes handler
pub struct SearchRoutes;

impl SearchRoutes {
    /// Create all search routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/search/documents", post(Self::search_documents))
            .route("/api/search/diagrams", post(Self::search_diagrams))
            .with_state(resources)
    }

    fn validate(scope: &SearchScopeQuery, request: &SearchRequest) -> AppResult<(ResourceGroupType, Uuid)> {
        let resolved = scope.resolve()?;
        if request.query.trim().is_empty() {
            return Err(AppError::invalid_input("query must not be empty"));
        }
        Ok(resolved)
    }

    async fn search_documents(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(scope): Query<SearchScopeQuery>,
        Json(request): Json<SearchRequest>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let (group_type, group_id) = Self::validate(&scope, &request)?;

        let clients = resources.llm_clients(auth.tenant_id).await?;
        let embedding = clients.embeddings.create_embedding(&request.query).await?;
        let results = resources
            .database
            .search_documents(
                auth.tenant_id,
                group_type,
                group_id,
                &embedding,
                clamp_search_limit(request.limit),
            )
            .await?;

        Ok((StatusCode::OK, Json(SearchResponse { results })).into_response())
    }

    async fn search_diagrams(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(scope): Query<SearchScopeQuery>,
        Json(request): Json<SearchRequest>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let (group_type, group_id) = Self::validate(&scope, &request)?;

        let clients = resources.llm_clients(auth.tenant_id).await?;
        let embedding = clients.embeddings.create_embedding(&request.query).await?;
        let results = resources
            .database
            .search_diagrams(
                auth.tenant_id,
                group_type,
                group_id,
                &embedding,
                clamp_search_limit(request.limit),
            )
            .await?;

        Ok((StatusCode::OK, Json(SearchResponse { results })).into_response())
    }
}
