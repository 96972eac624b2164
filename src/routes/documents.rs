// ABOUTME: Document and diagram routes; writes embed the new text with the tenant's embedding client
// ABOUTME: Rows belong to a resource group that the caller's tenant must own
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::debug;
use uuid::Uuid;

use super::search::SearchScopeQuery;
use crate::database::{CreateDiagram, CreateDocument, DiagramPatch, DocumentPatch};
use crate::errors::{AppError, AppResult};
use crate::models::TenantId;
use crate::resources::ServerResources;

/// Document and diagram routes handler
pub struct DocumentRoutes;

impl DocumentRoutes {
    /// Create all document and diagram routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/documents",
                post(Self::create_document).get(Self::list_documents),
            )
            .route(
                "/api/documents/:document_id",
                get(Self::get_document)
                    .patch(Self::update_document)
                    .delete(Self::delete_document),
            )
            .route(
                "/api/diagrams",
                post(Self::create_diagram).get(Self::list_diagrams),
            )
            .route(
                "/api/diagrams/:diagram_id",
                get(Self::get_diagram)
                    .patch(Self::update_diagram)
                    .delete(Self::delete_diagram),
            )
            .with_state(resources)
    }

    /// The group must exist and belong to the tenant; shared templates are read-only
    async fn require_owned_group(
        resources: &ServerResources,
        tenant_id: TenantId,
        group_id: Uuid,
    ) -> AppResult<()> {
        let project = resources
            .database
            .get_project(group_id, tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Project"))?;
        if project.tenant_id != tenant_id.to_string() {
            return Err(AppError::permission_denied(
                "Resource group belongs to another tenant",
            ));
        }
        Ok(())
    }

    async fn embed(resources: &ServerResources, tenant_id: TenantId, text: &str) -> AppResult<Vec<f32>> {
        let clients = resources.llm_clients(tenant_id).await?;
        let embedding = clients.embeddings.create_embedding(text).await?;
        debug!(tenant_id = %tenant_id, dimensions = embedding.len(), "Embedded resource text");
        Ok(embedding)
    }

    // ========================================================================
    // Documents
    // ========================================================================

    async fn create_document(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateDocument>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        if request.title.trim().is_empty() {
            return Err(AppError::invalid_input("title must not be empty"));
        }
        Self::require_owned_group(&resources, auth.tenant_id, request.resource_group_id).await?;

        let embedding = Self::embed(&resources, auth.tenant_id, &request.embedding_text()).await?;
        let document = resources
            .database
            .create_document(auth.tenant_id, &request, Some(embedding.as_slice()))
            .await?;
        Ok((StatusCode::CREATED, Json(document)).into_response())
    }

    async fn list_documents(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(scope): Query<SearchScopeQuery>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let (group_type, group_id) = scope.resolve()?;
        let documents = resources
            .database
            .list_documents(auth.tenant_id, group_type, group_id)
            .await?;
        Ok((StatusCode::OK, Json(documents)).into_response())
    }

    async fn get_document(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(document_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let document = resources
            .database
            .get_document(document_id, auth.tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Document"))?;
        Ok((StatusCode::OK, Json(document)).into_response())
    }

    async fn update_document(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(document_id): Path<Uuid>,
        Json(patch): Json<DocumentPatch>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let mut document = resources
            .database
            .get_document(document_id, auth.tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Document"))?;

        // Re-embed only when the embedded text changes
        let embedding = if patch.title.is_some() || patch.content.is_some() {
            if let Some(title) = &patch.title {
                document.title.clone_from(title);
            }
            if let Some(content) = &patch.content {
                document.content.clone_from(content);
            }
            Some(Self::embed(&resources, auth.tenant_id, &document.embedding_text()).await?)
        } else {
            None
        };

        if !resources
            .database
            .update_document(document_id, auth.tenant_id, &patch, embedding.as_deref())
            .await?
        {
            return Err(AppError::not_found("Document"));
        }

        let document = resources
            .database
            .get_document(document_id, auth.tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Document"))?;
        Ok((StatusCode::OK, Json(document)).into_response())
    }

    async fn delete_document(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(document_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        if !resources
            .database
            .delete_document(document_id, auth.tenant_id)
            .await?
        {
            return Err(AppError::not_found("Document"));
        }
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    // ========================================================================
    // Diagrams
    // ========================================================================

    async fn create_diagram(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateDiagram>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        if request.name.trim().is_empty() {
            return Err(AppError::invalid_input("name must not be empty"));
        }
        Self::require_owned_group(&resources, auth.tenant_id, request.resource_group_id).await?;

        let embedding = Self::embed(&resources, auth.tenant_id, &request.embedding_text()).await?;
        let diagram = resources
            .database
            .create_diagram(auth.tenant_id, &request, Some(embedding.as_slice()))
            .await?;
        Ok((StatusCode::CREATED, Json(diagram)).into_response())
    }

    async fn list_diagrams(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(scope): Query<SearchScopeQuery>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let (group_type, group_id) = scope.resolve()?;
        let diagrams = resources
            .database
            .list_diagrams(auth.tenant_id, group_type, group_id)
            .await?;
        Ok((StatusCode::OK, Json(diagrams)).into_response())
    }

    async fn get_diagram(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(diagram_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let diagram = resources
            .database
            .get_diagram(diagram_id, auth.tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Diagram"))?;
        Ok((StatusCode::OK, Json(diagram)).into_response())
    }

    async fn update_diagram(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(diagram_id): Path<Uuid>,
        Json(patch): Json<DiagramPatch>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let mut diagram = resources
            .database
            .get_diagram(diagram_id, auth.tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Diagram"))?;

        let embedding =
            if patch.name.is_some() || patch.description.is_some() || patch.definition.is_some() {
                if let Some(name) = &patch.name {
                    diagram.name.clone_from(name);
                }
                if let Some(description) = &patch.description {
                    diagram.description = Some(description.clone());
                }
                if let Some(definition) = &patch.definition {
                    diagram.definition.clone_from(definition);
                }
                Some(Self::embed(&resources, auth.tenant_id, &diagram.embedding_text()).await?)
            } else {
                None
            };

        if !resources
            .database
            .update_diagram(diagram_id, auth.tenant_id, &patch, embedding.as_deref())
            .await?
        {
            return Err(AppError::not_found("Diagram"));
        }

        let diagram = resources
            .database
            .get_diagram(diagram_id, auth.tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Diagram"))?;
        Ok((StatusCode::OK, Json(diagram)).into_response())
    }

    async fn delete_diagram(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(diagram_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        if !resources
            .database
            .delete_diagram(diagram_id, auth.tenant_id)
            .await?
        {
            return Err(AppError::not_found("Diagram"));
        }
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
