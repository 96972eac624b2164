// ABOUTME: Project and template routes: CRUD plus the project info view used by the chat tool
// ABOUTME: Community templates are readable by every tenant but writable only by their owner
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
use serde::Deserialize;
use uuid::Uuid;

use crate::database::{CreateProject, ProjectPatch};
use crate::errors::AppError;
use crate::models::ResourceGroupType;
use crate::resources::ServerResources;
use crate::tools::load_project_info;

/// Query parameters for listing projects
#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    /// Only this kind
    #[serde(default)]
    pub kind: Option<ResourceGroupType>,
}

/// Query parameters for the info view
#[derive(Debug, Deserialize)]
pub struct ProjectInfoQuery {
    /// List the group's documents
    #[serde(default)]
    pub include_documents: bool,
}

/// Project routes handler
pub struct ProjectRoutes;

impl ProjectRoutes {
    /// Create all project routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/projects",
                post(Self::create_project).get(Self::list_projects),
            )
            .route(
                "/api/projects/:project_id",
                get(Self::get_project)
                    .patch(Self::update_project)
                    .delete(Self::delete_project),
            )
            .route("/api/projects/:project_id/info", get(Self::project_info))
            .with_state(resources)
    }

    async fn create_project(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateProject>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        if request.name.trim().is_empty() {
            return Err(AppError::invalid_input("name must not be empty"));
        }

        let project = resources
            .database
            .create_project(auth.tenant_id, &request)
            .await?;
        Ok((StatusCode::CREATED, Json(project)).into_response())
    }

    async fn list_projects(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListProjectsQuery>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let projects = resources
            .database
            .list_projects(auth.tenant_id, query.kind)
            .await?;
        Ok((StatusCode::OK, Json(projects)).into_response())
    }

    async fn get_project(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(project_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let project = resources
            .database
            .get_project(project_id, auth.tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Project"))?;
        Ok((StatusCode::OK, Json(project)).into_response())
    }

    async fn update_project(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(project_id): Path<Uuid>,
        Json(patch): Json<ProjectPatch>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        if !resources
            .database
            .update_project(project_id, auth.tenant_id, &patch)
            .await?
        {
            return Err(AppError::not_found("Project"));
        }

        let project = resources
            .database
            .get_project(project_id, auth.tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Project"))?;
        Ok((StatusCode::OK, Json(project)).into_response())
    }

    async fn delete_project(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(project_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        if !resources
            .database
            .delete_project(project_id, auth.tenant_id)
            .await?
        {
            return Err(AppError::not_found("Project"));
        }
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn project_info(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(project_id): Path<Uuid>,
        Query(query): Query<ProjectInfoQuery>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let info = load_project_info(
            &resources.database,
            auth.tenant_id,
            project_id,
            query.include_documents,
        )
        .await?
        .ok_or_else(|| AppError::not_found("Project"))?;
        Ok((StatusCode::OK, Json(info)).into_response())
    }
}
