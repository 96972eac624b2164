// ABOUTME: Cloud credential routes; secret values are accepted on create and never returned
// ABOUTME: Delegates vault and database coordination to the credential service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::services::credentials::CreateCredential;

/// Credential routes handler
pub struct CredentialRoutes;

impl CredentialRoutes {
    /// Create all credential routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/credentials",
                post(Self::create_credential).get(Self::list_credentials),
            )
            .route(
                "/api/credentials/:credential_id",
                get(Self::get_credential).delete(Self::delete_credential),
            )
            .with_state(resources)
    }

    async fn create_credential(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateCredential>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let credential = resources
            .credentials()
            .create(auth.tenant_id, &request)
            .await?;
        Ok((StatusCode::CREATED, Json(credential)).into_response())
    }

    async fn list_credentials(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let credentials = resources.credentials().list(auth.tenant_id).await?;
        Ok((StatusCode::OK, Json(credentials)).into_response())
    }

    async fn get_credential(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(credential_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let credential = resources
            .credentials()
            .get(auth.tenant_id, credential_id)
            .await?;
        Ok((StatusCode::OK, Json(credential)).into_response())
    }

    async fn delete_credential(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(credential_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        resources
            .credentials()
            .delete(auth.tenant_id, credential_id)
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
