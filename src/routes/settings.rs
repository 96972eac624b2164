// ABOUTME: Tenant AI settings routes: read effective vendor settings and store a tenant API key
// ABOUTME: The key itself is write-only; reads report only whether one is configured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::info;

use crate::database::TenantAiSettingsUpdate;
use crate::errors::AppError;
use crate::resources::ServerResources;

/// Settings routes handler
pub struct SettingsRoutes;

impl SettingsRoutes {
    /// Create all settings routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/settings/ai",
                get(Self::get_ai_settings).put(Self::update_ai_settings),
            )
            .with_state(resources)
    }

    async fn get_ai_settings(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let settings = resources.ai_settings().get(auth.tenant_id).await?;
        Ok((StatusCode::OK, Json(settings)).into_response())
    }

    async fn update_ai_settings(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(update): Json<TenantAiSettingsUpdate>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let settings = resources.ai_settings().update(auth.tenant_id, &update).await?;
        info!(
            tenant_id = %auth.tenant_id,
            user_id = %auth.user_id,
            key_updated = update.api_key.is_some(),
            "Tenant AI settings updated"
        );
        Ok((StatusCode::OK, Json(settings)).into_response())
    }
}
