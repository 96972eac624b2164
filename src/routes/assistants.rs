// ABOUTME: Assistant configuration routes: named model, instructions, and tool settings per tenant
// ABOUTME: Conversations and quick chats reference assistants by ID

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::database::CreateAssistant;
use crate::errors::AppError;
use crate::resources::ServerResources;

/// Assistant routes handler
pub struct AssistantRoutes;

impl AssistantRoutes {
    /// Create all assistant routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/assistants",
                post(Self::create_assistant).get(Self::list_assistants),
            )
            .route(
                "/api/assistants/:assistant_id",
                get(Self::get_assistant).delete(Self::delete_assistant),
            )
            .with_state(resources)
    }

    async fn create_assistant(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateAssistant>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        if request.name.trim().is_empty() {
            return Err(AppError::invalid_input("name must not be empty"));
        }
        if request.functions.iter().any(|f| f.name.trim().is_empty()) {
            return Err(AppError::invalid_input("function names must not be empty"));
        }

        let assistant = resources
            .database
            .create_assistant(auth.tenant_id, &request)
            .await?;
        Ok((StatusCode::CREATED, Json(assistant)).into_response())
    }

    async fn list_assistants(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let assistants = resources.database.list_assistants(auth.tenant_id).await?;
        Ok((StatusCode::OK, Json(assistants)).into_response())
    }

    async fn get_assistant(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(assistant_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let assistant = resources
            .database
            .get_assistant(assistant_id, auth.tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Assistant"))?;
        Ok((StatusCode::OK, Json(assistant)).into_response())
    }

    async fn delete_assistant(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(assistant_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        if !resources
            .database
            .delete_assistant(assistant_id, auth.tenant_id)
            .await?
        {
            return Err(AppError::not_found("Assistant"));
        }
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
