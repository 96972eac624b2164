// ABOUTME: Conversation management routes: CRUD, turn history, and token usage
// ABOUTME: Conversations are private to the user that created them within a tenant
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
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthResult;
use crate::database::{ConversationPatch, ConversationRecord, CreateConversation, HistoryEntry};
use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;

/// Default page size for conversation listings
const DEFAULT_LIST_LIMIT: i64 = 50;
/// Largest page size accepted
const MAX_LIST_LIMIT: i64 = 200;

/// Query parameters for listing conversations
#[derive(Debug, Deserialize)]
pub struct ListConversationsQuery {
    /// Page size
    #[serde(default)]
    pub limit: Option<i64>,
    /// Rows to skip
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Response for listing conversations
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    /// Conversations, most recently updated first
    pub conversations: Vec<ConversationRecord>,
    /// Number of conversations returned
    pub total: usize,
}

/// Response for conversation history
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Conversation ID
    pub conversation_id: Uuid,
    /// Prompts and completions in chronological order
    pub entries: Vec<HistoryEntry>,
}

/// Conversation routes handler
pub struct ConversationRoutes;

impl ConversationRoutes {
    /// Create all conversation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/conversations",
                post(Self::create_conversation).get(Self::list_conversations),
            )
            .route(
                "/api/conversations/:conversation_id",
                get(Self::get_conversation)
                    .patch(Self::update_conversation)
                    .delete(Self::delete_conversation),
            )
            .route(
                "/api/conversations/:conversation_id/history",
                get(Self::get_history),
            )
            .route(
                "/api/conversations/:conversation_id/usage",
                get(Self::get_usage),
            )
            .with_state(resources)
    }

    async fn owned_conversation(
        resources: &ServerResources,
        auth: &AuthResult,
        conversation_id: Uuid,
    ) -> AppResult<ConversationRecord> {
        resources
            .database
            .get_conversation(conversation_id, auth.tenant_id, auth.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))
    }

    async fn create_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateConversation>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;

        if let Some(assistant_id) = request.assistant_id {
            resources
                .database
                .get_assistant(assistant_id, auth.tenant_id)
                .await?
                .ok_or_else(|| AppError::not_found("Assistant"))?;
        }

        let conversation = resources
            .database
            .create_conversation(auth.tenant_id, auth.user_id, &request)
            .await?;

        Ok((StatusCode::CREATED, Json(conversation)).into_response())
    }

    async fn list_conversations(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListConversationsQuery>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let limit = query
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        let offset = query.offset.unwrap_or(0).max(0);

        let conversations = resources
            .database
            .list_conversations(auth.tenant_id, auth.user_id, limit, offset)
            .await?;

        let total = conversations.len();
        Ok((
            StatusCode::OK,
            Json(ConversationListResponse {
                conversations,
                total,
            }),
        )
            .into_response())
    }

    async fn get_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(conversation_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let conversation = Self::owned_conversation(&resources, &auth, conversation_id).await?;
        Ok((StatusCode::OK, Json(conversation)).into_response())
    }

    async fn update_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(conversation_id): Path<Uuid>,
        Json(patch): Json<ConversationPatch>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;

        let updated = resources
            .database
            .update_conversation(conversation_id, auth.tenant_id, auth.user_id, &patch)
            .await?;
        if !updated {
            return Err(AppError::not_found("Conversation"));
        }

        let conversation = Self::owned_conversation(&resources, &auth, conversation_id).await?;
        Ok((StatusCode::OK, Json(conversation)).into_response())
    }

    async fn delete_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(conversation_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;

        let deleted = resources
            .database
            .delete_conversation(conversation_id, auth.tenant_id, auth.user_id)
            .await?;
        if !deleted {
            return Err(AppError::not_found("Conversation"));
        }

        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn get_history(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(conversation_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        Self::owned_conversation(&resources, &auth, conversation_id).await?;

        let entries = resources
            .database
            .get_history(conversation_id, auth.tenant_id)
            .await?;

        Ok((
            StatusCode::OK,
            Json(HistoryResponse {
                conversation_id,
                entries,
            }),
        )
            .into_response())
    }

    async fn get_usage(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(conversation_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        Self::owned_conversation(&resources, &auth, conversation_id).await?;

        let usage = resources
            .database
            .get_conversation_usage(conversation_id, auth.tenant_id)
            .await?;

        Ok((StatusCode::OK, Json(usage)).into_response())
    }
}
