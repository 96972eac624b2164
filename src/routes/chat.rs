// ABOUTME: Prompt submission routes: blocking, streaming plain text, and non-persisted quick chat
// ABOUTME: Handlers authenticate, build the turn, and delegate to the chat orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{error, info};

use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::services::chat_orchestration::{
    prepare_prompt, prepare_quick_chat, PromptSubmission, QuickChatRequest, TurnOutcome,
};

/// Streamed chunks buffered ahead of a slow client
const STREAM_BUFFER: usize = 64;

/// Response of a blocking prompt
#[derive(Debug, Serialize)]
pub struct PromptResponse {
    /// Final assistant text
    pub message: String,
    /// Vendor status of the final response
    pub status: String,
    /// Completion tokens summed over all vendor calls of the turn
    pub total_tokens: u32,
}

impl From<TurnOutcome> for PromptResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            message: outcome.message,
            status: outcome.status,
            total_tokens: outcome.total_tokens,
        }
    }
}

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/prompts", post(Self::submit_prompt))
            .route("/api/prompts/stream", post(Self::submit_prompt_stream))
            .route("/api/chat/quick", post(Self::quick_chat))
            .with_state(resources)
    }

    /// Run a turn and answer with the final text
    async fn submit_prompt(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(submission): Json<PromptSubmission>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let turn = prepare_prompt(&resources.database, &auth, submission).await?;
        let orchestrator = resources.orchestrator(auth.tenant_id).await?;

        let outcome = orchestrator.run(turn).await?;
        info!(
            tenant_id = %auth.tenant_id,
            iterations = outcome.iterations,
            total_tokens = outcome.total_tokens,
            "Prompt completed"
        );

        Ok((StatusCode::OK, Json(PromptResponse::from(outcome))).into_response())
    }

    /// Run a turn and stream its text as `text/plain`
    ///
    /// Setup errors (auth, missing conversation, vendor configuration) are
    /// returned as JSON before the stream starts. Errors during the turn end
    /// the stream after they are logged.
    async fn submit_prompt_stream(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(submission): Json<PromptSubmission>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let turn = prepare_prompt(&resources.database, &auth, submission).await?;
        let orchestrator = resources.orchestrator(auth.tenant_id).await?;

        let (sender, receiver) = mpsc::channel::<Bytes>(STREAM_BUFFER);
        tokio::spawn(async move {
            match orchestrator.run_streaming(turn, sender).await {
                Ok(outcome) => info!(
                    tenant_id = %auth.tenant_id,
                    iterations = outcome.iterations,
                    total_tokens = outcome.total_tokens,
                    "Streamed prompt completed"
                ),
                Err(e) => error!(
                    tenant_id = %auth.tenant_id,
                    error.code = ?e.code,
                    error.message = %e.message,
                    "Streamed prompt failed"
                ),
            }
        });

        let body = Body::from_stream(ReceiverStream::new(receiver).map(Ok::<_, Infallible>));
        Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response())
    }

    /// Ad-hoc chat; nothing but token usage is persisted
    async fn quick_chat(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<QuickChatRequest>,
    ) -> Result<Response, AppError> {
        let auth = resources.authenticate(&headers)?;
        let turn = prepare_quick_chat(&resources.database, &auth, request).await?;
        let orchestrator = resources.orchestrator(auth.tenant_id).await?;

        let outcome = orchestrator.run(turn).await?;
        Ok((StatusCode::OK, Json(PromptResponse::from(outcome))).into_response())
    }
}
