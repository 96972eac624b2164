// ABOUTME: Route module organization for the Blueprint HTTP API
// ABOUTME: Assembles the domain routers with tracing, CORS, and request timeout layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! Route module for the Blueprint API
//!
//! Each domain module contains route definitions and thin handlers that
//! authenticate, delegate to the database or a service, and shape JSON.

/// Assistant configuration routes
pub mod assistants;
/// Prompt submission, streaming, and quick chat routes
pub mod chat;
/// Conversation management routes
pub mod conversations;
/// Cloud credential routes
pub mod credentials;
/// Document and diagram routes
pub mod documents;
/// Health check routes
pub mod health;
/// Project and template routes
pub mod projects;
/// Semantic search routes
pub mod search;
/// Tenant AI settings routes
pub mod settings;

pub use assistants::AssistantRoutes;
pub use chat::ChatRoutes;
pub use conversations::ConversationRoutes;
pub use credentials::CredentialRoutes;
pub use documents::DocumentRoutes;
pub use health::HealthRoutes;
pub use projects::ProjectRoutes;
pub use search::SearchRoutes;
pub use settings::SettingsRoutes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::setup_cors;
use crate::resources::ServerResources;

/// Build the complete application router
pub fn build_router(resources: &Arc<ServerResources>) -> Router {
    let timeout = Duration::from_secs(resources.config.http.request_timeout_secs);

    Router::new()
        .merge(HealthRoutes::routes())
        .merge(ChatRoutes::routes(Arc::clone(resources)))
        .merge(ConversationRoutes::routes(Arc::clone(resources)))
        .merge(SearchRoutes::routes(Arc::clone(resources)))
        .merge(ProjectRoutes::routes(Arc::clone(resources)))
        .merge(DocumentRoutes::routes(Arc::clone(resources)))
        .merge(AssistantRoutes::routes(Arc::clone(resources)))
        .merge(CredentialRoutes::routes(Arc::clone(resources)))
        .merge(SettingsRoutes::routes(Arc::clone(resources)))
        .layer(TimeoutLayer::new(timeout))
        .layer(setup_cors(&resources.config))
        .layer(TraceLayer::new_for_http())
}
