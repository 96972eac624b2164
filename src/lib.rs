// ABOUTME: Main library entry point for the Blueprint multi-tenant API
// ABOUTME: Projects, templates, documents, diagrams, and an LLM chat loop with function-calling tools
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

#![deny(unsafe_code)]

//! # Blueprint Server
//!
//! A multi-tenant backend for cloud architecture blueprints. Tenants keep
//! projects and templates with documents and diagrams; users chat with an
//! LLM that can search those resources through function-calling tools.
//!
//! ## Architecture
//!
//! - **Routes**: axum handlers under `/api`, authenticated by bearer JWT
//! - **Services**: chat orchestration, credentials, AI settings, usage recording
//! - **Tools**: registry, bounded-concurrency executor, data backend
//! - **LLM**: Responses-style vendor client, SSE parsing, per-tenant factory
//! - **Database**: SQLite via `sqlx`, every query scoped by tenant
//! - **Vault**: secret storage for cloud credentials and tenant API keys
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use blueprint_server::config::ServerConfig;
//! use blueprint_server::errors::AppResult;
//! use blueprint_server::resources::ServerResources;
//! use blueprint_server::routes::build_router;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let resources = Arc::new(ServerResources::from_config(config).await?);
//!     let _router = build_router(&resources);
//!     Ok(())
//! }
//! ```

/// Bearer token validation
pub mod auth;

/// Environment-driven configuration
pub mod config;

/// SQLite persistence
pub mod database;

/// Unified error handling
pub mod errors;

/// LLM vendor clients and prompt composition
pub mod llm;

/// Structured logging setup and tenant-aware log events
pub mod logging;

/// HTTP middleware
pub mod middleware;

/// Shared data models
pub mod models;

/// Shared handler state
pub mod resources;

/// HTTP routes
pub mod routes;

/// Business logic behind the routes
pub mod services;

/// Chat tools: registry, executor, backend
pub mod tools;

/// Secret storage
pub mod vault;
