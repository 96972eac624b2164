// ABOUTME: Server binary for the Blueprint API
// ABOUTME: Loads configuration, connects collaborators, and serves the axum router until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Blueprint Server Binary
//!
//! Starts the HTTP API with tenant authentication, SQLite persistence, and
//! per-tenant LLM access.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use blueprint_server::{
    config::ServerConfig, logging, resources::ServerResources, routes::build_router,
};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "blueprint-server")]
#[command(about = "Blueprint API - multi-tenant blueprints with LLM chat")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http.port = http_port;
    }
    let port = config.http.port;

    info!("Starting Blueprint API");

    let resources = Arc::new(ServerResources::from_config(config).await?);
    let app = build_router(&resources);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!(%addr, "HTTP server listening");
    display_available_endpoints(port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failure")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[allow(clippy::cognitive_complexity)]
fn display_available_endpoints(port: u16) {
    info!("=== Available API Endpoints ===");
    info!("   Health:        GET  http://127.0.0.1:{port}/health");
    info!("   Prompts:       POST http://127.0.0.1:{port}/api/prompts");
    info!("   Streaming:     POST http://127.0.0.1:{port}/api/prompts/stream");
    info!("   Quick chat:    POST http://127.0.0.1:{port}/api/chat/quick");
    info!("   Conversations:      http://127.0.0.1:{port}/api/conversations");
    info!("   Search:        POST http://127.0.0.1:{port}/api/search/{{documents,diagrams}}");
    info!("   Projects:           http://127.0.0.1:{port}/api/projects");
    info!("   Documents:          http://127.0.0.1:{port}/api/documents");
    info!("   Diagrams:           http://127.0.0.1:{port}/api/diagrams");
    info!("   Assistants:         http://127.0.0.1:{port}/api/assistants");
    info!("   Credentials:        http://127.0.0.1:{port}/api/credentials");
    info!("   AI settings:        http://127.0.0.1:{port}/api/settings/ai");
}
