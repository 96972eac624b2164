// ABOUTME: Health check route for load balancers and uptime monitoring
// ABOUTME: Unauthenticated; reports service name, version, and current time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::logging::SERVICE_NAME;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health check route
    pub fn routes() -> Router {
        Router::new().route("/health", get(Self::health))
    }

    async fn health() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}
