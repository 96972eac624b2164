// ABOUTME: Configuration module for server settings loaded from the environment
// ABOUTME: Re-exports the server configuration and the typed database URL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! Configuration module
//!
//! - **Environment**: `ServerConfig::from_env()` and its sections
//! - **Database**: typed `DatabaseUrl` parsing

/// Typed database URL
pub mod database;
/// Environment-driven server configuration
pub mod environment;

pub use database::DatabaseUrl;
pub use environment::{
    AuthConfig, Environment, HttpConfig, LlmConfig, ServerConfig, VaultConfig,
};
