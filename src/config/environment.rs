// ABOUTME: Server configuration loaded from environment variables
// ABOUTME: Covers HTTP, database, JWT, default LLM vendor account, secret vault, and CORS settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! Environment-based configuration management for production deployment

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::database::DatabaseUrl;
use crate::errors::{AppError, AppResult};

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8081;

/// Default vendor API root
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model
pub const DEFAULT_LLM_MODEL: &str = "gpt-4.1";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default Key Vault REST API version
pub const DEFAULT_VAULT_API_VERSION: &str = "7.4";

/// Default whole-request timeout for HTTP handlers
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Default JWT lifetime
pub const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;

/// Deployment environment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if running in production
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// JWT settings for the bearer identity resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Token lifetime in hours for tokens minted by this server
    pub jwt_expiry_hours: i64,
}

/// Server-wide vendor defaults; tenants may override them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API root
    pub base_url: String,
    /// Fallback API key for tenants without their own
    pub api_key: Option<String>,
    /// Default chat model
    pub model: String,
    /// Default embedding model
    pub embedding_model: String,
    /// Vendor label recorded with token usage
    pub vendor: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_owned(),
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_owned(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_owned(),
            vendor: "openai".to_owned(),
        }
    }
}

/// Secret vault connection
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VaultConfig {
    /// Vault root, e.g. `https://blueprint.vault.azure.net`; `None` selects the in-memory vault
    pub url: Option<String>,
    /// Bearer token for the vault
    pub token: Option<String>,
    /// REST API version query parameter
    pub api_version: String,
}

/// HTTP surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Listen port
    pub port: u16,
    /// Allowed CORS origins; `*` allows any
    pub cors_allowed_origins: Vec<String>,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_HTTP_PORT,
            cors_allowed_origins: vec!["*".to_owned()],
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Deployment environment
    pub environment: Environment,
    /// HTTP settings
    pub http: HttpConfig,
    /// Relational store location
    pub database: DatabaseUrl,
    /// Bearer token validation
    pub auth: AuthConfig,
    /// Default vendor account
    pub llm: LlmConfig,
    /// Secret vault
    pub vault: VaultConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing or a numeric/URL variable
    /// does not parse.
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| AppError::config("JWT_SECRET must be set"))?;

        let llm_api_key = env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());
        if llm_api_key.is_none() {
            warn!("LLM_API_KEY not set; chat requires per-tenant AI settings");
        }

        let vault_url = env::var("VAULT_URL").ok().filter(|u| !u.is_empty());
        if vault_url.is_none() {
            warn!("VAULT_URL not set; credential secrets are kept in process memory");
        }

        let config = Self {
            environment: Environment::from_str_or_default(&env_var_or("ENVIRONMENT", "development")),
            http: HttpConfig {
                port: parse_env("HTTP_PORT", DEFAULT_HTTP_PORT)?,
                cors_allowed_origins: parse_origins(&env_var_or("CORS_ALLOWED_ORIGINS", "*")),
                request_timeout_secs: parse_env(
                    "REQUEST_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                )?,
            },
            database: DatabaseUrl::parse_url(&env_var_or(
                "DATABASE_URL",
                "sqlite:./data/blueprint.db",
            ))?,
            auth: AuthConfig {
                jwt_secret,
                jwt_expiry_hours: parse_env("JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS)?,
            },
            llm: LlmConfig {
                base_url: env_var_or("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
                api_key: llm_api_key,
                model: env_var_or("LLM_MODEL", DEFAULT_LLM_MODEL),
                embedding_model: env_var_or("LLM_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
                vendor: env_var_or("LLM_VENDOR", "openai"),
            },
            vault: VaultConfig {
                url: vault_url,
                token: env::var("VAULT_TOKEN").ok().filter(|t| !t.is_empty()),
                api_version: env_var_or("VAULT_API_VERSION", DEFAULT_VAULT_API_VERSION),
            },
        };

        info!(
            environment = ?config.environment,
            http_port = config.http.port,
            database = %config.database,
            llm_base_url = %config.llm.base_url,
            llm_model = %config.llm.model,
            "Configuration loaded"
        );

        Ok(config)
    }
}

/// Read an environment variable with a default
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse an environment variable, using `default` when unset
fn parse_env<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {key} value '{raw}': {e}"))),
        _ => Ok(default),
    }
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str.trim() == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "JWT_SECRET",
        "HTTP_PORT",
        "DATABASE_URL",
        "LLM_API_KEY",
        "LLM_MODEL",
        "VAULT_URL",
        "CORS_ALLOWED_ORIGINS",
        "REQUEST_TIMEOUT_SECS",
    ];

    fn clear_vars() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_vars();
        env::set_var("JWT_SECRET", "test-secret");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.http.port, DEFAULT_HTTP_PORT);
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert!(config.llm.api_key.is_none());
        assert!(config.vault.url.is_none());
        assert_eq!(config.vault.api_version, "7.4");
        assert_eq!(config.http.cors_allowed_origins, vec!["*".to_owned()]);

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_vars();
        env::set_var("JWT_SECRET", "test-secret");
        env::set_var("HTTP_PORT", "9000");
        env::set_var("DATABASE_URL", "sqlite::memory:");
        env::set_var("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.http.port, 9000);
        assert!(config.database.is_memory());
        assert_eq!(config.http.cors_allowed_origins.len(), 2);

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_missing_secret_and_bad_port_are_config_errors() {
        clear_vars();
        assert!(ServerConfig::from_env().is_err());

        env::set_var("JWT_SECRET", "test-secret");
        env::set_var("HTTP_PORT", "not-a-port");
        let error = ServerConfig::from_env().unwrap_err();
        assert!(error.message.contains("HTTP_PORT"));

        clear_vars();
    }
}
