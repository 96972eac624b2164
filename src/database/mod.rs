// ABOUTME: SQLite persistence for conversations, usage, projects, documents, assistants, and credentials
// ABOUTME: Owns the connection pool and creates the schema idempotently at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Database Management
//!
//! Every query is scoped by `tenant_id`. Operations live in one file per
//! resource as `impl Database` blocks; each file also owns its tables and
//! registers a `migrate_*` step with [`Database::migrate`].
//!
//! IDs are stored as UUID text and timestamps as RFC 3339 text with
//! microsecond precision, so lexical order matches chronological order.

mod ai_settings;
mod assistants;
mod conversations;
mod credentials;
mod documents;
mod projects;
mod usage;

pub use ai_settings::{TenantAiSettings, TenantAiSettingsUpdate};
pub use assistants::{AssistantFunction, AssistantRecord, CreateAssistant};
pub use conversations::{
    CompletionRecord, ConversationPatch, ConversationRecord, CreateConversation,
    DocumentSelection, HistoryEntry, HistoryRole, NewCompletion, PromptRecord,
};
pub use credentials::CredentialRecord;
pub use documents::{
    CreateDiagram, CreateDocument, DiagramPatch, DiagramRecord, DocumentPatch, DocumentRecord,
    ScoredDiagram, ScoredDocument, cosine_similarity,
};
pub use projects::{CreateProject, ProjectPatch, ProjectRecord};
pub use usage::{TokenUsageRecord, UsageSummary};

use std::fs;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::DatabaseUrl;
use crate::errors::{AppError, AppResult};

/// Pool size for file-backed databases
const MAX_CONNECTIONS: u32 = 10;

/// Database manager shared by all handlers
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and run the idempotent schema setup
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema creation fails
    pub async fn new(url: &DatabaseUrl) -> AppResult<Self> {
        if let DatabaseUrl::SQLite { path } = url {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| {
                    AppError::config(format!(
                        "Failed to create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&url.to_connection_string())
            .map_err(|e| AppError::config(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Each in-memory connection is its own database, so tests share one that never expires
        let pool_options = if url.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        info!(database = %url, "Database ready");
        Ok(db)
    }

    /// Get a reference to the database pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_conversations().await?;
        self.migrate_usage().await?;
        self.migrate_projects().await?;
        self.migrate_documents().await?;
        self.migrate_assistants().await?;
        self.migrate_credentials().await?;
        self.migrate_ai_settings().await?;
        Ok(())
    }

    async fn execute_ddl(&self, statement: &str) -> AppResult<()> {
        sqlx::query(statement)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Schema setup failed: {e}")))?;
        Ok(())
    }
}

/// Current time as sortable RFC 3339 text
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a JSON text column, falling back to the type's default
pub(crate) fn json_column<T>(raw: Option<String>) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    raw.and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}
