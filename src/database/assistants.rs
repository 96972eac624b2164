// ABOUTME: Per-tenant assistant configurations: model overrides, instructions, and hosted tools
// ABOUTME: Conversations reference an assistant whose settings shape every vendor call
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{json_column, now_timestamp, Database};
use crate::errors::{AppError, AppResult};
use crate::models::TenantId;

/// A function declaration an assistant always offers to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantFunction {
    /// Function name
    pub name: String,
    /// When the model should call it
    #[serde(default)]
    pub description: String,
    /// JSON schema of the arguments
    #[serde(default)]
    pub parameters: Value,
}

/// A named assistant configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantRecord {
    /// Assistant ID
    pub id: String,
    /// Owning tenant
    pub tenant_id: String,
    /// Display name
    pub name: String,
    /// Model override
    pub model: Option<String>,
    /// Extra instructions
    pub instructions: Option<String>,
    /// Temperature override
    pub temperature: Option<f32>,
    /// Nucleus sampling override
    pub top_p: Option<f32>,
    /// Output token cap override
    pub max_output_tokens: Option<u32>,
    /// Vendor vector stores for hosted file search
    pub vector_store_ids: Vec<String>,
    /// Enable hosted web search
    pub web_search: bool,
    /// Fixed function declarations
    pub functions: Vec<AssistantFunction>,
    /// Creation time (RFC 3339)
    pub created_at: String,
    /// Last update time (RFC 3339)
    pub updated_at: String,
}

/// Fields accepted when creating an assistant
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAssistant {
    /// Display name
    pub name: String,
    /// Model override
    pub model: Option<String>,
    /// Extra instructions
    pub instructions: Option<String>,
    /// Temperature override
    pub temperature: Option<f32>,
    /// Nucleus sampling override
    pub top_p: Option<f32>,
    /// Output token cap override
    pub max_output_tokens: Option<u32>,
    /// Vendor vector stores
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
    /// Enable hosted web search
    #[serde(default)]
    pub web_search: bool,
    /// Fixed function declarations
    #[serde(default)]
    pub functions: Vec<AssistantFunction>,
}

fn assistant_from_row(row: &SqliteRow) -> AssistantRecord {
    AssistantRecord {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        name: row.get("name"),
        model: row.get("model"),
        instructions: row.get("instructions"),
        temperature: row.get::<Option<f64>, _>("temperature").map(|v| v as f32),
        top_p: row.get::<Option<f64>, _>("top_p").map(|v| v as f32),
        max_output_tokens: row
            .get::<Option<i64>, _>("max_output_tokens")
            .and_then(|v| u32::try_from(v).ok()),
        vector_store_ids: json_column(row.get("vector_store_ids")),
        web_search: row.get("web_search"),
        functions: json_column(row.get("functions")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl Database {
    pub(super) async fn migrate_assistants(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS assistants (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                name TEXT NOT NULL,
                model TEXT,
                instructions TEXT,
                temperature REAL,
                top_p REAL,
                max_output_tokens INTEGER,
                vector_store_ids TEXT NOT NULL DEFAULT '[]',
                web_search BOOLEAN NOT NULL DEFAULT 0,
                functions TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .await?;
        self.execute_ddl("CREATE INDEX IF NOT EXISTS idx_assistants_tenant ON assistants(tenant_id)")
            .await
    }

    /// Create an assistant
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the insert fails
    pub async fn create_assistant(
        &self,
        tenant_id: TenantId,
        request: &CreateAssistant,
    ) -> AppResult<AssistantRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r"
            INSERT INTO assistants (id, tenant_id, name, model, instructions, temperature, top_p,
                                    max_output_tokens, vector_store_ids, web_search, functions,
                                    created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            ",
        )
        .bind(&id)
        .bind(tenant_id.to_column())
        .bind(&request.name)
        .bind(request.model.as_deref())
        .bind(request.instructions.as_deref())
        .bind(request.temperature.map(f64::from))
        .bind(request.top_p.map(f64::from))
        .bind(request.max_output_tokens.map(i64::from))
        .bind(serde_json::to_string(&request.vector_store_ids)?)
        .bind(request.web_search)
        .bind(serde_json::to_string(&request.functions)?)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create assistant: {e}")))?;

        Ok(AssistantRecord {
            id,
            tenant_id: tenant_id.to_column(),
            name: request.name.clone(),
            model: request.model.clone(),
            instructions: request.instructions.clone(),
            temperature: request.temperature,
            top_p: request.top_p,
            max_output_tokens: request.max_output_tokens,
            vector_store_ids: request.vector_store_ids.clone(),
            web_search: request.web_search,
            functions: request.functions.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a tenant's assistant
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_assistant(
        &self,
        assistant_id: Uuid,
        tenant_id: TenantId,
    ) -> AppResult<Option<AssistantRecord>> {
        let row = sqlx::query("SELECT * FROM assistants WHERE id = $1 AND tenant_id = $2")
            .bind(assistant_id.to_string())
            .bind(tenant_id.to_column())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get assistant: {e}")))?;

        Ok(row.as_ref().map(assistant_from_row))
    }

    /// List a tenant's assistants by name
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_assistants(&self, tenant_id: TenantId) -> AppResult<Vec<AssistantRecord>> {
        let rows = sqlx::query("SELECT * FROM assistants WHERE tenant_id = $1 ORDER BY name ASC")
            .bind(tenant_id.to_column())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list assistants: {e}")))?;

        Ok(rows.iter().map(assistant_from_row).collect())
    }

    /// Delete a tenant's assistant
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete_assistant(&self, assistant_id: Uuid, tenant_id: TenantId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM assistants WHERE id = $1 AND tenant_id = $2")
            .bind(assistant_id.to_string())
            .bind(tenant_id.to_column())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete assistant: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
