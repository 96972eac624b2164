// ABOUTME: Conversation, prompt, and completion persistence with tenant and user isolation
// ABOUTME: Reads the combined user/assistant history back in creation order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::{json_column, now_timestamp, Database};
use crate::errors::{AppError, AppResult};
use crate::models::TenantId;

// ============================================================================
// Record Types
// ============================================================================

/// A conversation and the configuration that feeds its vendor calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Conversation ID
    pub id: String,
    /// Owning tenant
    pub tenant_id: String,
    /// Owning user
    pub user_id: String,
    /// Display title
    pub title: String,
    /// Assistant whose configuration applies
    pub assistant_id: Option<String>,
    /// Sampling temperature override
    pub temperature: Option<f32>,
    /// Nucleus sampling override
    pub top_p: Option<f32>,
    /// Output token cap
    pub max_output_tokens: Option<u32>,
    /// Extra system instructions
    pub system_prompt: Option<String>,
    /// Vendor response to continue from
    pub last_response_id: Option<String>,
    /// Creation time (RFC 3339)
    pub created_at: String,
    /// Last update time (RFC 3339)
    pub updated_at: String,
}

/// Fields accepted when creating a conversation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateConversation {
    /// Display title; defaults to "New conversation"
    pub title: Option<String>,
    /// Assistant to attach
    pub assistant_id: Option<Uuid>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Nucleus sampling
    pub top_p: Option<f32>,
    /// Output token cap
    pub max_output_tokens: Option<u32>,
    /// Extra system instructions
    pub system_prompt: Option<String>,
}

/// Partial update; only supplied fields are written
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationPatch {
    /// New title
    pub title: Option<String>,
    /// New assistant
    pub assistant_id: Option<Uuid>,
    /// New temperature
    pub temperature: Option<f32>,
    /// New nucleus sampling value
    pub top_p: Option<f32>,
    /// New output token cap
    pub max_output_tokens: Option<u32>,
    /// New system instructions
    pub system_prompt: Option<String>,
}

impl ConversationPatch {
    /// Whether the patch carries no fields
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.assistant_id.is_none()
            && self.temperature.is_none()
            && self.top_p.is_none()
            && self.max_output_tokens.is_none()
            && self.system_prompt.is_none()
    }
}

/// A document excerpt the user attached to a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSelection {
    /// Source document
    pub document_id: String,
    /// Source document title
    #[serde(default)]
    pub title: Option<String>,
    /// Selected text
    pub text: String,
}

/// One persisted user prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    /// Prompt ID
    pub id: String,
    /// Conversation the prompt belongs to
    pub conversation_id: String,
    /// Owning tenant
    pub tenant_id: String,
    /// Author
    pub user_id: String,
    /// Prompt text as typed by the user
    pub content: String,
    /// Attached selections; empty when none were sent
    pub document_selections: Vec<DocumentSelection>,
    /// Creation time (RFC 3339)
    pub created_at: String,
}

/// One persisted assistant completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Completion ID
    pub id: String,
    /// Conversation the completion belongs to
    pub conversation_id: String,
    /// Owning tenant
    pub tenant_id: String,
    /// User the completion answered
    pub user_id: String,
    /// Final assistant text
    pub content: String,
    /// Vendor response ID
    pub response_id: String,
    /// Model that produced it
    pub model: String,
    /// Prompt tokens of the final vendor call
    pub input_tokens: u32,
    /// Completion tokens summed over the whole request
    pub output_tokens: u32,
    /// Creation time (RFC 3339)
    pub created_at: String,
}

/// Values for a new completion row
#[derive(Debug, Clone)]
pub struct NewCompletion<'a> {
    /// Conversation the completion belongs to
    pub conversation_id: Uuid,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// User the completion answered
    pub user_id: Uuid,
    /// Final assistant text
    pub content: &'a str,
    /// Vendor response ID
    pub response_id: &'a str,
    /// Model that produced it
    pub model: &'a str,
    /// Prompt tokens
    pub input_tokens: u32,
    /// Completion tokens
    pub output_tokens: u32,
}

/// Speaker of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    /// A user prompt
    User,
    /// An assistant completion
    Assistant,
}

/// One entry of the combined conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Prompt or completion ID
    pub id: String,
    /// Speaker
    pub role: HistoryRole,
    /// Text
    pub content: String,
    /// Selections attached to user prompts; always empty for completions
    pub document_selections: Vec<DocumentSelection>,
    /// Model, for completions
    pub model: Option<String>,
    /// Prompt tokens, for completions
    pub input_tokens: Option<u32>,
    /// Completion tokens, for completions
    pub output_tokens: Option<u32>,
    /// Creation time (RFC 3339)
    pub created_at: String,
}

fn optional_u32(row: &SqliteRow, column: &str) -> Option<u32> {
    row.get::<Option<i64>, _>(column)
        .and_then(|value| u32::try_from(value).ok())
}

fn optional_f32(row: &SqliteRow, column: &str) -> Option<f32> {
    row.get::<Option<f64>, _>(column).map(|value| value as f32)
}

fn conversation_from_row(row: &SqliteRow) -> ConversationRecord {
    ConversationRecord {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        assistant_id: row.get("assistant_id"),
        temperature: optional_f32(row, "temperature"),
        top_p: optional_f32(row, "top_p"),
        max_output_tokens: optional_u32(row, "max_output_tokens"),
        system_prompt: row.get("system_prompt"),
        last_response_id: row.get("last_response_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const CONVERSATION_COLUMNS: &str = "id, tenant_id, user_id, title, assistant_id, temperature, \
     top_p, max_output_tokens, system_prompt, last_response_id, created_at, updated_at";

impl Database {
    pub(super) async fn migrate_conversations(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                assistant_id TEXT,
                temperature REAL,
                top_p REAL,
                max_output_tokens INTEGER,
                system_prompt TEXT,
                last_response_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .await?;

        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS prompts (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                tenant_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                document_selections TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            )
            ",
        )
        .await?;

        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS completions (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                tenant_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                response_id TEXT NOT NULL,
                model TEXT NOT NULL,
                input_tokens INTEGER NOT NULL DEFAULT 0,
                output_tokens INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
        )
        .await?;

        self.execute_ddl(
            "CREATE INDEX IF NOT EXISTS idx_conversations_owner ON conversations(tenant_id, user_id)",
        )
        .await?;
        self.execute_ddl(
            "CREATE INDEX IF NOT EXISTS idx_prompts_conversation ON prompts(conversation_id, created_at)",
        )
        .await?;
        self.execute_ddl(
            "CREATE INDEX IF NOT EXISTS idx_completions_conversation ON completions(conversation_id, created_at)",
        )
        .await
    }

    // ========================================================================
    // Conversations
    // ========================================================================

    /// Create a conversation
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_conversation(
        &self,
        tenant_id: TenantId,
        user_id: Uuid,
        request: &CreateConversation,
    ) -> AppResult<ConversationRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("New conversation")
            .to_owned();

        sqlx::query(
            r"
            INSERT INTO conversations (id, tenant_id, user_id, title, assistant_id, temperature,
                                       top_p, max_output_tokens, system_prompt, last_response_id,
                                       created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10, $10)
            ",
        )
        .bind(&id)
        .bind(tenant_id.to_column())
        .bind(user_id.to_string())
        .bind(&title)
        .bind(request.assistant_id.map(|a| a.to_string()))
        .bind(request.temperature.map(f64::from))
        .bind(request.top_p.map(f64::from))
        .bind(request.max_output_tokens.map(i64::from))
        .bind(request.system_prompt.as_deref())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create conversation: {e}")))?;

        Ok(ConversationRecord {
            id,
            tenant_id: tenant_id.to_column(),
            user_id: user_id.to_string(),
            title,
            assistant_id: request.assistant_id.map(|a| a.to_string()),
            temperature: request.temperature,
            top_p: request.top_p,
            max_output_tokens: request.max_output_tokens,
            system_prompt: request.system_prompt.clone(),
            last_response_id: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a conversation owned by the given user
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_conversation(
        &self,
        conversation_id: Uuid,
        tenant_id: TenantId,
        user_id: Uuid,
    ) -> AppResult<Option<ConversationRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE id = $1 AND tenant_id = $2 AND user_id = $3"
        ))
        .bind(conversation_id.to_string())
        .bind(tenant_id.to_column())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get conversation: {e}")))?;

        Ok(row.as_ref().map(conversation_from_row))
    }

    /// List a user's conversations, most recently updated first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_conversations(
        &self,
        tenant_id: TenantId,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<ConversationRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE tenant_id = $1 AND user_id = $2 \
             ORDER BY updated_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(tenant_id.to_column())
        .bind(user_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list conversations: {e}")))?;

        Ok(rows.iter().map(conversation_from_row).collect())
    }

    /// Apply a partial update; returns `false` when no row matched
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_conversation(
        &self,
        conversation_id: Uuid,
        tenant_id: TenantId,
        user_id: Uuid,
        patch: &ConversationPatch,
    ) -> AppResult<bool> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE conversations SET ");
        let mut fields = builder.separated(", ");
        if let Some(title) = &patch.title {
            fields.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(assistant_id) = patch.assistant_id {
            fields
                .push("assistant_id = ")
                .push_bind_unseparated(assistant_id.to_string());
        }
        if let Some(temperature) = patch.temperature {
            fields
                .push("temperature = ")
                .push_bind_unseparated(f64::from(temperature));
        }
        if let Some(top_p) = patch.top_p {
            fields.push("top_p = ").push_bind_unseparated(f64::from(top_p));
        }
        if let Some(max_output_tokens) = patch.max_output_tokens {
            fields
                .push("max_output_tokens = ")
                .push_bind_unseparated(i64::from(max_output_tokens));
        }
        if let Some(system_prompt) = &patch.system_prompt {
            fields
                .push("system_prompt = ")
                .push_bind_unseparated(system_prompt.clone());
        }
        fields.push("updated_at = ").push_bind_unseparated(now_timestamp());

        builder
            .push(" WHERE id = ")
            .push_bind(conversation_id.to_string())
            .push(" AND tenant_id = ")
            .push_bind(tenant_id.to_column())
            .push(" AND user_id = ")
            .push_bind(user_id.to_string());

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Link the conversation to the vendor response that ended its last turn
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn set_last_response_id(
        &self,
        conversation_id: Uuid,
        tenant_id: TenantId,
        response_id: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE conversations SET last_response_id = $1, updated_at = $2
            WHERE id = $3 AND tenant_id = $4
            ",
        )
        .bind(response_id)
        .bind(now_timestamp())
        .bind(conversation_id.to_string())
        .bind(tenant_id.to_column())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update last response: {e}")))?;
        Ok(())
    }

    /// Delete a conversation and its turns
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete_conversation(
        &self,
        conversation_id: Uuid,
        tenant_id: TenantId,
        user_id: Uuid,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM conversations WHERE id = $1 AND tenant_id = $2 AND user_id = $3",
        )
        .bind(conversation_id.to_string())
        .bind(tenant_id.to_column())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Turns
    // ========================================================================

    /// Persist a user prompt; missing selections are stored as `[]`
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the insert fails
    pub async fn insert_prompt(
        &self,
        conversation_id: Uuid,
        tenant_id: TenantId,
        user_id: Uuid,
        content: &str,
        document_selections: Option<&[DocumentSelection]>,
    ) -> AppResult<PromptRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let selections = document_selections.map(<[_]>::to_vec).unwrap_or_default();
        let selections_json = serde_json::to_string(&selections)?;

        sqlx::query(
            r"
            INSERT INTO prompts (id, conversation_id, tenant_id, user_id, content, document_selections, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(&id)
        .bind(conversation_id.to_string())
        .bind(tenant_id.to_column())
        .bind(user_id.to_string())
        .bind(content)
        .bind(&selections_json)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert prompt: {e}")))?;

        Ok(PromptRecord {
            id,
            conversation_id: conversation_id.to_string(),
            tenant_id: tenant_id.to_column(),
            user_id: user_id.to_string(),
            content: content.to_owned(),
            document_selections: selections,
            created_at: now,
        })
    }

    /// Fetch one prompt
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_prompt(&self, prompt_id: &str, tenant_id: TenantId) -> AppResult<Option<PromptRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, conversation_id, tenant_id, user_id, content, document_selections, created_at
            FROM prompts WHERE id = $1 AND tenant_id = $2
            ",
        )
        .bind(prompt_id)
        .bind(tenant_id.to_column())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get prompt: {e}")))?;

        Ok(row.map(|r| PromptRecord {
            id: r.get("id"),
            conversation_id: r.get("conversation_id"),
            tenant_id: r.get("tenant_id"),
            user_id: r.get("user_id"),
            content: r.get("content"),
            document_selections: json_column(r.get("document_selections")),
            created_at: r.get("created_at"),
        }))
    }

    /// Persist an assistant completion
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn insert_completion(&self, completion: &NewCompletion<'_>) -> AppResult<CompletionRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r"
            INSERT INTO completions (id, conversation_id, tenant_id, user_id, content, response_id,
                                     model, input_tokens, output_tokens, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(&id)
        .bind(completion.conversation_id.to_string())
        .bind(completion.tenant_id.to_column())
        .bind(completion.user_id.to_string())
        .bind(completion.content)
        .bind(completion.response_id)
        .bind(completion.model)
        .bind(i64::from(completion.input_tokens))
        .bind(i64::from(completion.output_tokens))
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert completion: {e}")))?;

        Ok(CompletionRecord {
            id,
            conversation_id: completion.conversation_id.to_string(),
            tenant_id: completion.tenant_id.to_column(),
            user_id: completion.user_id.to_string(),
            content: completion.content.to_owned(),
            response_id: completion.response_id.to_owned(),
            model: completion.model.to_owned(),
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            created_at: now,
        })
    }

    /// Combined prompts and completions, ascending by creation time
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_history(
        &self,
        conversation_id: Uuid,
        tenant_id: TenantId,
    ) -> AppResult<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r"
            SELECT id, 'user' AS role, content, document_selections,
                   NULL AS model, NULL AS input_tokens, NULL AS output_tokens, created_at, 0 AS seq
            FROM prompts WHERE conversation_id = $1 AND tenant_id = $2
            UNION ALL
            SELECT id, 'assistant' AS role, content, NULL AS document_selections,
                   model, input_tokens, output_tokens, created_at, 1 AS seq
            FROM completions WHERE conversation_id = $1 AND tenant_id = $2
            ORDER BY created_at ASC, seq ASC
            ",
        )
        .bind(conversation_id.to_string())
        .bind(tenant_id.to_column())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get history: {e}")))?;

        Ok(rows
            .iter()
            .map(|r| {
                let role = if r.get::<String, _>("role") == "user" {
                    HistoryRole::User
                } else {
                    HistoryRole::Assistant
                };
                HistoryEntry {
                    id: r.get("id"),
                    role,
                    content: r.get("content"),
                    document_selections: json_column(r.get("document_selections")),
                    model: r.get("model"),
                    input_tokens: optional_u32(r, "input_tokens"),
                    output_tokens: optional_u32(r, "output_tokens"),
                    created_at: r.get("created_at"),
                }
            })
            .collect())
    }
}
