// ABOUTME: Append-only token usage ledger, one row per vendor call
// ABOUTME: Aggregates usage per conversation for the usage endpoint

use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use super::{now_timestamp, Database};
use crate::errors::{AppError, AppResult};
use crate::models::TenantId;

/// One vendor call's token counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsageRecord {
    /// Tenant billed for the call
    pub tenant_id: TenantId,
    /// User the call was made for
    pub user_id: Uuid,
    /// Conversation, when the call belonged to one
    pub conversation_id: Option<Uuid>,
    /// Vendor label
    pub vendor: String,
    /// Model used
    pub model: String,
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
}

/// Aggregated usage of one conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Number of vendor calls
    pub calls: i64,
    /// Sum of prompt tokens
    pub prompt_tokens: i64,
    /// Sum of completion tokens
    pub completion_tokens: i64,
    /// Sum of both
    pub total_tokens: i64,
}

impl Database {
    pub(super) async fn migrate_usage(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS token_usage (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                conversation_id TEXT,
                vendor TEXT NOT NULL,
                model TEXT NOT NULL,
                prompt_tokens INTEGER NOT NULL,
                completion_tokens INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .await?;
        self.execute_ddl(
            "CREATE INDEX IF NOT EXISTS idx_token_usage_conversation ON token_usage(tenant_id, conversation_id)",
        )
        .await
    }

    /// Append a usage row
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn insert_token_usage(&self, record: &TokenUsageRecord) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO token_usage (id, tenant_id, user_id, conversation_id, vendor, model,
                                     prompt_tokens, completion_tokens, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(record.tenant_id.to_column())
        .bind(record.user_id.to_string())
        .bind(record.conversation_id.map(|c| c.to_string()))
        .bind(&record.vendor)
        .bind(&record.model)
        .bind(i64::from(record.prompt_tokens))
        .bind(i64::from(record.completion_tokens))
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record token usage: {e}")))?;
        Ok(())
    }

    /// Sum the usage rows of one conversation
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_conversation_usage(
        &self,
        conversation_id: Uuid,
        tenant_id: TenantId,
    ) -> AppResult<UsageSummary> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS calls,
                   COALESCE(SUM(prompt_tokens), 0) AS prompt_tokens,
                   COALESCE(SUM(completion_tokens), 0) AS completion_tokens
            FROM token_usage
            WHERE conversation_id = $1 AND tenant_id = $2
            ",
        )
        .bind(conversation_id.to_string())
        .bind(tenant_id.to_column())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to sum token usage: {e}")))?;

        let prompt_tokens: i64 = row.get("prompt_tokens");
        let completion_tokens: i64 = row.get("completion_tokens");
        Ok(UsageSummary {
            calls: row.get("calls"),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        })
    }
}
