// ABOUTME: Per-tenant LLM vendor settings that override the server defaults
// ABOUTME: The API key itself is kept in the secret vault; the row stores only the secret name

use serde::{Deserialize, Serialize};
use sqlx::Row;

use super::{now_timestamp, Database};
use crate::errors::{AppError, AppResult};
use crate::models::TenantId;

/// Stored vendor settings of one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantAiSettings {
    /// Tenant the settings belong to
    pub tenant_id: String,
    /// Vault secret holding the tenant's API key
    #[serde(skip_serializing, default)]
    pub api_key_secret: Option<String>,
    /// API root override
    pub base_url: Option<String>,
    /// Chat model override
    pub model: Option<String>,
    /// Embedding model override
    pub embedding_model: Option<String>,
    /// Last update time (RFC 3339)
    pub updated_at: String,
}

impl TenantAiSettings {
    /// Whether the tenant brought its own API key
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key_secret.is_some()
    }
}

/// Settings update; omitted fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantAiSettingsUpdate {
    /// New API key, written to the vault
    pub api_key: Option<String>,
    /// New API root
    pub base_url: Option<String>,
    /// New chat model
    pub model: Option<String>,
    /// New embedding model
    pub embedding_model: Option<String>,
}

impl Database {
    pub(super) async fn migrate_ai_settings(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS tenant_ai_settings (
                tenant_id TEXT PRIMARY KEY,
                api_key_secret TEXT,
                base_url TEXT,
                model TEXT,
                embedding_model TEXT,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .await
    }

    /// Get a tenant's vendor settings
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_ai_settings(&self, tenant_id: TenantId) -> AppResult<Option<TenantAiSettings>> {
        let row = sqlx::query(
            r"
            SELECT tenant_id, api_key_secret, base_url, model, embedding_model, updated_at
            FROM tenant_ai_settings WHERE tenant_id = $1
            ",
        )
        .bind(tenant_id.to_column())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get AI settings: {e}")))?;

        Ok(row.map(|r| TenantAiSettings {
            tenant_id: r.get("tenant_id"),
            api_key_secret: r.get("api_key_secret"),
            base_url: r.get("base_url"),
            model: r.get("model"),
            embedding_model: r.get("embedding_model"),
            updated_at: r.get("updated_at"),
        }))
    }

    /// Insert or merge a tenant's vendor settings
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails
    pub async fn upsert_ai_settings(
        &self,
        tenant_id: TenantId,
        api_key_secret: Option<&str>,
        update: &TenantAiSettingsUpdate,
    ) -> AppResult<TenantAiSettings> {
        sqlx::query(
            r"
            INSERT INTO tenant_ai_settings (tenant_id, api_key_secret, base_url, model, embedding_model, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT(tenant_id) DO UPDATE SET
                api_key_secret = COALESCE(excluded.api_key_secret, tenant_ai_settings.api_key_secret),
                base_url = COALESCE(excluded.base_url, tenant_ai_settings.base_url),
                model = COALESCE(excluded.model, tenant_ai_settings.model),
                embedding_model = COALESCE(excluded.embedding_model, tenant_ai_settings.embedding_model),
                updated_at = excluded.updated_at
            ",
        )
        .bind(tenant_id.to_column())
        .bind(api_key_secret)
        .bind(update.base_url.as_deref())
        .bind(update.model.as_deref())
        .bind(update.embedding_model.as_deref())
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save AI settings: {e}")))?;

        self.get_ai_settings(tenant_id)
            .await?
            .ok_or_else(|| AppError::internal("AI settings missing after upsert"))
    }
}
