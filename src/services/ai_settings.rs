// ABOUTME: Tenant AI settings: vendor endpoint, model overrides, and a bring-your-own API key
// ABOUTME: The key is written to the vault; reads only report whether one is configured

use std::sync::Arc;

use serde::Serialize;

use crate::config::LlmConfig;
use crate::database::{Database, TenantAiSettingsUpdate};
use crate::errors::{AppError, AppResult};
use crate::logging::TenantLogger;
use crate::models::TenantId;
use crate::vault::{llm_key_secret_name, SecretVault};

/// Effective AI settings as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiSettingsView {
    /// API root in effect
    pub base_url: String,
    /// Chat model in effect
    pub model: String,
    /// Embedding model in effect
    pub embedding_model: String,
    /// Whether the tenant stored its own API key
    pub has_api_key: bool,
}

/// Reads and updates tenant AI settings
pub struct AiSettingsService {
    database: Arc<Database>,
    vault: Arc<dyn SecretVault>,
    defaults: LlmConfig,
}

impl AiSettingsService {
    /// Create a service; `defaults` fill every field the tenant left unset
    #[must_use]
    pub fn new(database: Arc<Database>, vault: Arc<dyn SecretVault>, defaults: LlmConfig) -> Self {
        Self {
            database,
            vault,
            defaults,
        }
    }

    /// Effective settings for a tenant
    ///
    /// # Errors
    ///
    /// Returns a database error
    pub async fn get(&self, tenant_id: TenantId) -> AppResult<AiSettingsView> {
        let stored = self.database.get_ai_settings(tenant_id).await?;
        let stored = stored.as_ref();
        Ok(AiSettingsView {
            base_url: stored
                .and_then(|s| s.base_url.clone())
                .unwrap_or_else(|| self.defaults.base_url.clone()),
            model: stored
                .and_then(|s| s.model.clone())
                .unwrap_or_else(|| self.defaults.model.clone()),
            embedding_model: stored
                .and_then(|s| s.embedding_model.clone())
                .unwrap_or_else(|| self.defaults.embedding_model.clone()),
            has_api_key: stored.is_some_and(crate::database::TenantAiSettings::has_api_key),
        })
    }

    /// Apply an update; a new key overwrites the tenant's vault secret
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank key, or a vault or database error
    pub async fn update(
        &self,
        tenant_id: TenantId,
        update: &TenantAiSettingsUpdate,
    ) -> AppResult<AiSettingsView> {
        let secret_name = match update.api_key.as_deref() {
            Some(key) if key.trim().is_empty() => {
                return Err(AppError::invalid_input("api_key must not be empty"));
            }
            Some(key) => {
                let name = llm_key_secret_name(tenant_id);
                let stored = self.vault.set_secret(&name, key).await;
                TenantLogger::log_vault_operation(tenant_id, "set", &name, stored.is_ok());
                stored?;
                Some(name)
            }
            None => None,
        };

        self.database
            .upsert_ai_settings(tenant_id, secret_name.as_deref(), update)
            .await?;
        self.get(tenant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseUrl;
    use crate::vault::InMemoryVault;

    async fn service() -> (AiSettingsService, Arc<InMemoryVault>) {
        let database = Arc::new(Database::new(&DatabaseUrl::Memory).await.unwrap());
        let vault = Arc::new(InMemoryVault::new());
        (
            AiSettingsService::new(database, vault.clone(), LlmConfig::default()),
            vault,
        )
    }

    #[tokio::test]
    async fn test_defaults_until_updated() {
        let (service, _) = service().await;
        let view = service.get(TenantId::new()).await.unwrap();
        assert_eq!(view.model, LlmConfig::default().model);
        assert!(!view.has_api_key);
    }

    #[tokio::test]
    async fn test_key_goes_to_vault_and_is_never_returned() {
        let (service, vault) = service().await;
        let tenant_id = TenantId::new();

        let view = service
            .update(
                tenant_id,
                &TenantAiSettingsUpdate {
                    api_key: Some("sk-tenant".to_owned()),
                    model: Some("gpt-4.1-mini".to_owned()),
                    ..TenantAiSettingsUpdate::default()
                },
            )
            .await
            .unwrap();

        assert!(view.has_api_key);
        assert_eq!(view.model, "gpt-4.1-mini");
        assert_eq!(
            vault
                .get_secret(&llm_key_secret_name(tenant_id))
                .await
                .unwrap()
                .as_deref(),
            Some("sk-tenant")
        );
        assert!(!serde_json::to_string(&view).unwrap().contains("sk-tenant"));

        // A later model-only update keeps the key
        let view = service
            .update(
                tenant_id,
                &TenantAiSettingsUpdate {
                    embedding_model: Some("text-embedding-3-large".to_owned()),
                    ..TenantAiSettingsUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(view.has_api_key);
        assert_eq!(view.model, "gpt-4.1-mini");
    }
}
