// ABOUTME: Builds short-lived vendor clients per tenant from tenant AI settings or server defaults
// ABOUTME: Tenant API keys are resolved from the secret vault; nothing is cached between requests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::sse_parser::RetryConfig;
use super::{LlmClientFactory, OpenAiResponsesClient, OpenAiResponsesConfig, TenantLlmClients};
use crate::config::LlmConfig;
use crate::database::{Database, TenantAiSettings};
use crate::errors::{AppError, AppResult};
use crate::models::TenantId;
use crate::vault::SecretVault;

/// Where a tenant's API key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeySource {
    Tenant,
    Server,
}

impl KeySource {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::Server => "server",
        }
    }
}

/// Resolves per-tenant vendor clients
///
/// Resolution order for the API key:
/// 1. The tenant's own key, stored in the vault
/// 2. The server-wide `LLM_API_KEY`
pub struct TenantLlmFactory {
    database: Arc<Database>,
    vault: Arc<dyn SecretVault>,
    defaults: LlmConfig,
}

impl TenantLlmFactory {
    /// Create a factory over the shared database and vault
    #[must_use]
    pub fn new(database: Arc<Database>, vault: Arc<dyn SecretVault>, defaults: LlmConfig) -> Self {
        Self {
            database,
            vault,
            defaults,
        }
    }

    async fn resolve_api_key(
        &self,
        tenant_id: TenantId,
        settings: Option<&TenantAiSettings>,
    ) -> AppResult<(String, KeySource)> {
        if let Some(secret_name) = settings.and_then(|s| s.api_key_secret.as_deref()) {
            let key = self.vault.get_secret(secret_name).await?.ok_or_else(|| {
                AppError::config(format!("API key secret for tenant {tenant_id} is missing"))
            })?;
            return Ok((key, KeySource::Tenant));
        }

        self.defaults
            .api_key
            .clone()
            .map(|key| (key, KeySource::Server))
            .ok_or_else(|| {
                AppError::config(format!(
                    "No LLM API key configured for tenant {tenant_id} and LLM_API_KEY is not set"
                ))
            })
    }
}

#[async_trait]
impl LlmClientFactory for TenantLlmFactory {
    async fn clients_for_tenant(&self, tenant_id: TenantId) -> AppResult<TenantLlmClients> {
        let settings = self.database.get_ai_settings(tenant_id).await?;
        let (api_key, source) = self.resolve_api_key(tenant_id, settings.as_ref()).await?;

        let pick = |field: fn(&TenantAiSettings) -> Option<&String>, fallback: &String| {
            settings
                .as_ref()
                .and_then(field)
                .unwrap_or(fallback)
                .clone()
        };
        let base_url = pick(|s| s.base_url.as_ref(), &self.defaults.base_url);
        let model = pick(|s| s.model.as_ref(), &self.defaults.model);
        let embedding_model = pick(|s| s.embedding_model.as_ref(), &self.defaults.embedding_model);

        debug!(
            tenant_id = %tenant_id,
            key_source = source.as_str(),
            model = %model,
            "Resolved tenant LLM settings"
        );

        let client = Arc::new(OpenAiResponsesClient::new(OpenAiResponsesConfig {
            base_url,
            api_key,
            embedding_model,
            vendor: self.defaults.vendor.clone(),
            retry: RetryConfig::default_config(),
        })?);

        info!(tenant_id = %tenant_id, key_source = source.as_str(), "Created tenant LLM client");

        Ok(TenantLlmClients {
            responses: client.clone(),
            embeddings: client,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseUrl;
    use crate::database::TenantAiSettingsUpdate;
    use crate::vault::InMemoryVault;

    async fn factory(api_key: Option<&str>) -> (TenantLlmFactory, Arc<Database>, Arc<InMemoryVault>) {
        let database = Arc::new(Database::new(&DatabaseUrl::Memory).await.unwrap());
        let vault = Arc::new(InMemoryVault::new());
        let defaults = LlmConfig {
            api_key: api_key.map(str::to_owned),
            ..LlmConfig::default()
        };
        (
            TenantLlmFactory::new(database.clone(), vault.clone(), defaults),
            database,
            vault,
        )
    }

    #[tokio::test]
    async fn test_falls_back_to_server_defaults() {
        let (factory, _, _) = factory(Some("server-key")).await;
        let clients = factory.clients_for_tenant(TenantId::new()).await.unwrap();
        assert_eq!(clients.model, LlmConfig::default().model);
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let (factory, _, _) = factory(None).await;
        let Err(error) = factory.clients_for_tenant(TenantId::new()).await else {
            panic!("expected a configuration error");
        };
        assert_eq!(error.code, crate::errors::ErrorCode::ConfigError);
    }

    #[tokio::test]
    async fn test_tenant_overrides_and_vault_key() {
        let (factory, database, vault) = factory(None).await;
        let tenant_id = TenantId::new();
        vault.set_secret("llm-key-x", "tenant-key").await.unwrap();
        database
            .upsert_ai_settings(
                tenant_id,
                Some("llm-key-x"),
                &TenantAiSettingsUpdate {
                    model: Some("gpt-4.1-mini".to_owned()),
                    ..TenantAiSettingsUpdate::default()
                },
            )
            .await
            .unwrap();

        let clients = factory.clients_for_tenant(tenant_id).await.unwrap();
        assert_eq!(clients.model, "gpt-4.1-mini");
        assert_eq!(clients.responses.vendor(), "openai");
    }
}
