// ABOUTME: Shared server resources handed to every HTTP handler through axum state
// ABOUTME: Holds the database, token validator, secret vault, per-tenant LLM factory, and config
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::auth::{AuthManager, AuthResult};
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::AppResult;
use crate::llm::{LlmClientFactory, TenantLlmClients, TenantLlmFactory};
use crate::models::TenantId;
use crate::services::ai_settings::AiSettingsService;
use crate::services::chat_orchestration::ChatOrchestrator;
use crate::services::credentials::CredentialService;
use crate::vault::{InMemoryVault, KeyVaultClient, SecretVault};

/// Everything request handlers share
pub struct ServerResources {
    /// Relational store
    pub database: Arc<Database>,
    /// Bearer token validator
    pub auth_manager: Arc<AuthManager>,
    /// Secret storage for credentials and tenant API keys
    pub vault: Arc<dyn SecretVault>,
    /// Builds vendor clients per tenant and request
    pub llm_factory: Arc<dyn LlmClientFactory>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    /// Assemble resources from explicit parts
    #[must_use]
    pub fn new(
        database: Arc<Database>,
        auth_manager: Arc<AuthManager>,
        vault: Arc<dyn SecretVault>,
        llm_factory: Arc<dyn LlmClientFactory>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            database,
            auth_manager,
            vault,
            llm_factory,
            config,
        }
    }

    /// Connect the database and build production collaborators from config
    ///
    /// Without `VAULT_URL` secrets are kept in process memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the database or the vault client cannot be set up
    pub async fn from_config(config: ServerConfig) -> AppResult<Self> {
        let database = Arc::new(Database::new(&config.database).await?);
        let vault: Arc<dyn SecretVault> = if config.vault.url.is_some() {
            Arc::new(KeyVaultClient::new(&config.vault)?)
        } else {
            Arc::new(InMemoryVault::new())
        };
        let llm_factory = Arc::new(TenantLlmFactory::new(
            Arc::clone(&database),
            Arc::clone(&vault),
            config.llm.clone(),
        ));

        Ok(Self::new(
            database,
            Arc::new(AuthManager::from_config(&config.auth)),
            vault,
            llm_factory,
            Arc::new(config),
        ))
    }

    /// Resolve the caller from request headers
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` or `AuthInvalid`
    pub fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthResult> {
        self.auth_manager.authenticate(headers)
    }

    /// Fresh vendor clients for a tenant
    ///
    /// # Errors
    ///
    /// Returns a configuration, vault, or database error
    pub async fn llm_clients(&self, tenant_id: TenantId) -> AppResult<TenantLlmClients> {
        self.llm_factory.clients_for_tenant(tenant_id).await
    }

    /// Orchestrator over a tenant's vendor clients
    ///
    /// # Errors
    ///
    /// See [`Self::llm_clients`]
    pub async fn orchestrator(&self, tenant_id: TenantId) -> AppResult<ChatOrchestrator> {
        let clients = self.llm_clients(tenant_id).await?;
        Ok(ChatOrchestrator::new(Arc::clone(&self.database), &clients))
    }

    /// Credential service over the shared vault
    #[must_use]
    pub fn credentials(&self) -> CredentialService {
        CredentialService::new(Arc::clone(&self.database), Arc::clone(&self.vault))
    }

    /// AI settings service over the shared vault
    #[must_use]
    pub fn ai_settings(&self) -> AiSettingsService {
        AiSettingsService::new(
            Arc::clone(&self.database),
            Arc::clone(&self.vault),
            self.config.llm.clone(),
        )
    }
}
