// ABOUTME: Secret vault abstraction for cloud credentials and tenant LLM API keys
// ABOUTME: Provides the SecretVault trait, a Key Vault REST client, and an in-memory vault
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Secret Vault
//!
//! Secret material never touches the relational store. Rows keep a secret
//! name; values are read from and written to a [`SecretVault`].

mod key_vault;

pub use key_vault::KeyVaultClient;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::TenantId;

/// Key/value secret storage
#[async_trait]
pub trait SecretVault: Send + Sync {
    /// Read a secret; `None` when it does not exist
    async fn get_secret(&self, name: &str) -> AppResult<Option<String>>;

    /// Create or overwrite a secret
    async fn set_secret(&self, name: &str, value: &str) -> AppResult<()>;

    /// Delete a secret; deleting a missing secret succeeds
    async fn delete_secret(&self, name: &str) -> AppResult<()>;
}

/// Vault secret name for a cloud credential
#[must_use]
pub fn credential_secret_name(tenant_id: TenantId, credential_id: Uuid) -> String {
    format!("cred-{tenant_id}-{credential_id}")
}

/// Vault secret name for a tenant's LLM API key
#[must_use]
pub fn llm_key_secret_name(tenant_id: TenantId) -> String {
    format!("llm-key-{tenant_id}")
}

/// Process-local vault for development and tests
#[derive(Debug, Default)]
pub struct InMemoryVault {
    secrets: DashMap<String, String>,
}

impl InMemoryVault {
    /// Create an empty vault
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether the vault is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait]
impl SecretVault for InMemoryVault {
    async fn get_secret(&self, name: &str) -> AppResult<Option<String>> {
        Ok(self.secrets.get(name).map(|entry| entry.value().clone()))
    }

    async fn set_secret(&self, name: &str, value: &str) -> AppResult<()> {
        self.secrets.insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete_secret(&self, name: &str) -> AppResult<()> {
        self.secrets.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_vault_lifecycle() {
        let vault = InMemoryVault::new();
        assert_eq!(vault.get_secret("a").await.unwrap(), None);

        vault.set_secret("a", "one").await.unwrap();
        vault.set_secret("a", "two").await.unwrap();
        assert_eq!(vault.get_secret("a").await.unwrap().as_deref(), Some("two"));
        assert_eq!(vault.len(), 1);

        vault.delete_secret("a").await.unwrap();
        vault.delete_secret("a").await.unwrap();
        assert!(vault.is_empty());
    }

    #[test]
    fn test_secret_names_use_vault_safe_characters() {
        let name = credential_secret_name(TenantId::new(), Uuid::new_v4());
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
        assert!(llm_key_secret_name(TenantId::new()).starts_with("llm-key-"));
    }
}
