// ABOUTME: Cloud credential lifecycle spanning the secret vault and the relational reference row
// ABOUTME: Secret material goes to the vault; the database keeps only name, provider, and secret name
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::database::{CredentialRecord, Database};
use crate::errors::{AppError, AppResult};
use crate::logging::TenantLogger;
use crate::models::TenantId;
use crate::vault::{credential_secret_name, SecretVault};

/// Body of a credential creation request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCredential {
    /// Tenant-unique display name
    pub name: String,
    /// Cloud provider (e.g. `azure`)
    pub provider: String,
    /// Secret material; never persisted outside the vault
    pub secret: String,
}

/// Credential operations for one tenant scope
pub struct CredentialService {
    database: Arc<Database>,
    vault: Arc<dyn SecretVault>,
}

impl CredentialService {
    /// Create a service over the shared database and vault
    #[must_use]
    pub fn new(database: Arc<Database>, vault: Arc<dyn SecretVault>) -> Self {
        Self { database, vault }
    }

    /// Store the secret, then record the reference row
    ///
    /// The vault secret is removed again when the row cannot be written.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for blank fields, `ResourceAlreadyExists` for a
    /// duplicate name, or a vault or database error
    pub async fn create(
        &self,
        tenant_id: TenantId,
        request: &CreateCredential,
    ) -> AppResult<CredentialRecord> {
        for (field, value) in [
            ("name", &request.name),
            ("provider", &request.provider),
            ("secret", &request.secret),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::invalid_input(format!("{field} must not be empty")));
            }
        }

        let credential_id = Uuid::new_v4();
        let secret_name = credential_secret_name(tenant_id, credential_id);

        let stored = self.vault.set_secret(&secret_name, &request.secret).await;
        TenantLogger::log_vault_operation(tenant_id, "set", &secret_name, stored.is_ok());
        stored?;

        match self
            .database
            .insert_credential(
                credential_id,
                tenant_id,
                &request.name,
                &request.provider,
                &secret_name,
            )
            .await
        {
            Ok(record) => Ok(record),
            Err(e) => {
                let cleanup = self.vault.delete_secret(&secret_name).await;
                TenantLogger::log_vault_operation(
                    tenant_id,
                    "rollback",
                    &secret_name,
                    cleanup.is_ok(),
                );
                if let Err(cleanup) = cleanup {
                    warn!(
                        tenant_id = %tenant_id,
                        secret_name = %secret_name,
                        error = %cleanup,
                        "Failed to remove orphaned credential secret"
                    );
                }
                Err(e)
            }
        }
    }

    /// List credential references
    ///
    /// # Errors
    ///
    /// Returns a database error
    pub async fn list(&self, tenant_id: TenantId) -> AppResult<Vec<CredentialRecord>> {
        self.database.list_credentials(tenant_id).await
    }

    /// Get one credential reference
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` or a database error
    pub async fn get(&self, tenant_id: TenantId, credential_id: Uuid) -> AppResult<CredentialRecord> {
        self.database
            .get_credential(credential_id, tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Credential"))
    }

    /// Delete the reference row, then the secret
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` or a database error; a vault failure after
    /// the row is gone is logged and the delete still succeeds
    pub async fn delete(&self, tenant_id: TenantId, credential_id: Uuid) -> AppResult<()> {
        let record = self.get(tenant_id, credential_id).await?;
        if !self.database.delete_credential(credential_id, tenant_id).await? {
            return Err(AppError::not_found("Credential"));
        }

        let deleted = self.vault.delete_secret(&record.secret_name).await;
        TenantLogger::log_vault_operation(tenant_id, "delete", &record.secret_name, deleted.is_ok());
        if let Err(e) = deleted {
            warn!(tenant_id = %tenant_id, error = %e, "Credential secret left in vault");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::config::DatabaseUrl;
    use crate::errors::ErrorCode;
    use crate::vault::InMemoryVault;

    async fn service() -> (CredentialService, Arc<InMemoryVault>) {
        let database = Arc::new(Database::new(&DatabaseUrl::Memory).await.unwrap());
        let vault = Arc::new(InMemoryVault::new());
        (CredentialService::new(database, vault.clone()), vault)
    }

    fn request(name: &str) -> CreateCredential {
        CreateCredential {
            name: name.to_owned(),
            provider: "azure".to_owned(),
            secret: "client-secret".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_create_and_delete_keep_vault_in_step() {
        let (service, vault) = service().await;
        let tenant_id = TenantId::new();

        let record = service.create(tenant_id, &request("prod")).await.unwrap();
        assert_eq!(vault.len(), 1);
        assert_eq!(
            vault.get_secret(&record.secret_name).await.unwrap().as_deref(),
            Some("client-secret")
        );

        let id = Uuid::parse_str(&record.id).unwrap();
        service.delete(tenant_id, id).await.unwrap();
        assert!(vault.is_empty());
        assert_eq!(
            service.get(tenant_id, id).await.unwrap_err().code,
            ErrorCode::ResourceNotFound
        );
    }

    #[tokio::test]
    async fn test_duplicate_name_rolls_back_secret() {
        let (service, vault) = service().await;
        let tenant_id = TenantId::new();

        service.create(tenant_id, &request("prod")).await.unwrap();
        let error = service.create(tenant_id, &request("prod")).await.unwrap_err();

        assert_eq!(error.code, ErrorCode::ResourceAlreadyExists);
        assert_eq!(vault.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_secret_is_rejected_before_vault() {
        let (service, vault) = service().await;
        let mut body = request("prod");
        body.secret = " ".to_owned();

        let error = service.create(TenantId::new(), &body).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidInput);
        assert!(vault.is_empty());
    }

    struct BrokenVault;

    #[async_trait]
    impl SecretVault for BrokenVault {
        async fn get_secret(&self, _: &str) -> AppResult<Option<String>> {
            Ok(None)
        }
        async fn set_secret(&self, _: &str, _: &str) -> AppResult<()> {
            Err(AppError::external_service("Secret vault", "unavailable"))
        }
        async fn delete_secret(&self, _: &str) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_vault_failure_writes_no_row() {
        let database = Arc::new(Database::new(&DatabaseUrl::Memory).await.unwrap());
        let service = CredentialService::new(database, Arc::new(BrokenVault));
        let tenant_id = TenantId::new();

        let error = service.create(tenant_id, &request("prod")).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::ExternalServiceError);
        assert!(service.list(tenant_id).await.unwrap().is_empty());
    }

    /// Stores secrets but refuses to delete them
    struct UndeletableVault(InMemoryVault);

    #[async_trait]
    impl SecretVault for UndeletableVault {
        async fn get_secret(&self, name: &str) -> AppResult<Option<String>> {
            self.0.get_secret(name).await
        }
        async fn set_secret(&self, name: &str, value: &str) -> AppResult<()> {
            self.0.set_secret(name, value).await
        }
        async fn delete_secret(&self, _: &str) -> AppResult<()> {
            Err(AppError::external_service("Secret vault", "delete refused"))
        }
    }

    #[tokio::test]
    async fn test_failed_rollback_still_reports_duplicate_name() {
        let database = Arc::new(Database::new(&DatabaseUrl::Memory).await.unwrap());
        let vault = Arc::new(UndeletableVault(InMemoryVault::new()));
        let service = CredentialService::new(database, vault.clone());
        let tenant_id = TenantId::new();

        service.create(tenant_id, &request("prod")).await.unwrap();
        let error = service.create(tenant_id, &request("prod")).await.unwrap_err();

        assert_eq!(error.code, ErrorCode::ResourceAlreadyExists);
        // The orphaned secret stays behind; only the log reports the failed rollback
        assert_eq!(vault.0.len(), 2);
        assert_eq!(service.list(tenant_id).await.unwrap().len(), 1);
    }
}
