// ABOUTME: Cloud credential references; the secret material itself lives only in the vault
// ABOUTME: Rows map a tenant-visible credential name to its vault secret name

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{now_timestamp, Database};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::TenantId;

/// A stored credential reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Credential ID
    pub id: String,
    /// Owning tenant
    pub tenant_id: String,
    /// Tenant-unique display name
    pub name: String,
    /// Cloud provider (e.g. `azure`, `aws`)
    pub provider: String,
    /// Vault secret holding the material
    #[serde(skip_serializing, default)]
    pub secret_name: String,
    /// Creation time (RFC 3339)
    pub created_at: String,
}

fn credential_from_row(row: &SqliteRow) -> CredentialRecord {
    CredentialRecord {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        name: row.get("name"),
        provider: row.get("provider"),
        secret_name: row.get("secret_name"),
        created_at: row.get("created_at"),
    }
}

impl Database {
    pub(super) async fn migrate_credentials(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS cloud_credentials (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                name TEXT NOT NULL,
                provider TEXT NOT NULL,
                secret_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (tenant_id, name)
            )
            ",
        )
        .await
    }

    /// Record a credential whose secret was already written to the vault
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` when the name is taken, or a database error
    pub async fn insert_credential(
        &self,
        credential_id: Uuid,
        tenant_id: TenantId,
        name: &str,
        provider: &str,
        secret_name: &str,
    ) -> AppResult<CredentialRecord> {
        let now = now_timestamp();

        sqlx::query(
            r"
            INSERT INTO cloud_credentials (id, tenant_id, name, provider, secret_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(credential_id.to_string())
        .bind(tenant_id.to_column())
        .bind(name)
        .bind(provider)
        .bind(secret_name)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if duplicate {
                AppError::new(
                    ErrorCode::ResourceAlreadyExists,
                    format!("Credential '{name}' already exists"),
                )
            } else {
                AppError::database(format!("Failed to insert credential: {e}"))
            }
        })?;

        Ok(CredentialRecord {
            id: credential_id.to_string(),
            tenant_id: tenant_id.to_column(),
            name: name.to_owned(),
            provider: provider.to_owned(),
            secret_name: secret_name.to_owned(),
            created_at: now,
        })
    }

    /// Get a tenant's credential reference
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_credential(
        &self,
        credential_id: Uuid,
        tenant_id: TenantId,
    ) -> AppResult<Option<CredentialRecord>> {
        let row = sqlx::query("SELECT * FROM cloud_credentials WHERE id = $1 AND tenant_id = $2")
            .bind(credential_id.to_string())
            .bind(tenant_id.to_column())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get credential: {e}")))?;

        Ok(row.as_ref().map(credential_from_row))
    }

    /// List a tenant's credential references
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_credentials(&self, tenant_id: TenantId) -> AppResult<Vec<CredentialRecord>> {
        let rows =
            sqlx::query("SELECT * FROM cloud_credentials WHERE tenant_id = $1 ORDER BY name ASC")
                .bind(tenant_id.to_column())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to list credentials: {e}")))?;

        Ok(rows.iter().map(credential_from_row).collect())
    }

    /// Delete a credential reference
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete_credential(&self, credential_id: Uuid, tenant_id: TenantId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM cloud_credentials WHERE id = $1 AND tenant_id = $2")
            .bind(credential_id.to_string())
            .bind(tenant_id.to_column())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete credential: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
