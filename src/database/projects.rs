// ABOUTME: Project and template persistence; community templates are readable by every tenant
// ABOUTME: Backs the project_info tool and the projects CRUD endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::{now_timestamp, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{ResourceGroupType, TenantId};

/// A project, template, or community template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Project ID
    pub id: String,
    /// Owning tenant
    pub tenant_id: String,
    /// Project, template, or community template
    pub kind: ResourceGroupType,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Target cloud (e.g. `azure`)
    pub cloud_provider: Option<String>,
    /// Target region
    pub region: Option<String>,
    /// Arbitrary JSON metadata
    pub metadata: Value,
    /// Creation time (RFC 3339)
    pub created_at: String,
    /// Last update time (RFC 3339)
    pub updated_at: String,
}

/// Fields accepted when creating a project
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    /// Kind; defaults to `project`
    #[serde(default)]
    pub kind: ResourceGroupType,
    /// Display name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Target cloud
    pub cloud_provider: Option<String>,
    /// Target region
    pub region: Option<String>,
    /// Metadata; defaults to `{}`
    pub metadata: Option<Value>,
}

/// Partial update; only supplied fields are written
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New cloud
    pub cloud_provider: Option<String>,
    /// New region
    pub region: Option<String>,
    /// Replacement metadata
    pub metadata: Option<Value>,
}

fn project_from_row(row: &SqliteRow) -> ProjectRecord {
    ProjectRecord {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        kind: row
            .get::<String, _>("kind")
            .parse()
            .unwrap_or_default(),
        name: row.get("name"),
        description: row.get("description"),
        cloud_provider: row.get("cloud_provider"),
        region: row.get("region"),
        metadata: serde_json::from_str(&row.get::<String, _>("metadata"))
            .unwrap_or(Value::Object(serde_json::Map::new())),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl Database {
    pub(super) async fn migrate_projects(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('project', 'template', 'community_template')),
                name TEXT NOT NULL,
                description TEXT,
                cloud_provider TEXT,
                region TEXT,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .await?;
        self.execute_ddl("CREATE INDEX IF NOT EXISTS idx_projects_tenant ON projects(tenant_id, kind)")
            .await
    }

    /// Create a project or template
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_project(
        &self,
        tenant_id: TenantId,
        request: &CreateProject,
    ) -> AppResult<ProjectRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let metadata = request
            .metadata
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        sqlx::query(
            r"
            INSERT INTO projects (id, tenant_id, kind, name, description, cloud_provider, region,
                                  metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ",
        )
        .bind(&id)
        .bind(tenant_id.to_column())
        .bind(request.kind.as_str())
        .bind(&request.name)
        .bind(request.description.as_deref())
        .bind(request.cloud_provider.as_deref())
        .bind(request.region.as_deref())
        .bind(metadata.to_string())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create project: {e}")))?;

        Ok(ProjectRecord {
            id,
            tenant_id: tenant_id.to_column(),
            kind: request.kind,
            name: request.name.clone(),
            description: request.description.clone(),
            cloud_provider: request.cloud_provider.clone(),
            region: request.region.clone(),
            metadata,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a project visible to the tenant (own rows plus community templates)
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_project(
        &self,
        project_id: Uuid,
        tenant_id: TenantId,
    ) -> AppResult<Option<ProjectRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, tenant_id, kind, name, description, cloud_provider, region, metadata,
                   created_at, updated_at
            FROM projects
            WHERE id = $1 AND (tenant_id = $2 OR kind = 'community_template')
            ",
        )
        .bind(project_id.to_string())
        .bind(tenant_id.to_column())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get project: {e}")))?;

        Ok(row.as_ref().map(project_from_row))
    }

    /// List projects visible to the tenant, optionally filtered by kind
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_projects(
        &self,
        tenant_id: TenantId,
        kind: Option<ResourceGroupType>,
    ) -> AppResult<Vec<ProjectRecord>> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT id, tenant_id, kind, name, description, cloud_provider, region, metadata, \
             created_at, updated_at FROM projects WHERE (tenant_id = ",
        );
        builder
            .push_bind(tenant_id.to_column())
            .push(" OR kind = 'community_template')");
        if let Some(kind) = kind {
            builder.push(" AND kind = ").push_bind(kind.as_str());
        }
        builder.push(" ORDER BY updated_at DESC");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list projects: {e}")))?;

        Ok(rows.iter().map(project_from_row).collect())
    }

    /// Apply a partial update to a project owned by the tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_project(
        &self,
        project_id: Uuid,
        tenant_id: TenantId,
        patch: &ProjectPatch,
    ) -> AppResult<bool> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE projects SET ");
        let mut fields = builder.separated(", ");
        if let Some(name) = &patch.name {
            fields.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(description) = &patch.description {
            fields
                .push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(cloud_provider) = &patch.cloud_provider {
            fields
                .push("cloud_provider = ")
                .push_bind_unseparated(cloud_provider.clone());
        }
        if let Some(region) = &patch.region {
            fields.push("region = ").push_bind_unseparated(region.clone());
        }
        if let Some(metadata) = &patch.metadata {
            fields
                .push("metadata = ")
                .push_bind_unseparated(metadata.to_string());
        }
        fields.push("updated_at = ").push_bind_unseparated(now_timestamp());

        builder
            .push(" WHERE id = ")
            .push_bind(project_id.to_string())
            .push(" AND tenant_id = ")
            .push_bind(tenant_id.to_column());

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update project: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a project owned by the tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete_project(&self, project_id: Uuid, tenant_id: TenantId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND tenant_id = $2")
            .bind(project_id.to_string())
            .bind(tenant_id.to_column())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete project: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
