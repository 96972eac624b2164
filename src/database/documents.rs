// ABOUTME: Document and diagram persistence with stored embeddings for semantic search
// ABOUTME: Ranks rows of one resource group by cosine similarity to a query vector
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! Documents and diagrams belong to a resource group (project, template, or
//! community template). Embeddings are stored as JSON arrays next to the row
//! and ranked in process; groups hold tens to hundreds of rows.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::{now_timestamp, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{ResourceGroupType, TenantId};

// ============================================================================
// Record Types
// ============================================================================

/// A text document inside a resource group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Document ID
    pub id: String,
    /// Owning tenant
    pub tenant_id: String,
    /// Kind of the owning group
    pub resource_group_type: ResourceGroupType,
    /// Owning group
    pub resource_group_id: String,
    /// Title
    pub title: String,
    /// Body text
    pub content: String,
    /// Whether an embedding is stored
    pub has_embedding: bool,
    /// Creation time (RFC 3339)
    pub created_at: String,
    /// Last update time (RFC 3339)
    pub updated_at: String,
}

/// Fields accepted when creating a document
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocument {
    /// Kind of the owning group
    #[serde(default)]
    pub resource_group_type: ResourceGroupType,
    /// Owning group
    pub resource_group_id: Uuid,
    /// Title
    pub title: String,
    /// Body text
    pub content: String,
}

/// Partial update; only supplied fields are written
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPatch {
    /// New title
    pub title: Option<String>,
    /// New body text
    pub content: Option<String>,
}

/// An architecture diagram inside a resource group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramRecord {
    /// Diagram ID
    pub id: String,
    /// Owning tenant
    pub tenant_id: String,
    /// Kind of the owning group
    pub resource_group_type: ResourceGroupType,
    /// Owning group
    pub resource_group_id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Diagram definition (nodes, edges, layout)
    pub definition: Value,
    /// Whether an embedding is stored
    pub has_embedding: bool,
    /// Creation time (RFC 3339)
    pub created_at: String,
    /// Last update time (RFC 3339)
    pub updated_at: String,
}

/// Fields accepted when creating a diagram
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDiagram {
    /// Kind of the owning group
    #[serde(default)]
    pub resource_group_type: ResourceGroupType,
    /// Owning group
    pub resource_group_id: Uuid,
    /// Display name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Definition; defaults to `{}`
    pub definition: Option<Value>,
}

/// Partial update; only supplied fields are written
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagramPatch {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// Replacement definition
    pub definition: Option<Value>,
}

/// A document with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// Matching document
    #[serde(flatten)]
    pub document: DocumentRecord,
    /// Cosine similarity in `[-1, 1]`
    pub score: f32,
}

/// A diagram with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDiagram {
    /// Matching diagram
    #[serde(flatten)]
    pub diagram: DiagramRecord,
    /// Cosine similarity in `[-1, 1]`
    pub score: f32,
}

impl CreateDocument {
    /// Text that represents the document for embedding
    #[must_use]
    pub fn embedding_text(&self) -> String {
        document_embedding_text(&self.title, &self.content)
    }
}

impl DocumentRecord {
    /// Text that represents the document for embedding
    #[must_use]
    pub fn embedding_text(&self) -> String {
        document_embedding_text(&self.title, &self.content)
    }
}

fn document_embedding_text(title: &str, content: &str) -> String {
    format!("{title}\n{content}")
}

impl CreateDiagram {
    /// Text that represents the diagram for embedding
    #[must_use]
    pub fn embedding_text(&self) -> String {
        diagram_embedding_text(&self.name, self.description.as_deref(), self.definition.as_ref())
    }
}

impl DiagramRecord {
    /// Text that represents the diagram for embedding
    #[must_use]
    pub fn embedding_text(&self) -> String {
        diagram_embedding_text(&self.name, self.description.as_deref(), Some(&self.definition))
    }
}

fn diagram_embedding_text(name: &str, description: Option<&str>, definition: Option<&Value>) -> String {
    let mut text = name.to_owned();
    if let Some(description) = description {
        text.push('\n');
        text.push_str(description);
    }
    if let Some(definition) = definition.filter(|d| !d.is_null()) {
        text.push('\n');
        text.push_str(&definition.to_string());
    }
    text
}

// ============================================================================
// Similarity
// ============================================================================

/// Cosine similarity; zero when either vector is empty, zero-norm, or the lengths differ
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0_f32, 0.0_f32, 0.0_f32), |(dot, na, nb), (x, y)| {
            (x.mul_add(*y, dot), x.mul_add(*x, na), y.mul_add(*y, nb))
        });
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rank candidates by similarity and keep the best `limit`
fn rank<T>(candidates: Vec<(T, Vec<f32>)>, query: &[f32], limit: usize) -> Vec<(T, f32)> {
    let mut scored: Vec<(T, f32)> = candidates
        .into_iter()
        .map(|(item, embedding)| {
            let score = cosine_similarity(query, &embedding);
            (item, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(limit);
    scored
}

fn decode_embedding(row: &SqliteRow) -> Option<Vec<f32>> {
    row.get::<Option<String>, _>("embedding")
        .and_then(|raw| serde_json::from_str(&raw).ok())
}

fn encode_embedding(embedding: Option<&[f32]>) -> AppResult<Option<String>> {
    embedding
        .map(|vector| serde_json::to_string(vector).map_err(AppError::from))
        .transpose()
}

fn document_from_row(row: &SqliteRow) -> DocumentRecord {
    DocumentRecord {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        resource_group_type: row
            .get::<String, _>("resource_group_type")
            .parse()
            .unwrap_or_default(),
        resource_group_id: row.get("resource_group_id"),
        title: row.get("title"),
        content: row.get("content"),
        has_embedding: row.get::<Option<String>, _>("embedding").is_some(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn diagram_from_row(row: &SqliteRow) -> DiagramRecord {
    DiagramRecord {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        resource_group_type: row
            .get::<String, _>("resource_group_type")
            .parse()
            .unwrap_or_default(),
        resource_group_id: row.get("resource_group_id"),
        name: row.get("name"),
        description: row.get("description"),
        definition: serde_json::from_str(&row.get::<String, _>("definition"))
            .unwrap_or(Value::Null),
        has_embedding: row.get::<Option<String>, _>("embedding").is_some(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Rows of one group visible to the tenant; community template rows are shared
const GROUP_SCOPE: &str = "resource_group_type = $1 AND resource_group_id = $2 \
     AND (tenant_id = $3 OR resource_group_type = 'community_template')";

impl Database {
    pub(super) async fn migrate_documents(&self) -> AppResult<()> {
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                resource_group_type TEXT NOT NULL,
                resource_group_id TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .await?;
        self.execute_ddl(
            r"
            CREATE TABLE IF NOT EXISTS diagrams (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                resource_group_type TEXT NOT NULL,
                resource_group_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                definition TEXT NOT NULL DEFAULT '{}',
                embedding TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .await?;
        self.execute_ddl(
            "CREATE INDEX IF NOT EXISTS idx_documents_group ON documents(resource_group_type, resource_group_id)",
        )
        .await?;
        self.execute_ddl(
            "CREATE INDEX IF NOT EXISTS idx_diagrams_group ON diagrams(resource_group_type, resource_group_id)",
        )
        .await
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Create a document with an optional precomputed embedding
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_document(
        &self,
        tenant_id: TenantId,
        request: &CreateDocument,
        embedding: Option<&[f32]>,
    ) -> AppResult<DocumentRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r"
            INSERT INTO documents (id, tenant_id, resource_group_type, resource_group_id, title,
                                   content, embedding, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ",
        )
        .bind(&id)
        .bind(tenant_id.to_column())
        .bind(request.resource_group_type.as_str())
        .bind(request.resource_group_id.to_string())
        .bind(&request.title)
        .bind(&request.content)
        .bind(encode_embedding(embedding)?)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create document: {e}")))?;

        Ok(DocumentRecord {
            id,
            tenant_id: tenant_id.to_column(),
            resource_group_type: request.resource_group_type,
            resource_group_id: request.resource_group_id.to_string(),
            title: request.title.clone(),
            content: request.content.clone(),
            has_embedding: embedding.is_some(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a document visible to the tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_document(
        &self,
        document_id: Uuid,
        tenant_id: TenantId,
    ) -> AppResult<Option<DocumentRecord>> {
        let row = sqlx::query(
            r"
            SELECT * FROM documents
            WHERE id = $1 AND (tenant_id = $2 OR resource_group_type = 'community_template')
            ",
        )
        .bind(document_id.to_string())
        .bind(tenant_id.to_column())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get document: {e}")))?;

        Ok(row.as_ref().map(document_from_row))
    }

    /// List the documents of one resource group
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_documents(
        &self,
        tenant_id: TenantId,
        group_type: ResourceGroupType,
        group_id: Uuid,
    ) -> AppResult<Vec<DocumentRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM documents WHERE {GROUP_SCOPE} ORDER BY created_at ASC"
        ))
        .bind(group_type.as_str())
        .bind(group_id.to_string())
        .bind(tenant_id.to_column())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list documents: {e}")))?;

        Ok(rows.iter().map(document_from_row).collect())
    }

    /// Apply a partial update; a new embedding replaces the stored one
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_document(
        &self,
        document_id: Uuid,
        tenant_id: TenantId,
        patch: &DocumentPatch,
        embedding: Option<&[f32]>,
    ) -> AppResult<bool> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE documents SET ");
        let mut fields = builder.separated(", ");
        if let Some(title) = &patch.title {
            fields.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(content) = &patch.content {
            fields.push("content = ").push_bind_unseparated(content.clone());
        }
        if let Some(encoded) = encode_embedding(embedding)? {
            fields.push("embedding = ").push_bind_unseparated(encoded);
        }
        fields.push("updated_at = ").push_bind_unseparated(now_timestamp());

        builder
            .push(" WHERE id = ")
            .push_bind(document_id.to_string())
            .push(" AND tenant_id = ")
            .push_bind(tenant_id.to_column());

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update document: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a document owned by the tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete_document(&self, document_id: Uuid, tenant_id: TenantId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND tenant_id = $2")
            .bind(document_id.to_string())
            .bind(tenant_id.to_column())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete document: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Rank the group's embedded documents against a query vector
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn search_documents(
        &self,
        tenant_id: TenantId,
        group_type: ResourceGroupType,
        group_id: Uuid,
        query_embedding: &[f32],
        limit: usize,
    ) -> AppResult<Vec<ScoredDocument>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM documents WHERE {GROUP_SCOPE} AND embedding IS NOT NULL"
        ))
        .bind(group_type.as_str())
        .bind(group_id.to_string())
        .bind(tenant_id.to_column())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to search documents: {e}")))?;

        let candidates = rows
            .iter()
            .filter_map(|row| decode_embedding(row).map(|e| (document_from_row(row), e)))
            .collect();

        Ok(rank(candidates, query_embedding, limit)
            .into_iter()
            .map(|(document, score)| ScoredDocument { document, score })
            .collect())
    }

    // ========================================================================
    // Diagrams
    // ========================================================================

    /// Create a diagram with an optional precomputed embedding
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_diagram(
        &self,
        tenant_id: TenantId,
        request: &CreateDiagram,
        embedding: Option<&[f32]>,
    ) -> AppResult<DiagramRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let definition = request
            .definition
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        sqlx::query(
            r"
            INSERT INTO diagrams (id, tenant_id, resource_group_type, resource_group_id, name,
                                  description, definition, embedding, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ",
        )
        .bind(&id)
        .bind(tenant_id.to_column())
        .bind(request.resource_group_type.as_str())
        .bind(request.resource_group_id.to_string())
        .bind(&request.name)
        .bind(request.description.as_deref())
        .bind(definition.to_string())
        .bind(encode_embedding(embedding)?)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create diagram: {e}")))?;

        Ok(DiagramRecord {
            id,
            tenant_id: tenant_id.to_column(),
            resource_group_type: request.resource_group_type,
            resource_group_id: request.resource_group_id.to_string(),
            name: request.name.clone(),
            description: request.description.clone(),
            definition,
            has_embedding: embedding.is_some(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a diagram visible to the tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_diagram(
        &self,
        diagram_id: Uuid,
        tenant_id: TenantId,
    ) -> AppResult<Option<DiagramRecord>> {
        let row = sqlx::query(
            r"
            SELECT * FROM diagrams
            WHERE id = $1 AND (tenant_id = $2 OR resource_group_type = 'community_template')
            ",
        )
        .bind(diagram_id.to_string())
        .bind(tenant_id.to_column())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get diagram: {e}")))?;

        Ok(row.as_ref().map(diagram_from_row))
    }

    /// List the diagrams of one resource group
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_diagrams(
        &self,
        tenant_id: TenantId,
        group_type: ResourceGroupType,
        group_id: Uuid,
    ) -> AppResult<Vec<DiagramRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM diagrams WHERE {GROUP_SCOPE} ORDER BY created_at ASC"
        ))
        .bind(group_type.as_str())
        .bind(group_id.to_string())
        .bind(tenant_id.to_column())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list diagrams: {e}")))?;

        Ok(rows.iter().map(diagram_from_row).collect())
    }

    /// Apply a partial update; a new embedding replaces the stored one
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn update_diagram(
        &self,
        diagram_id: Uuid,
        tenant_id: TenantId,
        patch: &DiagramPatch,
        embedding: Option<&[f32]>,
    ) -> AppResult<bool> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE diagrams SET ");
        let mut fields = builder.separated(", ");
        if let Some(name) = &patch.name {
            fields.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(description) = &patch.description {
            fields
                .push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(definition) = &patch.definition {
            fields
                .push("definition = ")
                .push_bind_unseparated(definition.to_string());
        }
        if let Some(encoded) = encode_embedding(embedding)? {
            fields.push("embedding = ").push_bind_unseparated(encoded);
        }
        fields.push("updated_at = ").push_bind_unseparated(now_timestamp());

        builder
            .push(" WHERE id = ")
            .push_bind(diagram_id.to_string())
            .push(" AND tenant_id = ")
            .push_bind(tenant_id.to_column());

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update diagram: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a diagram owned by the tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete_diagram(&self, diagram_id: Uuid, tenant_id: TenantId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM diagrams WHERE id = $1 AND tenant_id = $2")
            .bind(diagram_id.to_string())
            .bind(tenant_id.to_column())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete diagram: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Rank the group's embedded diagrams against a query vector
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn search_diagrams(
        &self,
        tenant_id: TenantId,
        group_type: ResourceGroupType,
        group_id: Uuid,
        query_embedding: &[f32],
        limit: usize,
    ) -> AppResult<Vec<ScoredDiagram>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM diagrams WHERE {GROUP_SCOPE} AND embedding IS NOT NULL"
        ))
        .bind(group_type.as_str())
        .bind(group_id.to_string())
        .bind(tenant_id.to_column())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to search diagrams: {e}")))?;

        let candidates = rows
            .iter()
            .filter_map(|row| decode_embedding(row).map(|e| (diagram_from_row(row), e)))
            .collect();

        Ok(rank(candidates, query_embedding, limit)
            .into_iter()
            .map(|(diagram, score)| ScoredDiagram { diagram, score })
            .collect())
    }
}
