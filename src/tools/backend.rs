// ABOUTME: Data access for chat tools: embedding-based search and project lookups
// ABOUTME: The database backend embeds the query and ranks rows of the chat's resource group
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::database::{Database, ProjectRecord};
use crate::errors::AppResult;
use crate::llm::EmbeddingApi;
use crate::models::{ChatContext, TenantId};

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Row ID
    pub id: String,
    /// Document title or diagram name
    pub title: String,
    /// Text shown to the model
    pub body: String,
    /// Cosine similarity to the query
    pub score: f32,
}

/// Title-only view of a document, listed by `project_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    /// Document ID
    pub id: String,
    /// Title
    pub title: String,
}

/// What `project_info` reports about the chat's resource group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectInfo {
    /// The project or template
    pub project: ProjectRecord,
    /// Documents of the group, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<DocumentSummary>>,
}

/// Data access used by the tool registry
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Semantic search over the group's documents
    async fn search_documents(
        &self,
        context: &ChatContext,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<SearchHit>>;

    /// Semantic search over the group's diagrams
    async fn search_diagrams(
        &self,
        context: &ChatContext,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<SearchHit>>;

    /// Look up the group's project or template
    async fn project_info(
        &self,
        context: &ChatContext,
        include_documents: bool,
    ) -> AppResult<Option<ProjectInfo>>;
}

/// Production backend over SQLite and the tenant's embedding client
pub struct DatabaseToolBackend {
    database: Arc<Database>,
    embeddings: Arc<dyn EmbeddingApi>,
}

impl DatabaseToolBackend {
    /// Create a backend for one request
    #[must_use]
    pub fn new(database: Arc<Database>, embeddings: Arc<dyn EmbeddingApi>) -> Self {
        Self {
            database,
            embeddings,
        }
    }
}

#[async_trait]
impl ToolBackend for DatabaseToolBackend {
    async fn search_documents(
        &self,
        context: &ChatContext,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<SearchHit>> {
        // Search is scoped to a resource group; an unanchored chat has nothing to rank
        let Some(group_id) = context.resource_group_id else {
            debug!("Document search without a resource group");
            return Ok(Vec::new());
        };

        let embedding = self.embeddings.create_embedding(query).await?;
        let ranked = self
            .database
            .search_documents(
                context.tenant_id,
                context.resource_group_type,
                group_id,
                &embedding,
                limit,
            )
            .await?;

        Ok(ranked
            .into_iter()
            .map(|scored| SearchHit {
                id: scored.document.id,
                title: scored.document.title,
                body: scored.document.content,
                score: scored.score,
            })
            .collect())
    }

    async fn search_diagrams(
        &self,
        context: &ChatContext,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<SearchHit>> {
        let Some(group_id) = context.resource_group_id else {
            debug!("Diagram search without a resource group");
            return Ok(Vec::new());
        };

        let embedding = self.embeddings.create_embedding(query).await?;
        let ranked = self
            .database
            .search_diagrams(
                context.tenant_id,
                context.resource_group_type,
                group_id,
                &embedding,
                limit,
            )
            .await?;

        Ok(ranked
            .into_iter()
            .map(|scored| {
                let body = scored.diagram.embedding_text();
                SearchHit {
                    id: scored.diagram.id,
                    title: scored.diagram.name,
                    body,
                    score: scored.score,
                }
            })
            .collect())
    }

    async fn project_info(
        &self,
        context: &ChatContext,
        include_documents: bool,
    ) -> AppResult<Option<ProjectInfo>> {
        let Some(group_id) = context.resource_group_id else {
            return Ok(None);
        };
        load_project_info(&self.database, context.tenant_id, group_id, include_documents).await
    }
}

/// Project or template visible to the tenant, with an optional document listing
///
/// # Errors
///
/// Returns an error if a query fails
pub async fn load_project_info(
    database: &Database,
    tenant_id: TenantId,
    project_id: Uuid,
    include_documents: bool,
) -> AppResult<Option<ProjectInfo>> {
    let Some(project) = database.get_project(project_id, tenant_id).await? else {
        return Ok(None);
    };

    let documents = if include_documents {
        let rows = database
            .list_documents(tenant_id, project.kind, project_id)
            .await?;
        Some(
            rows.into_iter()
                .map(|d| DocumentSummary {
                    id: d.id,
                    title: d.title,
                })
                .collect(),
        )
    } else {
        None
    };

    Ok(Some(ProjectInfo { project, documents }))
}
