// ABOUTME: Declares the chat tools per context and dispatches vendor tool calls by name
// ABOUTME: Argument decoding happens here, before any tool implementation runs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Tool Registry
//!
//! Three tools are offered to the model:
//! - `document_search` and `diagram_search`, always
//! - `project_info`, only when the chat is anchored to a resource group
//!
//! Dispatch never retries. A tool that finds nothing returns an empty string,
//! which is a normal result and not an error.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::backend::{SearchHit, ToolBackend};
use crate::errors::ToolError;
use crate::llm::ToolDeclaration;
use crate::models::ChatContext;

/// Semantic search over documents
pub const DOCUMENT_SEARCH: &str = "document_search";
/// Semantic search over diagrams
pub const DIAGRAM_SEARCH: &str = "diagram_search";
/// Resource group lookup
pub const PROJECT_INFO: &str = "project_info";

/// Results returned when the model omits `limit`
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
/// Upper bound for `limit`
pub const MAX_SEARCH_LIMIT: usize = 20;

/// Longest excerpt of one search hit shown to the model, in characters
const MAX_EXCERPT_CHARS: usize = 2_000;

/// Name, description, and argument schema of one tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    /// Tool name used in vendor tool calls
    pub name: &'static str,
    /// Tells the model when to call the tool
    pub description: &'static str,
    /// JSON schema of the arguments
    pub parameters: Value,
}

impl ToolDescriptor {
    /// Vendor declaration for this tool
    #[must_use]
    pub fn to_declaration(&self) -> ToolDeclaration {
        ToolDeclaration::Function {
            name: self.name.to_owned(),
            description: self.description.to_owned(),
            parameters: self.parameters.clone(),
        }
    }
}

/// Dispatches one tool call; implemented by [`ToolRegistry`]
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Decode `raw_arguments` for `name` and run the tool
    async fn dispatch(
        &self,
        context: &ChatContext,
        name: &str,
        raw_arguments: &str,
    ) -> Result<String, ToolError>;
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
}

impl SearchArgs {
    fn effective_limit(&self) -> usize {
        clamp_search_limit(self.limit)
    }
}

/// Requested result count clamped to `1..=MAX_SEARCH_LIMIT`, defaulting to [`DEFAULT_SEARCH_LIMIT`]
#[must_use]
pub fn clamp_search_limit(limit: Option<i64>) -> usize {
    limit.map_or(DEFAULT_SEARCH_LIMIT, |limit| {
        usize::try_from(limit.max(1)).map_or(MAX_SEARCH_LIMIT, |l| l.min(MAX_SEARCH_LIMIT))
    })
}

#[derive(Debug, Default, Deserialize)]
struct ProjectInfoArgs {
    #[serde(default)]
    include_documents: bool,
}

fn search_schema(subject: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": format!("Natural-language description of the {subject} to find")
            },
            "limit": {
                "type": "integer",
                "description": format!(
                    "Maximum number of results (1-{MAX_SEARCH_LIMIT}, default {DEFAULT_SEARCH_LIMIT})"
                )
            }
        },
        "required": ["query"]
    })
}

fn document_search_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: DOCUMENT_SEARCH,
        description: "Search the documents of the current project or template by meaning. \
                      Use it when the answer may be written down in project documentation.",
        parameters: search_schema("documents"),
    }
}

fn diagram_search_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: DIAGRAM_SEARCH,
        description: "Search the architecture diagrams of the current project or template by \
                      meaning. Use it for questions about components, topology, or data flow.",
        parameters: search_schema("diagrams"),
    }
}

fn project_info_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: PROJECT_INFO,
        description: "Get the name, description, target cloud, region, and metadata of the \
                      current project or template.",
        parameters: json!({
            "type": "object",
            "properties": {
                "include_documents": {
                    "type": "boolean",
                    "description": "Also list the titles of the project's documents"
                }
            }
        }),
    }
}

fn decode_args<T>(tool_name: &str, raw_arguments: &str) -> Result<T, ToolError>
where
    T: for<'de> Deserialize<'de>,
{
    // Some vendors send an empty string for argument-less calls
    let raw = if raw_arguments.trim().is_empty() {
        "{}"
    } else {
        raw_arguments
    };
    serde_json::from_str(raw).map_err(|e| ToolError::invalid_arguments(tool_name, e.to_string()))
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(rank, hit)| {
            format!(
                "[{}] {} (id: {}, relevance: {:.3})\n{}\n",
                rank + 1,
                hit.title,
                hit.id,
                hit.score,
                excerpt(&hit.body)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tool registry bound to one request's backend
pub struct ToolRegistry {
    backend: Arc<dyn ToolBackend>,
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Create a registry over a backend
    #[must_use]
    pub fn new(backend: Arc<dyn ToolBackend>) -> Self {
        Self {
            backend,
            tools: vec![
                document_search_descriptor(),
                diagram_search_descriptor(),
                project_info_descriptor(),
            ],
        }
    }

    /// Tools available to the given chat context
    #[must_use]
    pub fn list_tools(&self, context: &ChatContext) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .filter(|tool| tool.name != PROJECT_INFO || context.has_resource_group())
            .cloned()
            .collect()
    }

    /// Vendor declarations for the given chat context
    #[must_use]
    pub fn declarations(&self, context: &ChatContext) -> Vec<ToolDeclaration> {
        self.list_tools(context)
            .iter()
            .map(ToolDescriptor::to_declaration)
            .collect()
    }

    async fn run_search(
        &self,
        context: &ChatContext,
        name: &str,
        raw_arguments: &str,
    ) -> Result<String, ToolError> {
        let args: SearchArgs = decode_args(name, raw_arguments)?;
        if args.query.trim().is_empty() {
            return Err(ToolError::invalid_arguments(name, "query must not be empty"));
        }
        let limit = args.effective_limit();

        let hits = if name == DOCUMENT_SEARCH {
            self.backend.search_documents(context, &args.query, limit).await
        } else {
            self.backend.search_diagrams(context, &args.query, limit).await
        }
        .map_err(|e| ToolError::execution_failed(name, e.to_string()))?;

        debug!(tool_name = name, hits = hits.len(), limit, "Search finished");
        Ok(format_hits(&hits))
    }

    async fn run_project_info(
        &self,
        context: &ChatContext,
        raw_arguments: &str,
    ) -> Result<String, ToolError> {
        let args: ProjectInfoArgs = decode_args(PROJECT_INFO, raw_arguments)?;
        let info = self
            .backend
            .project_info(context, args.include_documents)
            .await
            .map_err(|e| ToolError::execution_failed(PROJECT_INFO, e.to_string()))?;

        match info {
            Some(info) => serde_json::to_string_pretty(&info)
                .map_err(|e| ToolError::execution_failed(PROJECT_INFO, e.to_string())),
            None => Ok(String::new()),
        }
    }
}

#[async_trait]
impl ToolDispatcher for ToolRegistry {
    async fn dispatch(
        &self,
        context: &ChatContext,
        name: &str,
        raw_arguments: &str,
    ) -> Result<String, ToolError> {
        match name {
            DOCUMENT_SEARCH | DIAGRAM_SEARCH => self.run_search(context, name, raw_arguments).await,
            PROJECT_INFO => self.run_project_info(context, raw_arguments).await,
            _ => Err(ToolError::unknown_tool(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use uuid::Uuid;

    use super::*;
    use crate::errors::AppResult;
    use crate::models::TenantId;
    use crate::tools::backend::ProjectInfo;

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
        limits: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ToolBackend for CountingBackend {
        async fn search_documents(
            &self,
            _context: &ChatContext,
            _query: &str,
            limit: usize,
        ) -> AppResult<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.limits.lock().unwrap().push(limit);
            Ok(Vec::new())
        }

        async fn search_diagrams(
            &self,
            _context: &ChatContext,
            _query: &str,
            _limit: usize,
        ) -> AppResult<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![SearchHit {
                id: "d1".to_owned(),
                title: "Hub and spoke".to_owned(),
                body: "Firewall in the hub".to_owned(),
                score: 0.91,
            }])
        }

        async fn project_info(
            &self,
            _context: &ChatContext,
            _include_documents: bool,
        ) -> AppResult<Option<ProjectInfo>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    fn registry() -> (ToolRegistry, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend::default());
        (ToolRegistry::new(backend.clone()), backend)
    }

    fn context() -> ChatContext {
        ChatContext::new(Uuid::new_v4(), TenantId::new())
    }

    #[test]
    fn test_search_limit_defaults_and_clamps() {
        let limit = |l| SearchArgs { query: "q".to_owned(), limit: l }.effective_limit();
        assert_eq!(limit(None), DEFAULT_SEARCH_LIMIT);
        assert_eq!(limit(Some(0)), 1);
        assert_eq!(limit(Some(-4)), 1);
        assert_eq!(limit(Some(7)), 7);
        assert_eq!(limit(Some(500)), MAX_SEARCH_LIMIT);
    }

    #[test]
    fn test_project_info_requires_resource_group() {
        let (registry, _) = registry();
        let names = |ctx: &ChatContext| -> Vec<&str> {
            registry.list_tools(ctx).iter().map(|t| t.name).collect()
        };

        let unanchored = context();
        assert_eq!(names(&unanchored), vec![DOCUMENT_SEARCH, DIAGRAM_SEARCH]);

        let anchored = context()
            .with_resource_group(crate::models::ResourceGroupType::Template, Some(Uuid::new_v4()));
        assert_eq!(names(&anchored), vec![DOCUMENT_SEARCH, DIAGRAM_SEARCH, PROJECT_INFO]);
        assert_eq!(registry.declarations(&anchored).len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_never_reaches_backend() {
        let (registry, backend) = registry();
        let error = registry
            .dispatch(&context(), "delete_everything", "{}")
            .await
            .unwrap_err();
        assert!(error.to_string().contains("unknown function call"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_arguments_fail_before_backend() {
        let (registry, backend) = registry();
        for raw in ["{not json", r#"{"limit": 3}"#, r#"{"query": 5}"#, r#"{"query": "  "}"#] {
            let error = registry
                .dispatch(&context(), DOCUMENT_SEARCH, raw)
                .await
                .unwrap_err();
            assert!(
                error.to_string().contains("invalid function arguments"),
                "{raw}: {error}"
            );
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_search_returns_empty_string() {
        let (registry, backend) = registry();
        let output = registry
            .dispatch(&context(), DOCUMENT_SEARCH, r#"{"query":"auth flow","limit":3}"#)
            .await
            .unwrap();
        assert_eq!(output, "");
        assert_eq!(*backend.limits.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_extra_argument_fields_are_ignored() {
        let (registry, backend) = registry();
        registry
            .dispatch(
                &context(),
                DOCUMENT_SEARCH,
                r#"{"query":"auth flow","limit":3,"scope":"all"}"#,
            )
            .await
            .unwrap();
        assert_eq!(*backend.limits.lock().unwrap(), vec![3]);

        registry
            .dispatch(&context(), PROJECT_INFO, r#"{"verbose":true}"#)
            .await
            .unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_hits_are_numbered_with_ids() {
        let (registry, _) = registry();
        let output = registry
            .dispatch(&context(), DIAGRAM_SEARCH, r#"{"query":"firewall"}"#)
            .await
            .unwrap();
        assert!(output.starts_with("[1] Hub and spoke (id: d1, relevance: 0.910)"));
        assert!(output.contains("Firewall in the hub"));
    }

    #[tokio::test]
    async fn test_project_info_accepts_empty_arguments() {
        let (registry, _) = registry();
        let output = registry.dispatch(&context(), PROJECT_INFO, "").await.unwrap();
        assert_eq!(output, "");
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let long = "é".repeat(MAX_EXCERPT_CHARS + 10);
        assert_eq!(excerpt(&long).chars().count(), MAX_EXCERPT_CHARS);
        assert_eq!(excerpt("short"), "short");
    }
}
