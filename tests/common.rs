// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: In-memory database, scripted LLM vendor, keyword embeddings, and token helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
//! Shared test utilities for `blueprint_server`
//!
//! The vendor is replaced by [`ScriptedResponses`], which replays queued
//! responses and records every request it receives. Embeddings come from
//! [`KeywordEmbeddings`], which makes cosine ranking predictable.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use anyhow::Result;
use async_trait::async_trait;
use blueprint_server::{
    auth::AuthManager,
    config::{
        AuthConfig, DatabaseUrl, Environment, HttpConfig, LlmConfig, ServerConfig, VaultConfig,
    },
    database::Database,
    errors::{AppError, AppResult},
    llm::{
        EmbeddingApi, LlmClientFactory, OutputItem, ResponseParams, ResponseStream,
        ResponseStreamEvent, ResponseUsage, ResponsesApi, TenantLlmClients, VendorResponse,
    },
    models::TenantId,
    resources::ServerResources,
    vault::InMemoryVault,
};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-enough-entropy";
pub const TEST_MODEL: &str = "gpt-test";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard test database setup
pub async fn create_test_database() -> Result<Arc<Database>> {
    init_test_logging();
    Ok(Arc::new(Database::new(&DatabaseUrl::Memory).await?))
}

/// Configuration that never touches the environment
pub fn test_config() -> ServerConfig {
    ServerConfig {
        environment: Environment::Testing,
        http: HttpConfig::default(),
        database: DatabaseUrl::Memory,
        auth: AuthConfig {
            jwt_secret: TEST_JWT_SECRET.to_owned(),
            jwt_expiry_hours: 1,
        },
        llm: LlmConfig::default(),
        vault: VaultConfig::default(),
    }
}

// ============================================================================
// Vendor Fakes
// ============================================================================

/// Text-only vendor response
pub fn text_response(id: &str, text: &str, output_tokens: u32) -> VendorResponse {
    VendorResponse {
        id: id.to_owned(),
        status: Some("completed".to_owned()),
        model: TEST_MODEL.to_owned(),
        output: vec![OutputItem::text(text)],
        usage: Some(usage(output_tokens)),
    }
}

/// Vendor response requesting tool calls, given as `(call_id, name, arguments)`
pub fn tool_call_response(id: &str, calls: &[(&str, &str, &str)], output_tokens: u32) -> VendorResponse {
    VendorResponse {
        id: id.to_owned(),
        status: Some("completed".to_owned()),
        model: TEST_MODEL.to_owned(),
        output: calls
            .iter()
            .map(|(call_id, name, arguments)| OutputItem::function_call(*call_id, *name, *arguments))
            .collect(),
        usage: Some(usage(output_tokens)),
    }
}

const fn usage(output_tokens: u32) -> ResponseUsage {
    ResponseUsage {
        input_tokens: 100,
        output_tokens,
        total_tokens: 100 + output_tokens,
    }
}

/// Replays queued responses; an empty queue falls back to a fixed response
#[derive(Default)]
pub struct ScriptedResponses {
    script: Mutex<VecDeque<VendorResponse>>,
    fallback: Mutex<Option<VendorResponse>>,
    requests: Mutex<Vec<ResponseParams>>,
}

impl ScriptedResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue responses in call order
    pub fn push(&self, responses: impl IntoIterator<Item = VendorResponse>) {
        self.script.lock().unwrap().extend(responses);
    }

    /// Answer every call past the script with this response
    pub fn always(&self, response: VendorResponse) {
        *self.fallback.lock().unwrap() = Some(response);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ResponseParams> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of vendor calls received
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next(&self, params: &ResponseParams) -> AppResult<VendorResponse> {
        self.requests.lock().unwrap().push(params.clone());
        let scripted = self.script.lock().unwrap().pop_front();
        scripted
            .or_else(|| self.fallback.lock().unwrap().clone())
            .ok_or_else(|| AppError::external_service("scripted vendor", "script exhausted"))
    }
}

/// Vendor events for a response: two deltas and a done marker per text item
fn stream_events(response: VendorResponse) -> Vec<ResponseStreamEvent> {
    let mut events = Vec::new();
    for item in &response.output {
        let OutputItem::Message { .. } = item else {
            continue;
        };
        let text = VendorResponse {
            output: vec![item.clone()],
            ..response.clone()
        }
        .output_text();
        let mut mid = text.len() / 2;
        while !text.is_char_boundary(mid) {
            mid += 1;
        }
        let (head, tail) = text.split_at(mid);
        events.push(ResponseStreamEvent::TextDelta(head.to_owned()));
        events.push(ResponseStreamEvent::TextDelta(tail.to_owned()));
        events.push(ResponseStreamEvent::TextDone(text.clone()));
    }
    events.push(ResponseStreamEvent::Completed(response));
    events
}

#[async_trait]
impl ResponsesApi for ScriptedResponses {
    fn vendor(&self) -> &str {
        "scripted"
    }

    async fn create_response(&self, params: &ResponseParams) -> AppResult<VendorResponse> {
        self.next(params)
    }

    async fn create_streaming_response(&self, params: &ResponseParams) -> AppResult<ResponseStream> {
        let events = stream_events(self.next(params)?);
        Ok(Box::pin(tokio_stream::iter(events.into_iter().map(Ok))))
    }
}

/// Embeds text as keyword counts so related text ranks higher
pub struct KeywordEmbeddings;

pub const KEYWORDS: [&str; 5] = ["network", "storage", "identity", "database", "monitoring"];

#[async_trait]
impl EmbeddingApi for KeywordEmbeddings {
    async fn create_embedding(&self, text: &str) -> AppResult<Vec<f32>> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = KEYWORDS
            .iter()
            .map(|keyword| lower.matches(keyword).count() as f32)
            .collect();
        // Keeps unrelated text from producing a zero vector
        vector.push(0.1);
        Ok(vector)
    }
}

/// Hands every tenant the same scripted clients
pub struct StaticLlmFactory {
    pub responses: Arc<ScriptedResponses>,
}

#[async_trait]
impl LlmClientFactory for StaticLlmFactory {
    async fn clients_for_tenant(&self, _tenant_id: TenantId) -> AppResult<TenantLlmClients> {
        let responses: Arc<dyn ResponsesApi> = Arc::<ScriptedResponses>::clone(&self.responses);
        Ok(TenantLlmClients {
            responses,
            embeddings: Arc::new(KeywordEmbeddings),
            model: TEST_MODEL.to_owned(),
        })
    }
}

// ============================================================================
// Server Setup
// ============================================================================

/// Resources wired to fakes, plus handles to inspect them
pub struct TestServer {
    pub resources: Arc<ServerResources>,
    pub responses: Arc<ScriptedResponses>,
    pub vault: Arc<InMemoryVault>,
}

impl TestServer {
    /// Full application router
    pub fn router(&self) -> axum::Router {
        blueprint_server::routes::build_router(&self.resources)
    }

    /// Clients the orchestrator would get for any tenant
    pub async fn llm_clients(&self) -> TenantLlmClients {
        self.resources
            .llm_clients(TenantId::new())
            .await
            .expect("static factory never fails")
    }
}

pub async fn create_test_server() -> Result<TestServer> {
    let database = create_test_database().await?;
    let config = test_config();
    let responses = Arc::new(ScriptedResponses::new());
    let vault = Arc::new(InMemoryVault::new());
    let factory = Arc::new(StaticLlmFactory {
        responses: Arc::clone(&responses),
    });

    let resources = Arc::new(ServerResources::new(
        database,
        Arc::new(AuthManager::from_config(&config.auth)),
        Arc::clone(&vault) as _,
        factory,
        Arc::new(config),
    ));

    Ok(TestServer {
        resources,
        responses,
        vault,
    })
}

/// A user of some tenant with a valid bearer token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub user_id: Uuid,
    pub tenant_id: TenantId,
    pub token: String,
}

pub fn create_test_user(resources: &ServerResources) -> TestUser {
    create_test_user_in(resources, TenantId::new())
}

pub fn create_test_user_in(resources: &ServerResources, tenant_id: TenantId) -> TestUser {
    let user_id = Uuid::new_v4();
    let token = resources
        .auth_manager
        .generate_token(user_id, tenant_id)
        .expect("token generation");
    TestUser {
        user_id,
        tenant_id,
        token,
    }
}
