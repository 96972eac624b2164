// ABOUTME: Chat orchestration: one vendor call, a bounded tool fan-out, repeated until plain text
// ABOUTME: Builds vendor parameters, records usage per call, and persists the final completion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Chat Orchestration
//!
//! A turn moves through three states:
//!
//! - `AwaitingVendorResponse`: one vendor call, usage recorded, tool calls executed
//! - `ToolCallPending`: the next input is only the tool outputs, linked to the
//!   previous response so the vendor keeps the earlier context
//! - `Terminal`: the vendor answered with text and no tool calls
//!
//! At most [`MAX_TOOL_ITERATIONS`] vendor calls are made per turn. A vendor
//! that keeps asking for tools fails the turn with `ToolLoopExceeded`.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument, Span};
use uuid::Uuid;

use super::usage::UsageRecorder;
use crate::auth::AuthResult;
use crate::database::{
    AssistantRecord, ConversationRecord, Database, DocumentSelection, NewCompletion,
    TokenUsageRecord,
};
use crate::errors::{AppError, AppResult};
use crate::llm::prompts::compose_instructions;
use crate::llm::{
    ResponseInput, ResponseParams, ResponseStreamEvent, ResponseUsage, ResponsesApi,
    TenantLlmClients, ToolDeclaration, VendorResponse,
};
use crate::logging::{TenantLogger, VendorCallContext};
use crate::models::{ChatContext, ResourceGroupType};
use crate::tenant_span;
use crate::tools::{DatabaseToolBackend, ToolBackend, ToolExecutor, ToolOutput, ToolRegistry};

/// Maximum vendor calls in one turn
pub const MAX_TOOL_ITERATIONS: usize = 10;

/// Separator written between text segments of one streamed turn
const SEGMENT_SEPARATOR: &str = "\n\n";

// ============================================================================
// Request Types
// ============================================================================

/// Per-request options sent alongside a prompt
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptOptions {
    /// Enable hosted web search for this request
    #[serde(default)]
    pub web_search: bool,
    /// Extra instructions for this request only
    #[serde(default)]
    pub instructions: Option<String>,
    /// Document excerpts prepended to the prompt
    #[serde(default)]
    pub document_selections: Vec<DocumentSelection>,
}

/// Body of a prompt submitted to a conversation
#[derive(Debug, Clone, Deserialize)]
pub struct PromptSubmission {
    /// Conversation the prompt belongs to
    pub conversation_id: Uuid,
    /// Prompt text
    pub prompt: String,
    /// Kind of resource group the chat is anchored to
    #[serde(default)]
    pub resource_group_type: ResourceGroupType,
    /// Resource group ID
    #[serde(default)]
    pub resource_group_id: Option<Uuid>,
    /// Resource type inside the group
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Resource ID inside the group
    #[serde(default)]
    pub resource_id: Option<Uuid>,
    /// Per-request options
    #[serde(flatten)]
    pub options: PromptOptions,
}

/// Body of an ad-hoc chat that is not persisted
#[derive(Debug, Clone, Deserialize)]
pub struct QuickChatRequest {
    /// Prompt text
    pub prompt: String,
    /// Assistant whose configuration applies
    #[serde(default)]
    pub assistant_id: Option<Uuid>,
    /// Kind of resource group the chat is anchored to
    #[serde(default)]
    pub resource_group_type: ResourceGroupType,
    /// Resource group ID
    #[serde(default)]
    pub resource_group_id: Option<Uuid>,
    /// Per-request options
    #[serde(flatten)]
    pub options: PromptOptions,
}

/// Everything one turn needs
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Identity and resource scope, shared with tool tasks
    pub context: Arc<ChatContext>,
    /// Prompt text as typed by the user
    pub prompt: String,
    /// Conversation configuration, when the turn belongs to one
    pub conversation: Option<ConversationRecord>,
    /// Assistant configuration
    pub assistant: Option<AssistantRecord>,
    /// Per-request options
    pub options: PromptOptions,
}

/// Result of a finished turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Final assistant text
    pub message: String,
    /// Vendor status of the final response
    pub status: String,
    /// Completion tokens summed over every vendor call of the turn
    pub total_tokens: u32,
    /// ID of the final vendor response
    pub response_id: String,
    /// Vendor calls made
    pub iterations: usize,
}

fn require_prompt(prompt: &str) -> AppResult<()> {
    if prompt.trim().is_empty() {
        return Err(AppError::invalid_input("prompt must not be empty"));
    }
    Ok(())
}

/// Load the conversation and assistant a prompt submission refers to
///
/// # Errors
///
/// Returns `InvalidInput` for an empty prompt, `ResourceNotFound` when the
/// conversation does not belong to the caller, or a database error
pub async fn prepare_prompt(
    database: &Database,
    auth: &AuthResult,
    submission: PromptSubmission,
) -> AppResult<TurnRequest> {
    require_prompt(&submission.prompt)?;

    let conversation = database
        .get_conversation(submission.conversation_id, auth.tenant_id, auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation"))?;

    let assistant = match conversation
        .assistant_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok())
    {
        Some(assistant_id) => database.get_assistant(assistant_id, auth.tenant_id).await?,
        None => None,
    };

    let context = auth
        .chat_context()
        .with_conversation(submission.conversation_id)
        .with_resource_group(submission.resource_group_type, submission.resource_group_id)
        .with_resource(submission.resource_type, submission.resource_id);

    Ok(TurnRequest {
        context: Arc::new(context),
        prompt: submission.prompt,
        conversation: Some(conversation),
        assistant,
        options: submission.options,
    })
}

/// Build a turn for quick chat; nothing about it is persisted except usage
///
/// # Errors
///
/// Returns `InvalidInput` for an empty prompt, `ResourceNotFound` for an
/// unknown assistant, or a database error
pub async fn prepare_quick_chat(
    database: &Database,
    auth: &AuthResult,
    request: QuickChatRequest,
) -> AppResult<TurnRequest> {
    require_prompt(&request.prompt)?;

    let assistant = match request.assistant_id {
        Some(assistant_id) => Some(
            database
                .get_assistant(assistant_id, auth.tenant_id)
                .await?
                .ok_or_else(|| AppError::not_found("Assistant"))?,
        ),
        None => None,
    };

    let context = auth
        .chat_context()
        .with_resource_group(request.resource_group_type, request.resource_group_id);

    Ok(TurnRequest {
        context: Arc::new(context),
        prompt: request.prompt,
        conversation: None,
        assistant,
        options: request.options,
    })
}

/// Prepend selected document text to the prompt
fn prompt_with_selections(prompt: &str, selections: &[DocumentSelection]) -> String {
    if selections.is_empty() {
        return prompt.to_owned();
    }
    let mut parts: Vec<String> = selections
        .iter()
        .map(|selection| match &selection.title {
            Some(title) => format!("From \"{title}\":\n{}", selection.text),
            None => selection.text.clone(),
        })
        .collect();
    parts.push(prompt.to_owned());
    parts.join(SEGMENT_SEPARATOR)
}

// ============================================================================
// Turn State Machine
// ============================================================================

#[derive(Debug)]
enum TurnState {
    AwaitingVendorResponse,
    ToolCallPending {
        response_id: String,
        outputs: Vec<ToolOutput>,
    },
    Terminal(VendorResponse),
}

/// Forwards streamed text and separates segments of one turn
struct TextForwarder<'a> {
    sink: &'a mpsc::Sender<Bytes>,
    in_segment: bool,
    finished_segments: usize,
}

impl<'a> TextForwarder<'a> {
    const fn new(sink: &'a mpsc::Sender<Bytes>) -> Self {
        Self {
            sink,
            in_segment: false,
            finished_segments: 0,
        }
    }

    async fn send(&self, text: String) -> AppResult<()> {
        self.sink
            .send(Bytes::from(text))
            .await
            .map_err(|_| AppError::internal("Client disconnected during streaming"))
    }

    async fn delta(&mut self, text: String) -> AppResult<()> {
        if !self.in_segment && self.finished_segments > 0 {
            self.send(SEGMENT_SEPARATOR.to_owned()).await?;
        }
        self.in_segment = true;
        self.send(text).await
    }

    async fn segment_done(&mut self, full_text: String) -> AppResult<()> {
        // A segment that arrived without deltas is forwarded whole
        if !self.in_segment && !full_text.is_empty() {
            self.delta(full_text).await?;
        }
        if self.in_segment {
            self.in_segment = false;
            self.finished_segments += 1;
        }
        Ok(())
    }
}

/// Runs chat turns for one tenant
pub struct ChatOrchestrator {
    database: Arc<Database>,
    responses: Arc<dyn ResponsesApi>,
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
    usage: UsageRecorder,
    default_model: String,
}

impl ChatOrchestrator {
    /// Orchestrator over a tenant's vendor clients and the database tool backend
    #[must_use]
    pub fn new(database: Arc<Database>, clients: &TenantLlmClients) -> Self {
        let backend = Arc::new(DatabaseToolBackend::new(
            Arc::clone(&database),
            Arc::clone(&clients.embeddings),
        ));
        Self::with_backend(
            database,
            Arc::clone(&clients.responses),
            backend,
            clients.model.clone(),
        )
    }

    /// Orchestrator over an explicit tool backend
    #[must_use]
    pub fn with_backend(
        database: Arc<Database>,
        responses: Arc<dyn ResponsesApi>,
        backend: Arc<dyn ToolBackend>,
        default_model: String,
    ) -> Self {
        let registry = Arc::new(ToolRegistry::new(backend));
        Self {
            usage: UsageRecorder::new(Arc::clone(&database)),
            executor: ToolExecutor::new(registry.clone()),
            database,
            responses,
            registry,
            default_model,
        }
    }

    /// Vendor parameters for the first call of a turn
    ///
    /// Assistant settings override conversation settings. Registry tools are
    /// always declared; hosted tools come from the assistant and the options.
    #[must_use]
    pub fn build_params(&self, request: &TurnRequest) -> ResponseParams {
        let conversation = request.conversation.as_ref();
        let assistant = request.assistant.as_ref();

        let instructions = compose_instructions([
            conversation.and_then(|c| c.system_prompt.as_deref()),
            assistant.and_then(|a| a.instructions.as_deref()),
            request.options.instructions.as_deref(),
        ]);

        let mut tools = self.registry.declarations(&request.context);
        if let Some(assistant) = assistant {
            if !assistant.vector_store_ids.is_empty() {
                tools.push(ToolDeclaration::FileSearch {
                    vector_store_ids: assistant.vector_store_ids.clone(),
                });
            }
            for function in &assistant.functions {
                let declared = tools.iter().any(|tool| {
                    matches!(tool, ToolDeclaration::Function { name, .. } if *name == function.name)
                });
                if !declared {
                    tools.push(ToolDeclaration::Function {
                        name: function.name.clone(),
                        description: function.description.clone(),
                        parameters: function.parameters.clone(),
                    });
                }
            }
        }
        if request.options.web_search || assistant.is_some_and(|a| a.web_search) {
            tools.push(ToolDeclaration::WebSearch);
        }

        ResponseParams {
            model: assistant
                .and_then(|a| a.model.clone())
                .unwrap_or_else(|| self.default_model.clone()),
            instructions: Some(instructions),
            input: ResponseInput::Text(prompt_with_selections(
                &request.prompt,
                &request.options.document_selections,
            )),
            temperature: assistant
                .and_then(|a| a.temperature)
                .or_else(|| conversation.and_then(|c| c.temperature)),
            top_p: assistant
                .and_then(|a| a.top_p)
                .or_else(|| conversation.and_then(|c| c.top_p)),
            max_output_tokens: assistant
                .and_then(|a| a.max_output_tokens)
                .or_else(|| conversation.and_then(|c| c.max_output_tokens)),
            tools,
            previous_response_id: conversation.and_then(|c| c.last_response_id.clone()),
        }
    }

    /// Run a turn with blocking vendor calls
    ///
    /// # Errors
    ///
    /// Returns the first vendor, tool, or database error, or `ToolLoopExceeded`
    pub async fn run(&self, request: TurnRequest) -> AppResult<TurnOutcome> {
        self.run_turn(request, None).await
    }

    /// Run a turn with streaming vendor calls, forwarding text to `sink`
    ///
    /// Text already sent stays sent when the turn fails later.
    ///
    /// # Errors
    ///
    /// Returns the first vendor, tool, or database error, `ToolLoopExceeded`,
    /// or an error when the receiving side of `sink` is gone
    pub async fn run_streaming(
        &self,
        request: TurnRequest,
        sink: mpsc::Sender<Bytes>,
    ) -> AppResult<TurnOutcome> {
        self.run_turn(request, Some(&sink)).await
    }

    async fn run_turn(
        &self,
        request: TurnRequest,
        sink: Option<&mpsc::Sender<Bytes>>,
    ) -> AppResult<TurnOutcome> {
        let context = Arc::clone(&request.context);
        let span = tenant_span!(info, "chat_turn", context.user_id, context.tenant_id);

        async move {
            if let Some(conversation_id) = context.conversation_id {
                self.database
                    .insert_prompt(
                        conversation_id,
                        context.tenant_id,
                        context.user_id,
                        &request.prompt,
                        Some(&request.options.document_selections),
                    )
                    .await?;
            }

            let mut params = self.build_params(&request);
            let mut forwarder = sink.map(TextForwarder::new);
            let cancel = CancellationToken::new();
            let mut input_tokens: u32 = 0;
            let mut total_tokens: u32 = 0;
            let mut iterations = 0;
            let mut state = TurnState::AwaitingVendorResponse;

            loop {
                state = match state {
                    TurnState::AwaitingVendorResponse => {
                        if iterations == MAX_TOOL_ITERATIONS {
                            warn!(iterations, "Vendor kept requesting tools");
                            return Err(AppError::tool_loop_exceeded(MAX_TOOL_ITERATIONS));
                        }
                        iterations += 1;

                        let started = Instant::now();
                        let response = self.call_vendor(&params, forwarder.as_mut()).await?;
                        let usage = response.usage.unwrap_or_default();
                        input_tokens = input_tokens.saturating_add(usage.input_tokens);
                        total_tokens = total_tokens.saturating_add(usage.output_tokens);
                        self.record_usage(&context, &params, &response, usage, started);

                        let outputs = self
                            .executor
                            .execute(Arc::clone(&context), &response.output, &cancel)
                            .await?;

                        if outputs.is_empty() {
                            TurnState::Terminal(response)
                        } else {
                            info!(iteration = iterations, tool_calls = outputs.len(), "Tool calls executed");
                            TurnState::ToolCallPending {
                                response_id: response.id,
                                outputs,
                            }
                        }
                    }
                    TurnState::ToolCallPending {
                        response_id,
                        outputs,
                    } => {
                        params.input = ResponseInput::Items(
                            outputs.into_iter().map(ToolOutput::into_input_item).collect(),
                        );
                        params.previous_response_id = Some(response_id);
                        TurnState::AwaitingVendorResponse
                    }
                    TurnState::Terminal(response) => {
                        return Ok(self
                            .finish(&context, response, input_tokens, total_tokens, iterations)
                            .await);
                    }
                };
            }
        }
        .instrument(span)
        .await
    }

    async fn call_vendor(
        &self,
        params: &ResponseParams,
        forwarder: Option<&mut TextForwarder<'_>>,
    ) -> AppResult<VendorResponse> {
        let Some(forwarder) = forwarder else {
            return self.responses.create_response(params).await;
        };

        let mut stream = self.responses.create_streaming_response(params).await?;
        while let Some(event) = stream.next().await {
            match event? {
                ResponseStreamEvent::TextDelta(delta) => forwarder.delta(delta).await?,
                ResponseStreamEvent::TextDone(text) => forwarder.segment_done(text).await?,
                ResponseStreamEvent::Completed(response) => return Ok(response),
            }
        }

        Err(AppError::external_service(
            "LLM vendor",
            "stream ended before the response completed",
        ))
    }

    fn record_usage(
        &self,
        context: &ChatContext,
        params: &ResponseParams,
        response: &VendorResponse,
        usage: ResponseUsage,
        started: Instant,
    ) {
        let model = if response.model.is_empty() {
            params.model.as_str()
        } else {
            response.model.as_str()
        };

        TenantLogger::log_vendor_call(&VendorCallContext {
            user_id: context.user_id,
            tenant_id: context.tenant_id,
            vendor: self.responses.vendor(),
            model,
            response_id: &response.id,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            tool_calls: crate::tools::extract_tool_calls(&response.output).len(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        });

        self.usage.record_best_effort(TokenUsageRecord {
            tenant_id: context.tenant_id,
            user_id: context.user_id,
            conversation_id: context.conversation_id,
            vendor: self.responses.vendor().to_owned(),
            model: model.to_owned(),
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
        });
    }

    async fn finish(
        &self,
        context: &ChatContext,
        response: VendorResponse,
        input_tokens: u32,
        total_tokens: u32,
        iterations: usize,
    ) -> TurnOutcome {
        let message = response.output_text();

        // Both counters cover every vendor call of the turn
        if let Some(conversation_id) = context.conversation_id {
            let completion = NewCompletion {
                conversation_id,
                tenant_id: context.tenant_id,
                user_id: context.user_id,
                content: &message,
                response_id: &response.id,
                model: &response.model,
                input_tokens,
                output_tokens: total_tokens,
            };
            if let Err(e) = self.database.insert_completion(&completion).await {
                warn!(error = %e, "Failed to persist completion");
            }
            if let Err(e) = self
                .database
                .set_last_response_id(conversation_id, context.tenant_id, &response.id)
                .await
            {
                warn!(error = %e, "Failed to link previous response");
            }
        }

        let span = Span::current();
        span.record("iterations", iterations);
        span.record("total_tokens", total_tokens);

        TurnOutcome {
            message,
            status: response.status.unwrap_or_else(|| "completed".to_owned()),
            total_tokens,
            response_id: response.id,
            iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::database::AssistantFunction;
    use crate::models::TenantId;

    fn request(context: ChatContext) -> TurnRequest {
        TurnRequest {
            context: Arc::new(context),
            prompt: "How is the hub secured?".to_owned(),
            conversation: None,
            assistant: None,
            options: PromptOptions::default(),
        }
    }

    fn assistant() -> AssistantRecord {
        AssistantRecord {
            id: Uuid::new_v4().to_string(),
            tenant_id: TenantId::new().to_string(),
            name: "Architect".to_owned(),
            model: Some("gpt-4.1-mini".to_owned()),
            instructions: Some("Prefer Azure services.".to_owned()),
            temperature: Some(0.2),
            top_p: None,
            max_output_tokens: Some(800),
            vector_store_ids: vec!["vs_1".to_owned()],
            web_search: false,
            functions: vec![
                AssistantFunction {
                    name: "document_search".to_owned(),
                    description: "duplicate".to_owned(),
                    parameters: json!({}),
                },
                AssistantFunction {
                    name: "estimate_cost".to_owned(),
                    description: "Estimate monthly cost".to_owned(),
                    parameters: json!({"type": "object"}),
                },
            ],
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_selections_are_prepended() {
        let selections = vec![
            DocumentSelection {
                document_id: "d1".to_owned(),
                title: Some("Runbook".to_owned()),
                text: "Rotate keys monthly.".to_owned(),
            },
            DocumentSelection {
                document_id: "d2".to_owned(),
                title: None,
                text: "Use private endpoints.".to_owned(),
            },
        ];
        assert_eq!(
            prompt_with_selections("Summarize", &selections),
            "From \"Runbook\":\nRotate keys monthly.\n\nUse private endpoints.\n\nSummarize"
        );
        assert_eq!(prompt_with_selections("Summarize", &[]), "Summarize");
    }

    #[test]
    fn test_require_prompt_rejects_blank() {
        assert!(require_prompt("  ").is_err());
        assert!(require_prompt("hi").is_ok());
    }

    #[test]
    fn test_quick_chat_body_flattens_options() {
        let body: QuickChatRequest = serde_json::from_value(json!({
            "prompt": "hi",
            "web_search": true,
            "instructions": "be brief"
        }))
        .unwrap();
        assert!(body.options.web_search);
        assert_eq!(body.options.instructions.as_deref(), Some("be brief"));
        assert!(body.options.document_selections.is_empty());
        assert_eq!(body.resource_group_type, ResourceGroupType::Project);
    }

    // Parameter building needs an orchestrator; the vendor and backend are never called
    mod params {
        use async_trait::async_trait;

        use super::*;
        use crate::config::DatabaseUrl;
        use crate::llm::ResponseStream;
        use crate::tools::{ProjectInfo, SearchHit};

        struct Unused;

        #[async_trait]
        impl ResponsesApi for Unused {
            fn vendor(&self) -> &str {
                "test"
            }
            async fn create_response(&self, _: &ResponseParams) -> AppResult<VendorResponse> {
                Err(AppError::internal("unused"))
            }
            async fn create_streaming_response(&self, _: &ResponseParams) -> AppResult<ResponseStream> {
                Err(AppError::internal("unused"))
            }
        }

        #[async_trait]
        impl ToolBackend for Unused {
            async fn search_documents(&self, _: &ChatContext, _: &str, _: usize) -> AppResult<Vec<SearchHit>> {
                Ok(Vec::new())
            }
            async fn search_diagrams(&self, _: &ChatContext, _: &str, _: usize) -> AppResult<Vec<SearchHit>> {
                Ok(Vec::new())
            }
            async fn project_info(&self, _: &ChatContext, _: bool) -> AppResult<Option<ProjectInfo>> {
                Ok(None)
            }
        }

        async fn orchestrator() -> ChatOrchestrator {
            let database = Arc::new(Database::new(&DatabaseUrl::Memory).await.unwrap());
            ChatOrchestrator::with_backend(
                database,
                Arc::new(Unused),
                Arc::new(Unused),
                "gpt-4.1".to_owned(),
            )
        }

        #[tokio::test]
        async fn test_defaults_without_conversation_or_assistant() {
            let orchestrator = orchestrator().await;
            let params =
                orchestrator.build_params(&request(ChatContext::new(Uuid::new_v4(), TenantId::new())));

            assert_eq!(params.model, "gpt-4.1");
            assert_eq!(params.tools.len(), 2);
            assert!(params.previous_response_id.is_none());
            assert_eq!(
                params.input,
                ResponseInput::Text("How is the hub secured?".to_owned())
            );
        }

        #[tokio::test]
        async fn test_assistant_overrides_conversation() {
            let orchestrator = orchestrator().await;
            let mut turn = request(
                ChatContext::new(Uuid::new_v4(), TenantId::new())
                    .with_resource_group(ResourceGroupType::Project, Some(Uuid::new_v4())),
            );
            turn.conversation = Some(ConversationRecord {
                id: Uuid::new_v4().to_string(),
                tenant_id: String::new(),
                user_id: String::new(),
                title: "t".to_owned(),
                assistant_id: None,
                temperature: Some(0.9),
                top_p: Some(0.5),
                max_output_tokens: None,
                system_prompt: Some("Answer as a reviewer.".to_owned()),
                last_response_id: Some("resp_prev".to_owned()),
                created_at: String::new(),
                updated_at: String::new(),
            });
            turn.assistant = Some(assistant());
            turn.options.web_search = true;

            let params = orchestrator.build_params(&turn);

            assert_eq!(params.model, "gpt-4.1-mini");
            assert_eq!(params.temperature, Some(0.2));
            assert_eq!(params.top_p, Some(0.5));
            assert_eq!(params.max_output_tokens, Some(800));
            assert_eq!(params.previous_response_id.as_deref(), Some("resp_prev"));

            let instructions = params.instructions.unwrap();
            assert!(instructions.contains("Answer as a reviewer."));
            assert!(instructions.contains("Prefer Azure services."));

            // 3 registry tools, file search, one new assistant function, web search
            assert_eq!(params.tools.len(), 6);
            assert!(params.tools.contains(&ToolDeclaration::WebSearch));
            assert!(params.tools.contains(&ToolDeclaration::FileSearch {
                vector_store_ids: vec!["vs_1".to_owned()]
            }));
        }
    }
}
