// ABOUTME: LLM vendor abstraction for the Responses-style chat API and embeddings
// ABOUTME: Defines request/response items, streaming events, and the per-tenant client factory
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # LLM Vendor Interface
//!
//! The chat orchestrator talks to the vendor through the [`ResponsesApi`]
//! trait and converts search queries into vectors through [`EmbeddingApi`].
//! Both are built per request by an [`LlmClientFactory`] from the tenant's AI
//! settings, so nothing here caches credentials.
//!
//! ## Key Concepts
//!
//! - **`ResponseParams`**: model, instructions, sampling controls, input, tools,
//!   and the optional `previous_response_id` that carries server-side history
//! - **`VendorResponse`**: output items (text and/or function calls) plus usage
//! - **`ResponseStreamEvent`**: incremental text deltas, end-of-text markers,
//!   and the completed response

mod factory;
mod openai_responses;
pub mod prompts;
pub mod sse_parser;

pub use factory::TenantLlmFactory;
pub use openai_responses::{OpenAiResponsesClient, OpenAiResponsesConfig};
pub use prompts::default_instructions;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::Stream;

use crate::errors::AppResult;
use crate::models::TenantId;

// ============================================================================
// Request Types
// ============================================================================

/// Input for a vendor call: a bare prompt or a structured item list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseInput {
    /// Plain prompt text
    Text(String),
    /// Structured items (tool outputs, role messages)
    Items(Vec<InputItem>),
}

impl Default for ResponseInput {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// A structured input item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputItem {
    /// A role-tagged message
    Message {
        /// `user`, `assistant`, or `developer`
        role: String,
        /// Message text
        content: String,
    },
    /// Output of a locally executed tool, correlated by call ID
    FunctionCallOutput {
        /// Call ID the vendor assigned to the request
        call_id: String,
        /// Tool output text
        output: String,
    },
}

/// A tool the vendor may use during the response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDeclaration {
    /// A locally executed function
    Function {
        /// Function name
        name: String,
        /// When the model should call it
        description: String,
        /// JSON schema of the arguments
        parameters: Value,
    },
    /// Vendor-hosted file search over vector stores
    FileSearch {
        /// Vector stores to search
        vector_store_ids: Vec<String>,
    },
    /// Vendor-hosted web search
    #[serde(rename = "web_search_preview")]
    WebSearch,
}

/// Parameters of one vendor call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseParams {
    /// Model identifier
    pub model: String,
    /// System-level instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Prompt or structured items
    pub input: ResponseInput,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Output token cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Tools the vendor may use
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tools: Vec<ToolDeclaration>,
    /// Server-side history link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Content part of an output message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContent {
    /// Generated text
    OutputText {
        /// Text of this part
        text: String,
    },
    /// Refusals, annotations, and anything else we do not render
    #[serde(other)]
    Other,
}

/// One item of a vendor response's output list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    /// Assistant text
    Message {
        /// Content parts
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    /// Request to execute a local tool
    FunctionCall {
        /// Correlation ID for the tool output
        call_id: String,
        /// Tool name
        name: String,
        /// Opaque JSON argument blob
        arguments: String,
    },
    /// Hosted tool activity (file search, web search) and unknown items
    #[serde(other)]
    Other,
}

impl OutputItem {
    /// Convenience constructor for a text message item
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Message {
            content: vec![OutputContent::OutputText { text: text.into() }],
        }
    }

    /// Convenience constructor for a function-call item
    #[must_use]
    pub fn function_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::FunctionCall {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Token counters of one vendor call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseUsage {
    /// Prompt tokens
    pub input_tokens: u32,
    /// Completion tokens
    pub output_tokens: u32,
    /// Sum of both
    pub total_tokens: u32,
}

/// A complete vendor response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorResponse {
    /// Response ID, used as the next call's `previous_response_id`
    pub id: String,
    /// Vendor status (`completed`, `incomplete`, ...)
    #[serde(default)]
    pub status: Option<String>,
    /// Model echo
    #[serde(default)]
    pub model: String,
    /// Output items in vendor order
    #[serde(default)]
    pub output: Vec<OutputItem>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<ResponseUsage>,
}

impl VendorResponse {
    /// Concatenated text of all message items
    #[must_use]
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Message { content } => Some(content),
                _ => None,
            })
            .flatten()
            .filter_map(|part| match part {
                OutputContent::OutputText { text } => Some(text.as_str()),
                OutputContent::Other => None,
            })
            .collect()
    }
}

/// Events surfaced while consuming a streaming response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStreamEvent {
    /// Incremental text to forward to the client
    TextDelta(String),
    /// The full text of the current segment is available
    TextDone(String),
    /// The response finished; carries output items and usage
    Completed(VendorResponse),
}

/// Stream type for streaming vendor responses
pub type ResponseStream = Pin<Box<dyn Stream<Item = AppResult<ResponseStreamEvent>> + Send>>;

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Responses-style chat API
#[async_trait]
pub trait ResponsesApi: Send + Sync {
    /// Vendor name recorded with token usage (e.g. `openai`)
    fn vendor(&self) -> &str;

    /// Perform a blocking call
    async fn create_response(&self, params: &ResponseParams) -> AppResult<VendorResponse>;

    /// Perform a streaming call
    async fn create_streaming_response(&self, params: &ResponseParams) -> AppResult<ResponseStream>;
}

/// Text embedding API
#[async_trait]
pub trait EmbeddingApi: Send + Sync {
    /// Convert text into a fixed-length vector
    async fn create_embedding(&self, text: &str) -> AppResult<Vec<f32>>;
}

/// Short-lived vendor clients for one tenant
#[derive(Clone)]
pub struct TenantLlmClients {
    /// Chat client
    pub responses: Arc<dyn ResponsesApi>,
    /// Embedding client
    pub embeddings: Arc<dyn EmbeddingApi>,
    /// Default chat model for the tenant
    pub model: String,
}

/// Builds vendor clients from per-tenant configuration
#[async_trait]
pub trait LlmClientFactory: Send + Sync {
    /// Resolve the tenant's settings and construct fresh clients
    async fn clients_for_tenant(&self, tenant_id: TenantId) -> AppResult<TenantLlmClients>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_items_decode_vendor_shape() {
        let body = json!({
            "id": "resp_1",
            "status": "completed",
            "model": "gpt-4.1",
            "output": [
                {"type": "file_search_call", "id": "fs_1", "status": "completed"},
                {"type": "function_call", "id": "fc_1", "call_id": "call_1",
                 "name": "document_search", "arguments": "{\"query\":\"vnet\"}"},
                {"type": "message", "id": "msg_1", "role": "assistant",
                 "content": [{"type": "output_text", "text": "Hello", "annotations": []},
                             {"type": "refusal", "refusal": "no"}]}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 4, "total_tokens": 14}
        });

        let response: VendorResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.output.len(), 3);
        assert_eq!(response.output[0], OutputItem::Other);
        assert!(matches!(
            &response.output[1],
            OutputItem::FunctionCall { name, .. } if name == "document_search"
        ));
        assert_eq!(response.output_text(), "Hello");
        assert_eq!(response.usage.unwrap().output_tokens, 4);
    }

    #[test]
    fn test_params_serialize_tool_outputs_and_hosted_tools() {
        let params = ResponseParams {
            model: "gpt-4.1".to_owned(),
            input: ResponseInput::Items(vec![InputItem::FunctionCallOutput {
                call_id: "call_1".to_owned(),
                output: "result".to_owned(),
            }]),
            tools: vec![
                ToolDeclaration::WebSearch,
                ToolDeclaration::FileSearch {
                    vector_store_ids: vec!["vs_1".to_owned()],
                },
            ],
            previous_response_id: Some("resp_1".to_owned()),
            ..ResponseParams::default()
        };

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["input"][0]["type"], "function_call_output");
        assert_eq!(value["tools"][0]["type"], "web_search_preview");
        assert_eq!(value["tools"][1]["vector_store_ids"][0], "vs_1");
        assert_eq!(value["previous_response_id"], "resp_1");
        assert!(value.get("temperature").is_none());
    }
}
