// ABOUTME: reqwest client for OpenAI-style Responses and Embeddings endpoints
// ABOUTME: Implements ResponsesApi (blocking and SSE streaming) and EmbeddingApi
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Responses API Client
//!
//! Talks to `{base_url}/responses` and `{base_url}/embeddings`. Any vendor that
//! speaks the OpenAI Responses wire format works, including Azure OpenAI
//! deployments fronted by a compatible gateway.
//!
//! Vendor failures of any status map to `ExternalServiceError`, so callers
//! always see a 500 while the vendor message stays in the logs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use super::sse_parser::{
    create_sse_stream, is_retryable_request_error, is_retryable_status, RetryConfig,
};
use super::{
    EmbeddingApi, ResponseParams, ResponseStream, ResponseStreamEvent, ResponsesApi,
    VendorResponse,
};
use crate::errors::{AppError, AppResult};

/// Connection timeout for vendor calls
const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Whole-request timeout; streaming responses can run long
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Label used in error messages
const SERVICE_NAME: &str = "LLM vendor";

/// Connection settings for one tenant's vendor account
#[derive(Debug, Clone)]
pub struct OpenAiResponsesConfig {
    /// API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Bearer key
    pub api_key: String,
    /// Embedding model used by semantic search
    pub embedding_model: String,
    /// Vendor name recorded with token usage
    pub vendor: String,
    /// Retry policy for the initial request
    pub retry: RetryConfig,
}

/// Vendor client, constructed per request and dropped with it
pub struct OpenAiResponsesClient {
    client: Client,
    config: OpenAiResponsesConfig,
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    #[serde(flatten)]
    params: &'a ResponseParams,
    stream: bool,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct VendorErrorResponse {
    error: VendorErrorDetail,
}

#[derive(Deserialize)]
struct VendorErrorDetail {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

/// Streaming payloads, discriminated by the JSON `type` field
#[derive(Deserialize)]
#[serde(tag = "type")]
enum StreamPayload {
    #[serde(rename = "response.output_text.delta")]
    TextDelta { delta: String },
    #[serde(rename = "response.output_text.done")]
    TextDone { text: String },
    #[serde(rename = "response.completed")]
    Completed { response: VendorResponse },
    #[serde(rename = "response.failed")]
    Failed { response: Value },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(other)]
    Other,
}

/// Map one SSE data payload to an orchestrator event
fn decode_stream_payload(data: &str) -> Option<AppResult<ResponseStreamEvent>> {
    match serde_json::from_str::<StreamPayload>(data) {
        Ok(StreamPayload::TextDelta { delta }) => Some(Ok(ResponseStreamEvent::TextDelta(delta))),
        Ok(StreamPayload::TextDone { text }) => Some(Ok(ResponseStreamEvent::TextDone(text))),
        Ok(StreamPayload::Completed { response }) => {
            Some(Ok(ResponseStreamEvent::Completed(response)))
        }
        Ok(StreamPayload::Failed { response }) => {
            let message = response
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("response failed")
                .to_owned();
            Some(Err(AppError::external_service(SERVICE_NAME, message)))
        }
        Ok(StreamPayload::Error { message }) => {
            Some(Err(AppError::external_service(SERVICE_NAME, message)))
        }
        Ok(StreamPayload::Other) => None,
        Err(e) => {
            warn!("Failed to parse stream event: {e}");
            None
        }
    }
}

// ============================================================================
// Client Implementation
// ============================================================================

impl OpenAiResponsesClient {
    /// Build a client for the given account
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiResponsesConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'))
    }

    fn parse_error_response(status: StatusCode, body: &str) -> AppError {
        match serde_json::from_str::<VendorErrorResponse>(body) {
            Ok(parsed) if status == StatusCode::TOO_MANY_REQUESTS => AppError::external_service(
                SERVICE_NAME,
                format!("rate limited: {}", parsed.error.message),
            ),
            Ok(parsed) => AppError::external_service(
                SERVICE_NAME,
                format!(
                    "{status} {} - {}",
                    parsed.error.error_type.as_deref().unwrap_or("unknown"),
                    parsed.error.message
                ),
            ),
            Err(_) => AppError::external_service(
                SERVICE_NAME,
                format!(
                    "API error ({status}): {}",
                    body.chars().take(200).collect::<String>()
                ),
            ),
        }
    }

    /// Send a request, retrying transient failures before any byte is read
    async fn send_with_retry<F>(&self, build: F) -> AppResult<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            let result = build().bearer_auth(&self.config.api_key).send().await;
            let retryable = match &result {
                Ok(response) => is_retryable_status(response.status().as_u16()),
                Err(e) => is_retryable_request_error(e),
            };

            if retryable && attempt < retry.max_retries {
                let delay = retry.delay_for_attempt(attempt);
                warn!(attempt, ?delay, "Retrying vendor request");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let response = result.map_err(|e| {
                error!("Failed to reach vendor: {e}");
                AppError::external_service(SERVICE_NAME, format!("Failed to connect: {e}"))
            })?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error_response(status, &body));
        }
    }
}

#[async_trait]
impl ResponsesApi for OpenAiResponsesClient {
    fn vendor(&self) -> &str {
        &self.config.vendor
    }

    #[instrument(skip(self, params), fields(model = %params.model, tools = params.tools.len()))]
    async fn create_response(&self, params: &ResponseParams) -> AppResult<VendorResponse> {
        let url = self.api_url("responses");
        let body = ResponsesRequest {
            params,
            stream: false,
        };
        let response = self
            .send_with_retry(|| self.client.post(&url).json(&body))
            .await?;

        let text = response.text().await.map_err(|e| {
            AppError::external_service(SERVICE_NAME, format!("Failed to read response: {e}"))
        })?;

        let parsed: VendorResponse = serde_json::from_str(&text).map_err(|e| {
            error!(
                "Failed to parse vendor response: {e} - body: {}",
                text.chars().take(500).collect::<String>()
            );
            AppError::external_service(SERVICE_NAME, format!("Failed to parse response: {e}"))
        })?;

        debug!(
            response_id = %parsed.id,
            output_items = parsed.output.len(),
            "Received vendor response"
        );
        Ok(parsed)
    }

    #[instrument(skip(self, params), fields(model = %params.model, tools = params.tools.len()))]
    async fn create_streaming_response(&self, params: &ResponseParams) -> AppResult<ResponseStream> {
        let url = self.api_url("responses");
        let body = ResponsesRequest {
            params,
            stream: true,
        };
        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("Accept", "text/event-stream")
                    .json(&body)
            })
            .await?;

        Ok(create_sse_stream(
            response.bytes_stream(),
            decode_stream_payload,
            SERVICE_NAME,
        ))
    }
}

#[async_trait]
impl EmbeddingApi for OpenAiResponsesClient {
    #[instrument(skip(self, text), fields(model = %self.config.embedding_model, chars = text.len()))]
    async fn create_embedding(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = self.api_url("embeddings");
        let body = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };
        let response = self
            .send_with_retry(|| self.client.post(&url).json(&body))
            .await?;

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::external_service(SERVICE_NAME, format!("Failed to parse embedding: {e}"))
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| AppError::external_service(SERVICE_NAME, "API returned no embedding"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::llm::{OutputItem, ResponseInput};
    use futures_util::StreamExt;
    use serde_json::json;

    fn client_for(server: &mockito::Server) -> OpenAiResponsesClient {
        OpenAiResponsesClient::new(OpenAiResponsesConfig {
            base_url: server.url(),
            api_key: "sk-test".to_owned(),
            embedding_model: "text-embedding-3-small".to_owned(),
            vendor: "openai".to_owned(),
            retry: RetryConfig::disabled(),
        })
        .unwrap()
    }

    fn params() -> ResponseParams {
        ResponseParams {
            model: "gpt-4.1".to_owned(),
            input: ResponseInput::Text("hello".to_owned()),
            ..ResponseParams::default()
        }
    }

    #[tokio::test]
    async fn test_create_response_parses_function_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/responses")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": "gpt-4.1",
                "input": "hello",
                "stream": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "resp_1",
                    "output": [{"type": "function_call", "call_id": "c1",
                                "name": "project_info", "arguments": "{}"}],
                    "usage": {"input_tokens": 3, "output_tokens": 2, "total_tokens": 5}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let response = client_for(&server).create_response(&params()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(
            response.output,
            vec![OutputItem::function_call("c1", "project_info", "{}")]
        );
    }

    #[tokio::test]
    async fn test_vendor_auth_failure_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/responses")
            .with_status(401)
            .with_body(r#"{"error":{"message":"bad key","type":"invalid_request_error"}}"#)
            .create_async()
            .await;

        let error = client_for(&server).create_response(&params()).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::ExternalServiceError);
        assert!(error.message.contains("bad key"));
    }

    #[tokio::test]
    async fn test_streaming_response_yields_deltas_then_completion() {
        let body = concat!(
            "event: response.created\n",
            "data: {\"type\":\"response.created\",\"response\":{\"id\":\"resp_9\"}}\n\n",
            "event: response.output_text.delta\n",
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"Hel\"}\n\n",
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"lo\"}\n\n",
            "data: {\"type\":\"response.output_text.done\",\"text\":\"Hello\"}\n\n",
            "data: {\"type\":\"response.completed\",\"response\":{\"id\":\"resp_9\",",
            "\"output\":[],\"usage\":{\"input_tokens\":1,\"output_tokens\":2,\"total_tokens\":3}}}\n\n"
        );
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/responses")
            .match_body(mockito::Matcher::PartialJson(json!({"stream": true})))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let events: Vec<_> = client_for(&server)
            .create_streaming_response(&params())
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;

        assert_eq!(events.len(), 4);
        assert_eq!(events[0], ResponseStreamEvent::TextDelta("Hel".to_owned()));
        assert_eq!(events[2], ResponseStreamEvent::TextDone("Hello".to_owned()));
        match &events[3] {
            ResponseStreamEvent::Completed(response) => assert_eq!(response.id, "resp_9"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_embedding() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .match_body(mockito::Matcher::PartialJson(
                json!({"model": "text-embedding-3-small", "input": "vnet peering"}),
            ))
            .with_status(200)
            .with_body(r#"{"data":[{"embedding":[0.5,0.25]}]}"#)
            .create_async()
            .await;

        let vector = client_for(&server)
            .create_embedding("vnet peering")
            .await
            .unwrap();
        assert_eq!(vector, vec![0.5, 0.25]);
    }
}
