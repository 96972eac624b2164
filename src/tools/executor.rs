// ABOUTME: Runs every tool call of one vendor turn concurrently, at most eight at a time
// ABOUTME: The first failure cancels the siblings and is returned alone, never with partial results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Tool Executor
//!
//! One task per tool call, gated by a semaphore of [`MAX_CONCURRENT_TOOL_CALLS`]
//! permits. Results are correlated by call ID; the order of the returned
//! outputs carries no meaning.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::registry::ToolDispatcher;
use crate::errors::ToolError;
use crate::llm::{InputItem, OutputItem};
use crate::logging::TenantLogger;
use crate::models::ChatContext;

/// Fixed cap on tool calls running at once within one vendor turn
pub const MAX_CONCURRENT_TOOL_CALLS: usize = 8;

/// A tool call extracted from a vendor response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Index of the item in the response's output list
    pub position: usize,
    /// Vendor-assigned correlation ID
    pub call_id: String,
    /// Tool name
    pub name: String,
    /// Opaque JSON argument blob
    pub arguments: String,
}

/// Output of one successful tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Call ID of the originating request
    pub call_id: String,
    /// Tool output text, possibly empty
    pub output: String,
}

impl ToolOutput {
    /// Convert into the input item sent with the next vendor call
    #[must_use]
    pub fn into_input_item(self) -> InputItem {
        InputItem::FunctionCallOutput {
            call_id: self.call_id,
            output: self.output,
        }
    }
}

/// Scan output items once and keep the function calls in original order
#[must_use]
pub fn extract_tool_calls(items: &[OutputItem]) -> Vec<ToolCallRequest> {
    items
        .iter()
        .enumerate()
        .filter_map(|(position, item)| match item {
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => Some(ToolCallRequest {
                position,
                call_id: call_id.clone(),
                name: name.clone(),
                arguments: arguments.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Bounded-concurrency executor over a dispatcher
#[derive(Clone)]
pub struct ToolExecutor {
    dispatcher: Arc<dyn ToolDispatcher>,
}

impl ToolExecutor {
    /// Create an executor
    #[must_use]
    pub fn new(dispatcher: Arc<dyn ToolDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Execute all tool calls in `items`
    ///
    /// Returns an empty list without dispatching anything when `items` holds
    /// no function calls. Cancelling `cancel` aborts calls still waiting for a
    /// permit or still running.
    ///
    /// # Errors
    ///
    /// Returns the first tool error; the remaining calls are cancelled and
    /// their outputs discarded
    pub async fn execute(
        &self,
        context: Arc<ChatContext>,
        items: &[OutputItem],
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolOutput>, ToolError> {
        let calls = extract_tool_calls(items);
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        debug!(tool_calls = calls.len(), "Executing tool calls");

        let batch = cancel.child_token();
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_TOOL_CALLS));
        let mut tasks = JoinSet::new();

        for (slot, call) in calls.iter().cloned().enumerate() {
            let dispatcher = Arc::clone(&self.dispatcher);
            let context = Arc::clone(&context);
            let semaphore = Arc::clone(&semaphore);
            let batch = batch.clone();

            tasks.spawn(async move {
                let result = run_call(&*dispatcher, &context, &semaphore, &batch, call).await;
                (slot, result)
            });
        }

        let mut finished = vec![false; calls.len()];
        let mut outputs = Vec::with_capacity(calls.len());
        let mut first_error: Option<ToolError> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, result)) => {
                    finished[slot] = true;
                    match result {
                        Ok(output) => outputs.push(output),
                        Err(tool_error) => {
                            if first_error.is_none() {
                                batch.cancel();
                                first_error = Some(tool_error);
                            }
                        }
                    }
                }
                Err(join_error) => {
                    error!("Tool task failed to complete: {join_error}");
                    batch.cancel();
                }
            }
        }

        if let Some(tool_error) = first_error {
            return Err(tool_error);
        }

        // A task that panicked never reported its slot
        if let Some(slot) = finished.iter().position(|done| !done) {
            return Err(ToolError::execution_failed(
                calls[slot].name.clone(),
                "task failed during execution",
            ));
        }

        Ok(outputs)
    }
}

async fn run_call(
    dispatcher: &dyn ToolDispatcher,
    context: &ChatContext,
    semaphore: &Semaphore,
    cancel: &CancellationToken,
    call: ToolCallRequest,
) -> Result<ToolOutput, ToolError> {
    let _permit = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(ToolError::cancelled(call.name.clone())),
        permit = semaphore.acquire() => {
            permit.map_err(|_| ToolError::cancelled(call.name.clone()))?
        }
    };

    let started = Instant::now();
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ToolError::cancelled(call.name.clone())),
        result = dispatcher.dispatch(context, &call.name, &call.arguments) => result,
    };

    TenantLogger::log_tool_call(
        context.user_id,
        context.tenant_id,
        &call.name,
        result.is_ok(),
        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    );

    result.map(|output| ToolOutput {
        call_id: call.call_id,
        output,
    })
}
