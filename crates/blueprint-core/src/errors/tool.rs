// ABOUTME: Tool-specific error types for the chat function-calling pipeline
// ABOUTME: Every variant carries the tool name so batch failures identify the culprit
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Tool Error Types
//!
//! Structured errors raised while dispatching vendor-requested tool calls.
//! They convert into `AppError` for HTTP response formatting.

use std::error::Error;
use std::fmt;

/// Errors specific to tool dispatch and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool with this name is registered
    UnknownTool {
        /// Name the vendor asked for
        tool_name: String,
    },
    /// Arguments did not decode into the tool's expected shape
    InvalidArguments {
        /// Name of the tool
        tool_name: String,
        /// Decoder message
        reason: String,
    },
    /// The tool implementation failed
    ExecutionFailed {
        /// Name of the tool that failed
        tool_name: String,
        /// Details about the failure
        details: String,
    },
    /// The tool was aborted because a sibling call failed
    Cancelled {
        /// Name of the cancelled tool
        tool_name: String,
    },
}

impl ToolError {
    /// Create an "unknown tool" error
    #[must_use]
    pub fn unknown_tool(tool_name: impl Into<String>) -> Self {
        Self::UnknownTool {
            tool_name: tool_name.into(),
        }
    }

    /// Create an "invalid arguments" error
    #[must_use]
    pub fn invalid_arguments(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an "execution failed" error
    #[must_use]
    pub fn execution_failed(tool_name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            tool_name: tool_name.into(),
            details: details.into(),
        }
    }

    /// Create a "cancelled" error
    #[must_use]
    pub fn cancelled(tool_name: impl Into<String>) -> Self {
        Self::Cancelled {
            tool_name: tool_name.into(),
        }
    }

    /// Get the tool name associated with this error
    #[must_use]
    pub fn tool_name(&self) -> &str {
        match self {
            Self::UnknownTool { tool_name }
            | Self::InvalidArguments { tool_name, .. }
            | Self::ExecutionFailed { tool_name, .. }
            | Self::Cancelled { tool_name } => tool_name,
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool { tool_name } => {
                write!(f, "unknown function call: {tool_name}")
            }
            Self::InvalidArguments { tool_name, reason } => {
                write!(f, "invalid function arguments for {tool_name}: {reason}")
            }
            Self::ExecutionFailed { tool_name, details } => {
                write!(f, "tool {tool_name} failed: {details}")
            }
            Self::Cancelled { tool_name } => {
                write!(f, "tool {tool_name} cancelled")
            }
        }
    }
}

impl Error for ToolError {}
