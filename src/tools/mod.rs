// ABOUTME: Function-calling tools offered to the LLM during chat turns
// ABOUTME: Registry declares and dispatches tools; the executor fans calls out under a fixed cap
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Chat Tools
//!
//! - **registry**: tool schemas per chat context and dispatch by name
//! - **backend**: data access behind the tools (semantic search, project lookup)
//! - **executor**: bounded-concurrency fan-out over one vendor turn's tool calls

/// Data access behind the tools
pub mod backend;

/// Bounded-concurrency executor for one vendor turn
pub mod executor;

/// Tool declarations and dispatch
pub mod registry;

pub use backend::{
    load_project_info, DatabaseToolBackend, DocumentSummary, ProjectInfo, SearchHit, ToolBackend,
};
pub use executor::{
    extract_tool_calls, ToolCallRequest, ToolExecutor, ToolOutput, MAX_CONCURRENT_TOOL_CALLS,
};
pub use registry::{clamp_search_limit, ToolDescriptor, ToolDispatcher, ToolRegistry};
