// ABOUTME: Domain service layer for business logic extracted from route handlers
// ABOUTME: Chat orchestration, usage recording, credential storage, and tenant AI settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! Domain service layer
//!
//! Route handlers authenticate and decode; the rules that span the database,
//! the vault, and the LLM vendor live here.

/// Tenant AI settings with vault-held API keys
pub mod ai_settings;

/// The function-calling loop behind prompt submission and quick chat
pub mod chat_orchestration;

/// Cloud credentials: secret in the vault, reference in the database
pub mod credentials;

/// Best-effort token usage writes
pub mod usage;
