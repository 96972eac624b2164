// ABOUTME: Core types for the Blueprint multi-tenant API platform
// ABOUTME: Foundation crate with error handling, identifiers, and request-scoped chat context
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

#![deny(unsafe_code)]

//! # Blueprint Core
//!
//! Foundation crate providing shared types for the Blueprint platform. It is
//! designed to change infrequently so the main crate can compile incrementally.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `ToolError`
//! - **models**: Tenant identifiers, resource-group scopes, and the chat context

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Identifier newtypes and request-scoped data models
pub mod models;
