// ABOUTME: Error types for the Blueprint API, re-exported from the core crate
// ABOUTME: AppError renders JSON error bodies and hides upstream details behind a generic 500
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Unified Error Handling System
//!
//! The types live in `blueprint-core` so collaborators can share them; this
//! module keeps the `crate::errors` path stable for the server crate.

pub use blueprint_core::errors::{
    AppError, AppResult, ErrorCode, ErrorResponse, ErrorResponseDetails, ToolError,
};
