// ABOUTME: HTTP middleware shared by all routes
// ABOUTME: Currently the CORS layer built from server configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

/// CORS configuration
pub mod cors;

pub use cors::setup_cors;
