// ABOUTME: Core data models for the Blueprint API, re-exported from the core crate
// ABOUTME: Tenant identifiers, resource-group scopes, and the request-scoped chat context
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Data Models
//!
//! Persistent record types live next to their queries in [`crate::database`].

pub use blueprint_core::models::{ChatContext, ResourceGroupType, TenantId};
