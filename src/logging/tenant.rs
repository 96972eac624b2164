// ABOUTME: Tenant-aware structured logging for tool calls, vendor calls, auth, and vault access
// ABOUTME: Every event carries tenant_id and user_id so logs can be filtered per customer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::TenantId;

/// Context for vendor call logging
pub struct VendorCallContext<'a> {
    /// User the call was made for
    pub user_id: Uuid,
    /// Tenant the call is billed to
    pub tenant_id: TenantId,
    /// Vendor label
    pub vendor: &'a str,
    /// Model used
    pub model: &'a str,
    /// Vendor response ID
    pub response_id: &'a str,
    /// Prompt tokens
    pub input_tokens: u32,
    /// Completion tokens
    pub output_tokens: u32,
    /// Tool calls requested by the response
    pub tool_calls: usize,
    /// Call duration in milliseconds
    pub duration_ms: u64,
}

/// Tenant-aware logging utilities
pub struct TenantLogger;

impl TenantLogger {
    /// Log a finished tool call
    pub fn log_tool_call(
        user_id: Uuid,
        tenant_id: TenantId,
        tool_name: &str,
        success: bool,
        duration_ms: u64,
    ) {
        if success {
            info!(
                user_id = %user_id,
                tenant_id = %tenant_id,
                tool_name = %tool_name,
                success,
                duration_ms,
                event_type = "tool_call",
                "Tool call completed"
            );
        } else {
            warn!(
                user_id = %user_id,
                tenant_id = %tenant_id,
                tool_name = %tool_name,
                success,
                duration_ms,
                event_type = "tool_call",
                "Tool call failed"
            );
        }
    }

    /// Log one vendor round trip
    pub fn log_vendor_call(context: &VendorCallContext<'_>) {
        info!(
            user_id = %context.user_id,
            tenant_id = %context.tenant_id,
            vendor = %context.vendor,
            model = %context.model,
            response_id = %context.response_id,
            input_tokens = context.input_tokens,
            output_tokens = context.output_tokens,
            tool_calls = context.tool_calls,
            duration_ms = context.duration_ms,
            event_type = "vendor_call",
            "Vendor call completed"
        );
    }

    /// Log a bearer-token check
    pub fn log_auth_event(
        user_id: Option<Uuid>,
        tenant_id: Option<TenantId>,
        success: bool,
        error_details: Option<&str>,
    ) {
        if success {
            debug!(
                user_id = ?user_id,
                tenant_id = ?tenant_id,
                event_type = "authentication",
                "Authentication successful"
            );
        } else {
            warn!(
                user_id = ?user_id,
                tenant_id = ?tenant_id,
                error_details = ?error_details,
                event_type = "authentication",
                "Authentication failed"
            );
        }
    }

    /// Log a secret vault operation; never logs secret values
    pub fn log_vault_operation(tenant_id: TenantId, operation: &str, secret_name: &str, success: bool) {
        if success {
            info!(
                tenant_id = %tenant_id,
                vault_operation = %operation,
                secret_name = %secret_name,
                event_type = "vault_operation",
                "Vault operation completed"
            );
        } else {
            warn!(
                tenant_id = %tenant_id,
                vault_operation = %operation,
                secret_name = %secret_name,
                event_type = "vault_operation",
                "Vault operation failed"
            );
        }
    }
}

/// Create a tenant-aware span for chat operations
#[macro_export]
macro_rules! tenant_span {
    (info, $name:expr, $user_id:expr, $tenant_id:expr) => {
        tracing::info_span!(
            $name,
            user_id = %$user_id,
            tenant_id = %$tenant_id,
            iterations = tracing::field::Empty,
            total_tokens = tracing::field::Empty,
        )
    };
    (debug, $name:expr, $user_id:expr, $tenant_id:expr) => {
        tracing::debug_span!(
            $name,
            user_id = %$user_id,
            tenant_id = %$tenant_id,
            iterations = tracing::field::Empty,
            total_tokens = tracing::field::Empty,
        )
    };
}
