// ABOUTME: TenantId newtype used to scope every query to a customer organization
// ABOUTME: Stored as TEXT in the relational store, parsed from JWT claims
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer organization that owns conversations, projects, documents and credentials
///
/// Every store query takes one of these; a bare `Uuid` never reaches a
/// tenant-scoped `WHERE` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Fresh tenant, used when provisioning and in tests
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Column value for `tenant_id TEXT` bindings
    #[must_use]
    pub fn to_column(self) -> String {
        self.0.to_string()
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TenantId {
    type Err = uuid::Error;

    /// Parse the `tenant_id` claim or column; surrounding whitespace is rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
