// ABOUTME: Request-scoped chat context threaded from HTTP handlers into tool implementations
// ABOUTME: Carries identity plus the project/template scope that anchors semantic search
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TenantId;

/// Scope that anchors semantic search and project-info lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResourceGroupType {
    /// A tenant's own project
    #[default]
    Project,
    /// A tenant-private template
    Template,
    /// A template shared with every tenant
    CommunityTemplate,
}

impl ResourceGroupType {
    /// Column value stored in the relational store
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Template => "template",
            Self::CommunityTemplate => "community_template",
        }
    }
}

impl fmt::Display for ResourceGroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceGroupType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Self::Project),
            "template" => Ok(Self::Template),
            "community_template" => Ok(Self::CommunityTemplate),
            other => Err(format!("unknown resource group type: {other}")),
        }
    }
}

/// Identity and resource scope for one chat request.
///
/// Built once per HTTP request and never persisted. Tools receive it by
/// reference so every query they issue stays tenant-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    /// Authenticated user
    pub user_id: Uuid,
    /// Tenant of the authenticated user
    pub tenant_id: TenantId,
    /// Conversation the turn belongs to; `None` for quick chat
    pub conversation_id: Option<Uuid>,
    /// Kind of resource group the chat is anchored to
    pub resource_group_type: ResourceGroupType,
    /// Resource group ID, when the chat is anchored to one
    pub resource_group_id: Option<Uuid>,
    /// Optional resource type inside the group (e.g. `diagram`)
    pub resource_type: Option<String>,
    /// Optional resource ID inside the group
    pub resource_id: Option<Uuid>,
}

impl ChatContext {
    /// Create a context with identity only
    #[must_use]
    pub const fn new(user_id: Uuid, tenant_id: TenantId) -> Self {
        Self {
            user_id,
            tenant_id,
            conversation_id: None,
            resource_group_type: ResourceGroupType::Project,
            resource_group_id: None,
            resource_type: None,
            resource_id: None,
        }
    }

    /// Bind the context to a conversation
    #[must_use]
    pub const fn with_conversation(mut self, conversation_id: Uuid) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Anchor the context to a resource group
    #[must_use]
    pub const fn with_resource_group(
        mut self,
        group_type: ResourceGroupType,
        group_id: Option<Uuid>,
    ) -> Self {
        self.resource_group_type = group_type;
        self.resource_group_id = group_id;
        self
    }

    /// Point the context at a specific resource inside the group
    #[must_use]
    pub fn with_resource(mut self, resource_type: Option<String>, resource_id: Option<Uuid>) -> Self {
        self.resource_type = resource_type;
        self.resource_id = resource_id;
        self
    }

    /// Whether the chat has a concrete project/template scope
    #[must_use]
    pub const fn has_resource_group(&self) -> bool {
        self.resource_group_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_group_type_round_trips_column_value() {
        for kind in [
            ResourceGroupType::Project,
            ResourceGroupType::Template,
            ResourceGroupType::CommunityTemplate,
        ] {
            assert_eq!(kind.as_str().parse::<ResourceGroupType>(), Ok(kind));
        }
        assert!("workspace".parse::<ResourceGroupType>().is_err());
    }

    #[test]
    fn test_context_builder() {
        let group = Uuid::new_v4();
        let ctx = ChatContext::new(Uuid::new_v4(), TenantId::new())
            .with_resource_group(ResourceGroupType::Template, Some(group));
        assert!(ctx.has_resource_group());
        assert_eq!(ctx.resource_group_id, Some(group));
        assert!(ctx.conversation_id.is_none());
    }
}
