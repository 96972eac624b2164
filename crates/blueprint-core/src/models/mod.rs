// ABOUTME: Core data models shared between the API crate and its collaborators
// ABOUTME: Re-exports tenant identifiers and the request-scoped chat context

//! Shared data models

mod chat_context;
mod tenant;

pub use chat_context::{ChatContext, ResourceGroupType};
pub use tenant::TenantId;
