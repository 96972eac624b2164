// ABOUTME: Default system instructions for chat requests, loaded at compile time
// ABOUTME: Conversation and assistant settings append to these, they never replace them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # System Prompts
//!
//! Prompts live in markdown files next to this module so they can be edited
//! without touching code.

/// Default instructions sent with every vendor call
pub const BLUEPRINT_SYSTEM_PROMPT: &str = include_str!("blueprint_system.md");

/// Get the default instructions
#[must_use]
pub const fn default_instructions() -> &'static str {
    BLUEPRINT_SYSTEM_PROMPT
}

/// Join the default instructions with any number of optional additions
///
/// Empty or whitespace-only additions are skipped.
#[must_use]
pub fn compose_instructions<'a, I>(additions: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut instructions = default_instructions().trim_end().to_owned();
    for addition in additions.into_iter().flatten() {
        let addition = addition.trim();
        if !addition.is_empty() {
            instructions.push_str("\n\n");
            instructions.push_str(addition);
        }
    }
    instructions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_skips_blank_additions() {
        let composed = compose_instructions([Some("Answer in French."), None, Some("  ")]);
        assert!(composed.starts_with("You are the Blueprint assistant"));
        assert!(composed.ends_with("\n\nAnswer in French."));
    }
}
