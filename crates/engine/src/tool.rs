// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Tool` contract: a name bound to a validator and an
//! executor, decoding its own untyped argument map at the boundary.

use crate::context::ExecutionContext;
use async_trait::async_trait;
use ck_core::TaggedError;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub version: String,
    pub category: String,
}

impl ToolMetadata {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        version: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: version.into(),
            category: category.into(),
        }
    }
}

pub type ToolArgs = Map<String, Value>;
pub type ToolResult = Result<Value, TaggedError>;

/// A tool implementation. `args` is an untyped map at the boundary; tools
/// decode it internally. `validate` defaults to a no-op so
/// tools without bespoke validation don't need to implement it.
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;

    /// Inline JSON Schema advertised over `tools/list`. The
    /// default covers every built-in tool, which all take a `session_id`
    /// string; tools with a richer argument shape may override it.
    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "session_id": { "type": "string" } },
            "additionalProperties": true,
        })
    }

    async fn validate(&self, _args: &ToolArgs) -> Result<(), TaggedError> {
        Ok(())
    }

    async fn execute(&self, ctx: &ExecutionContext, args: ToolArgs) -> ToolResult;
}
