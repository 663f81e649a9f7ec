// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tools/list` schema surface: inline JSON Schema objects
//! subject to hard constraints so every tool stays self-describing and
//! small enough to ship in one response.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const MAX_SCHEMA_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema root must have type \"object\"")]
    RootNotObject,
    #[error("schema must not contain \"$ref\"")]
    ContainsRef,
    #[error("schema must not contain \"definitions\"")]
    ContainsDefinitions,
    #[error("schema serializes to {actual} bytes, exceeding the {MAX_SCHEMA_BYTES} byte limit")]
    TooLarge { actual: usize },
    #[error("array property {0:?} is missing \"items\"")]
    ArrayMissingItems(String),
}

/// Validate a tool's `inputSchema` against the hard constraints of this
/// wire protocol: root `type == "object"`, no `$ref`/`definitions`, size
/// ceiling, and every array-typed property declares `items`.
pub fn validate_input_schema(schema: &Value) -> Result<(), SchemaError> {
    let obj = schema.as_object().ok_or(SchemaError::RootNotObject)?;
    if obj.get("type").and_then(Value::as_str) != Some("object") {
        return Err(SchemaError::RootNotObject);
    }
    if contains_key(schema, "$ref") {
        return Err(SchemaError::ContainsRef);
    }
    if contains_key(schema, "definitions") {
        return Err(SchemaError::ContainsDefinitions);
    }
    if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        for (name, prop) in props {
            if prop.get("type").and_then(Value::as_str) == Some("array") && prop.get("items").is_none() {
                return Err(SchemaError::ArrayMissingItems(name.clone()));
            }
        }
    }
    let serialized = serde_json::to_vec(schema).unwrap_or_default();
    if serialized.len() > MAX_SCHEMA_BYTES {
        return Err(SchemaError::TooLarge { actual: serialized.len() });
    }
    Ok(())
}

fn contains_key(value: &Value, key: &str) -> bool {
    match value {
        Value::Object(map) => map.contains_key(key) || map.values().any(|v| contains_key(v, key)),
        Value::Array(items) => items.iter().any(|v| contains_key(v, key)),
        _ => false,
    }
}

/// Validate a full `ToolDescriptor`, including its schema.
pub fn validate_descriptor(descriptor: &ToolDescriptor) -> Result<(), SchemaError> {
    validate_input_schema(&descriptor.input_schema)
}

#[cfg(test)]
#[path = "tool_schema_tests.rs"]
mod tests;
