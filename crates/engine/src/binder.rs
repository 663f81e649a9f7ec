// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Argument Binder: struct↔map conversion over tagged
//! fields without per-call reflection. The per-type field plan (tag
//! resolution, `omitempty` elision) that other languages have to derive
//! and cache at first use, `serde_json`'s `Serialize`/`Deserialize`
//! derive already generates at compile time — `#[serde(rename = ...)]`
//! is the external tag, `#[serde(skip_serializing_if = "Option::is_none")]`
//! is `omitempty`. This binder is a thin, typed front door onto that
//! machinery rather than a second cache on top of it.

use crate::tool::ToolArgs;
use ck_core::TaggedError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub struct ArgumentBinder;

impl ArgumentBinder {
    /// Encodes a typed value into an untyped argument map. Fails with
    /// *invalid-argument* if the value doesn't serialize to a JSON object
    /// (nil/non-record input).
    pub fn encode<T: Serialize>(value: &T) -> Result<ToolArgs, TaggedError> {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(Value::Null) => Err(TaggedError::invalid_argument("nil input cannot be bound to an argument map")),
            Ok(_) => Err(TaggedError::invalid_argument("non-record input cannot be bound to an argument map")),
            Err(e) => Err(TaggedError::invalid_argument(format!("encode failed: {e}"))),
        }
    }

    /// Decodes an argument map back into a typed value.
    pub fn decode<T: DeserializeOwned>(args: ToolArgs) -> Result<T, TaggedError> {
        serde_json::from_value(Value::Object(args)).map_err(|e| TaggedError::invalid_argument(format!("decode failed: {e}")))
    }
}

#[cfg(test)]
#[path = "binder_tests.rs"]
mod tests;
