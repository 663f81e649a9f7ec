// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ck_core::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::RequestId;

/// Numeric error codes. Application errors all carry
/// `-32000` and disambiguate via `data.kind`.
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;
pub const CODE_INVALID_PARAMS: i64 = -32602;
pub const CODE_APPLICATION_ERROR: i64 = -32000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub kind: String,
    pub correlation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorData>,
}

impl ResponseError {
    pub fn method_not_found(method: &str) -> Self {
        Self { code: CODE_METHOD_NOT_FOUND, message: format!("method not found: {method}"), data: None }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self { code: CODE_INVALID_PARAMS, message: message.into(), data: None }
    }

    pub fn application(kind: ErrorKind, message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            code: CODE_APPLICATION_ERROR,
            message: message.into(),
            data: Some(ErrorData { kind: kind.as_str().to_string(), correlation_id: correlation_id.into() }),
        }
    }
}

/// Wire response: `{id, result}` or `{id, error}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    pub fn ok(id: RequestId, result: Value) -> Self {
        Self { id, result: Some(result), error: None }
    }

    pub fn err(id: RequestId, error: ResponseError) -> Self {
        Self { id, result: None, error: Some(error) }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
