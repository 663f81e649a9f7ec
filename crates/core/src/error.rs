// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy.
//!
//! Every error that can escape the middleware chain carries a [`ErrorKind`]
//! so the orchestrator can decide retryability and the wire layer can map
//! to a stable numeric code without string matching.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kind taxonomy. Stable, never renamed — the wire protocol exposes
/// these as lowercase strings in `error.data.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    QuotaExceeded,
    BreakerOpen,
    Timeout,
    Transient,
    Fatal,
    Internal,
}

impl ErrorKind {
    /// Whether the orchestrator may retry a call that failed with this kind.
    /// `BreakerOpen` is never retried — it is the breaker's own output, not
    /// a candidate for one of its retries.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Transient)
    }

    /// Whether this kind should be recorded as a breaker failure.
    /// Validation and quota errors bypass the breaker; breaker-open errors
    /// are its output, not an input.
    pub fn counts_as_breaker_failure(self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Transient | ErrorKind::Internal | ErrorKind::Fatal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid-argument",
            ErrorKind::NotFound => "not-found",
            ErrorKind::QuotaExceeded => "quota-exceeded",
            ErrorKind::BreakerOpen => "breaker-open",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transient => "transient",
            ErrorKind::Fatal => "fatal",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error enriched with the context the wire layer and operators need:
/// which tool was involved, what stage it failed at, which session, and
/// the correlation id threaded through logs/metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl TaggedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tool: None,
            stage: None,
            session_id: None,
            correlation_id: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QuotaExceeded, message)
    }
}

impl fmt::Display for TaggedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for TaggedError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
