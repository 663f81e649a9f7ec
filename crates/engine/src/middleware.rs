// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Middleware chain: a fixed, observable order wrapping
//! every tool call — Recovery, Context, Timeout, Logging, Validation,
//! Error handling, Metrics, outermost first. Recovery and Timeout are
//! collapsed into one `tokio::spawn` + `timeout` step: spawning the call
//! gives a `JoinError` on panic for free, which doubles as the recovery
//! boundary without pulling in a catch-unwind-on-futures crate the
//! corpus doesn't otherwise use.

use crate::context::ExecutionContext;
use crate::telemetry::{Telemetry, TelemetryEvent};
use crate::tool::{Tool, ToolArgs, ToolResult};
use ck_core::{Clock, ErrorKind, SystemClock, TaggedError};
use std::sync::Arc;
use std::time::Instant;

/// The fixed middleware order, outermost first. Exposed so tests (and the
/// implementer) can assert it never silently reorders.
pub const MIDDLEWARE_ORDER: &[&str] =
    &["recovery", "context", "timeout", "logging", "validation", "error_handling", "metrics"];

pub struct MiddlewareChain<C: Clock = SystemClock> {
    telemetry: Arc<Telemetry<C>>,
}

impl<C: Clock> MiddlewareChain<C> {
    pub fn new(telemetry: Arc<Telemetry<C>>) -> Self {
        Self { telemetry }
    }

    pub async fn run(&self, tool: Arc<dyn Tool>, mut ctx: ExecutionContext, args: ToolArgs) -> ToolResult {
        enrich_context_from_args(&mut ctx, &args);

        tracing::info!(tool = %ctx.tool_name, correlation_id = %ctx.correlation_id, "tool call started");
        self.telemetry.publish(TelemetryEvent::Started {
            tool: ctx.tool_name.clone(),
            session_id: ctx.session_id.clone(),
            correlation_id: ctx.correlation_id.clone(),
        });

        let start = Instant::now();
        let result = recovery_and_timeout(tool.clone(), ctx.clone(), args).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let outcome_success = result.is_ok();
        match &result {
            Ok(_) => tracing::info!(tool = %ctx.tool_name, duration_ms, "tool call completed"),
            Err(e) => tracing::error!(tool = %ctx.tool_name, duration_ms, kind = %e.kind, "tool call failed"),
        }

        let enriched = result.map_err(|e| enrich_error(e, &ctx));

        self.telemetry.record_duration(&ctx.tool_name, duration_ms, outcome_success);
        self.telemetry.publish(match &enriched {
            Ok(_) => TelemetryEvent::Completed {
                tool: ctx.tool_name.clone(),
                session_id: ctx.session_id.clone(),
                correlation_id: ctx.correlation_id.clone(),
                duration_ms,
            },
            Err(e) => TelemetryEvent::Failed {
                tool: ctx.tool_name.clone(),
                session_id: ctx.session_id.clone(),
                correlation_id: ctx.correlation_id.clone(),
                duration_ms,
                kind: e.kind.as_str().to_string(),
            },
        });

        enriched
    }
}

fn enrich_context_from_args(ctx: &mut ExecutionContext, args: &ToolArgs) {
    if ctx.session_id.is_none() {
        if let Some(sid) = args.get("session_id").and_then(|v| v.as_str()) {
            if !sid.is_empty() {
                ctx.session_id = Some(sid.to_string());
            }
        }
    }
    if let Some(dry_run) = args.get("dry_run").and_then(|v| v.as_bool()) {
        ctx.dry_run = dry_run;
    }
}

fn enrich_error(mut err: TaggedError, ctx: &ExecutionContext) -> TaggedError {
    if err.tool.is_none() {
        err = err.with_tool(ctx.tool_name.clone());
    }
    if err.session_id.is_none() {
        if let Some(sid) = &ctx.session_id {
            err = err.with_session(sid.clone());
        }
    }
    if err.correlation_id.is_none() {
        err = err.with_correlation(ctx.correlation_id.clone());
    }
    err
}

/// Validation and execution both run inside the same spawn+timeout
/// boundary, so a pathologically expensive `validate()` is bounded by the
/// same deadline as `execute()` and a panic in either is caught by the
/// `JoinError` the spawn produces.
async fn recovery_and_timeout(tool: Arc<dyn Tool>, ctx: ExecutionContext, args: ToolArgs) -> ToolResult {
    let timeout = ctx.timeout;
    let handle = tokio::spawn(async move {
        tool.validate(&args).await?;
        tool.execute(&ctx, args).await
    });
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(tool_result)) => tool_result,
        Ok(Err(join_err)) => Err(TaggedError::new(ErrorKind::Fatal, format!("tool panicked: {join_err}"))),
        Err(_elapsed) => Err(TaggedError::new(ErrorKind::Timeout, "tool call exceeded its deadline")),
    }
}

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;
