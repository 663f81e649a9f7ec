// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool Orchestrator: registry lookup → breaker gate →
//! middleware-wrapped call → breaker feedback, with bounded exponential
//! backoff retry for kinds the breaker didn't just reject.

use crate::breaker_registry::BreakerRegistry;
use crate::context::ExecutionContext;
use crate::middleware::MiddlewareChain;
use crate::registry::ToolRegistry;
use crate::tool::{ToolArgs, ToolResult};
use ck_core::{Clock, ErrorKind, SystemClock, TaggedError};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_RETRY_BUDGET: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

pub struct ToolOrchestrator<C: Clock = SystemClock> {
    registry: Arc<ToolRegistry>,
    breakers: Arc<BreakerRegistry<C>>,
    middleware: Arc<MiddlewareChain<C>>,
    retry_budget: u32,
}

impl<C: Clock> ToolOrchestrator<C> {
    pub fn new(registry: Arc<ToolRegistry>, breakers: Arc<BreakerRegistry<C>>, middleware: Arc<MiddlewareChain<C>>) -> Self {
        Self { registry, breakers, middleware, retry_budget: DEFAULT_RETRY_BUDGET }
    }

    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    pub async fn execute(&self, mut ctx: ExecutionContext, name: &str, args: ToolArgs) -> ToolResult {
        let Some(tool) = self.registry.lookup(name) else {
            return Err(TaggedError::not_found(format!("tool {name} not found")).with_tool(name));
        };
        if ctx.correlation_id.is_empty() {
            ctx.correlation_id = format!("corr-{}", nanoid::nanoid!(12));
        }

        let breaker = self.breakers.get_or_create(name);
        let mut attempt = 0u32;
        loop {
            if !breaker.allow() {
                return Err(TaggedError::new(ErrorKind::BreakerOpen, format!("breaker open for {name}"))
                    .with_tool(name)
                    .with_correlation(ctx.correlation_id.clone()));
            }

            let result = self.middleware.run(tool.clone(), ctx.clone(), args.clone()).await;

            match &result {
                Ok(_) => {
                    breaker.record_success();
                    return result;
                }
                Err(err) => {
                    if err.kind.counts_as_breaker_failure() {
                        breaker.record_failure();
                    }
                    let retryable = err.kind.is_retryable() && attempt < self.retry_budget;
                    if !retryable {
                        return result;
                    }
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
