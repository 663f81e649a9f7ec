// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-tool breaker lookup: "the Breaker Registry uses
//! one lock per breaker plus a read lock on the registry map." Breakers
//! are created lazily on first use with the default thresholds; per-tool
//! overrides can be seeded up front via `configure`.

use crate::breaker::{CircuitBreaker, DEFAULT_FAILURE_THRESHOLD, DEFAULT_RESET_TIMEOUT};
use ck_core::{Clock, SystemClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub struct BreakerRegistry<C: Clock = SystemClock> {
    clock: C,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker<C>>>>,
    overrides: Mutex<HashMap<String, (u32, Duration)>>,
}

impl<C: Clock> BreakerRegistry<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            breakers: Mutex::new(HashMap::new()),
            overrides: Mutex::new(HashMap::new()),
        }
    }

    /// Seeds a per-tool failure threshold / reset timeout override. Must
    /// be called before the tool's breaker is first looked up.
    pub fn configure(&self, tool_name: impl Into<String>, failure_threshold: u32, reset_timeout: Duration) {
        self.overrides.lock().insert(tool_name.into(), (failure_threshold, reset_timeout));
    }

    pub fn get_or_create(&self, tool_name: &str) -> Arc<CircuitBreaker<C>> {
        if let Some(existing) = self.breakers.lock().get(tool_name) {
            return existing.clone();
        }
        let (threshold, timeout) = self
            .overrides
            .lock()
            .get(tool_name)
            .copied()
            .unwrap_or((DEFAULT_FAILURE_THRESHOLD, DEFAULT_RESET_TIMEOUT));
        let mut breakers = self.breakers.lock();
        breakers
            .entry(tool_name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.clock.clone(), threshold, timeout)))
            .clone()
    }
}

#[cfg(test)]
#[path = "breaker_registry_tests.rs"]
mod tests;
