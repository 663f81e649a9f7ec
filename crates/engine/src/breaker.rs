// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-tool circuit breaker, one lock per breaker guarding
//! both the state word and the counters. Standard closed/open/half-open
//! state machine for fault-tolerant external calls, exposed as a split
//! `allow`/`record_success`/`record_failure` contract the orchestrator
//! drives directly instead of a closure-wrapping `execute`.

use ck_core::{Clock, SystemClock};
use parking_lot::Mutex;
use std::time::Duration;

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    last_failure_ms: Option<u64>,
    /// Set while a half-open probe is outstanding so a second `allow()`
    /// can't grant a concurrent probe.
    probe_in_flight: bool,
}

/// Circuit breaker for a single tool, generic over the clock so tests can
/// drive the reset timeout without sleeping (`Clock` is `Clone`-bound and
/// therefore not object-safe, hence the type parameter rather than a
/// trait object).
pub struct CircuitBreaker<C: Clock = SystemClock> {
    clock: C,
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<Inner>,
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn new(clock: C, failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            clock,
            failure_threshold,
            reset_timeout,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                last_failure_ms: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn with_defaults(clock: C) -> Self {
        Self::new(clock, DEFAULT_FAILURE_THRESHOLD, DEFAULT_RESET_TIMEOUT)
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    /// The pre-call gate. Atomically grants the single outstanding
    /// half-open probe when the reset timeout has elapsed.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => false,
            BreakerState::Open => {
                let elapsed_ok = inner
                    .last_failure_ms
                    .map(|last| self.clock.epoch_ms().saturating_sub(last) >= self.reset_timeout.as_millis() as u64)
                    .unwrap_or(true);
                if !elapsed_ok {
                    return false;
                }
                inner.state = BreakerState::HalfOpen;
                inner.probe_in_flight = true;
                true
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        inner.probe_in_flight = false;
        inner.state = BreakerState::Closed;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.probe_in_flight = false;
        inner.consecutive_failures += 1;
        inner.last_failure_ms = Some(self.clock.epoch_ms());
        if inner.state == BreakerState::HalfOpen || inner.consecutive_failures >= self.failure_threshold {
            inner.state = BreakerState::Open;
        }
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
