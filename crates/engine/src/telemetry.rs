// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry: per-tool counters and a rolling p95 latency
//! window, plus an optional bounded event bus. The bus uses `try_send` on
//! a bounded `mpsc` channel so overflow naturally drops the newest event
//! (the one being sent) rather than evicting an older, already-queued one
//! — `tokio::sync::broadcast`'s lagged-receiver semantics would instead
//! drop the oldest, which is the wrong direction for this policy.

use ck_core::{Clock, SystemClock};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const ROLLING_WINDOW: usize = 100;
const EVENT_BUS_CAPACITY: usize = 1024;
const OVERFLOW_WARN_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    Started { tool: String, session_id: Option<String>, correlation_id: String },
    Completed { tool: String, session_id: Option<String>, correlation_id: String, duration_ms: u64 },
    Failed { tool: String, session_id: Option<String>, correlation_id: String, duration_ms: u64, kind: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolStats {
    pub total: u64,
    pub success: u64,
    pub failure: u64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub last_request_ms: Option<u64>,
}

#[derive(Default)]
struct ToolRecord {
    total: u64,
    success: u64,
    failure: u64,
    latencies_ms: VecDeque<u64>,
    sum_latency_ms: u64,
    last_request_ms: Option<u64>,
}

impl ToolRecord {
    fn record(&mut self, duration_ms: u64, outcome_success: bool, now_ms: u64) {
        self.total += 1;
        if outcome_success {
            self.success += 1;
        } else {
            self.failure += 1;
        }
        self.last_request_ms = Some(now_ms);
        self.sum_latency_ms += duration_ms;
        if self.latencies_ms.len() == ROLLING_WINDOW {
            self.latencies_ms.pop_front();
        }
        self.latencies_ms.push_back(duration_ms);
    }

    fn stats(&self) -> ToolStats {
        let mut sorted: Vec<u64> = self.latencies_ms.iter().copied().collect();
        sorted.sort_unstable();
        let p95 = if sorted.is_empty() {
            0.0
        } else {
            let idx = ((sorted.len() as f64) * 0.95).ceil() as usize;
            let idx = idx.saturating_sub(1).min(sorted.len() - 1);
            sorted[idx] as f64
        };
        let avg = if self.total == 0 { 0.0 } else { self.sum_latency_ms as f64 / self.total as f64 };
        ToolStats {
            total: self.total,
            success: self.success,
            failure: self.failure,
            avg_latency_ms: avg,
            p95_latency_ms: p95,
            last_request_ms: self.last_request_ms,
        }
    }
}

pub struct Telemetry<C: Clock = SystemClock> {
    clock: C,
    records: Mutex<HashMap<String, ToolRecord>>,
    bus_tx: Option<mpsc::Sender<TelemetryEvent>>,
    last_overflow_warn_ms: AtomicU64,
}

impl<C: Clock> Telemetry<C> {
    pub fn new(clock: C) -> (Self, Option<mpsc::Receiver<TelemetryEvent>>) {
        let (tx, rx) = mpsc::channel(EVENT_BUS_CAPACITY);
        (
            Self {
                clock,
                records: Mutex::new(HashMap::new()),
                bus_tx: Some(tx),
                last_overflow_warn_ms: AtomicU64::new(0),
            },
            Some(rx),
        )
    }

    pub fn without_bus(clock: C) -> Self {
        Self {
            clock,
            records: Mutex::new(HashMap::new()),
            bus_tx: None,
            last_overflow_warn_ms: AtomicU64::new(0),
        }
    }

    pub fn record_duration(&self, tool: &str, duration_ms: u64, outcome_success: bool) {
        let now = self.clock.epoch_ms();
        let mut records = self.records.lock();
        records.entry(tool.to_string()).or_default().record(duration_ms, outcome_success, now);
    }

    pub fn stats(&self, tool: &str) -> Option<ToolStats> {
        self.records.lock().get(tool).map(ToolRecord::stats)
    }

    /// Exportable snapshot across every tool that has seen traffic.
    pub fn export_metrics(&self) -> HashMap<String, ToolStats> {
        self.records.lock().iter().map(|(name, record)| (name.clone(), record.stats())).collect()
    }

    pub fn publish(&self, event: TelemetryEvent) {
        let Some(tx) = &self.bus_tx else { return };
        if tx.try_send(event).is_err() {
            let now = self.clock.epoch_ms();
            let last = self.last_overflow_warn_ms.load(Ordering::Relaxed);
            if now.saturating_sub(last) >= OVERFLOW_WARN_INTERVAL.as_millis() as u64 {
                self.last_overflow_warn_ms.store(now, Ordering::Relaxed);
                tracing::warn!("telemetry event bus overflow, dropping newest event");
            }
        }
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
