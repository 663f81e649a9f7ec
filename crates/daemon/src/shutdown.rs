// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful Shutdown Coordinator: nine steps, strictly
//! ordered, each carved out of whatever remains of the caller's deadline.
//! A step's own error never aborts the sequence — every later step still
//! runs, and the failures are aggregated into one [`ShutdownReport`].
//!
//! Step 5 ("shut down the conversation subsystem if enabled") and step 9
//! ("shut down telemetry exporters") are no-ops in this workspace: the
//! conversation subsystem is an optional external collaborator out of
//! scope, and no OTEL exporter is wired up yet (`enable_otel`
//! is plumbed through [`crate::config::Config`] but nothing consumes it).
//! Both steps stay in the sequence so the ordering contract is visible and
//! so a future exporter only has to fill in step 9's body.

use crate::job::JobManager;
use crate::session::SessionManager;
use crate::transport::Transport;
use ck_core::{Clock, ErrorKind, SystemClock, TaggedError};
use ck_engine::Telemetry;
use ck_store::KvStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{info, warn};

const JOB_DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Aggregated result of a [`ShutdownCoordinator::shutdown`] run.
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    pub errors: Vec<TaggedError>,
}

impl ShutdownReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Surfaces the aggregate as a single error for callers that want a
    /// `Result`-shaped outcome; `None` when every step succeeded.
    pub fn into_result(self) -> Result<(), ShutdownError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ShutdownError { count: self.errors.len(), first: Box::new(self.errors[0].clone()) })
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("shutdown failed in {count} step(s), first cause: {first}")]
pub struct ShutdownError {
    pub count: usize,
    pub first: Box<TaggedError>,
}

pub struct ShutdownCoordinator<C: Clock = SystemClock> {
    transport: Arc<dyn Transport>,
    store: Arc<dyn KvStore>,
    sessions: Arc<SessionManager<C>>,
    jobs: Arc<JobManager<C>>,
    telemetry: Arc<Telemetry<C>>,
    once: OnceCell<ShutdownReport>,
}

impl<C: Clock> ShutdownCoordinator<C> {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn KvStore>,
        sessions: Arc<SessionManager<C>>,
        jobs: Arc<JobManager<C>>,
        telemetry: Arc<Telemetry<C>>,
    ) -> Self {
        Self { transport, store, sessions, jobs, telemetry, once: OnceCell::new() }
    }

    /// Runs the shutdown sequence exactly once, however many times (or
    /// from however many concurrent callers) `shutdown` is invoked — an
    /// [`OnceCell`] stands in for the "protecting flag under a mutex"
    /// idiom. Later calls simply await the first call's (already-computed)
    /// report.
    pub async fn shutdown(&self, deadline: Duration) -> ShutdownReport {
        self.once.get_or_init(|| self.run(deadline)).await.clone()
    }

    pub fn already_shutdown(&self) -> bool {
        self.once.initialized()
    }

    async fn run(&self, deadline: Duration) -> ShutdownReport {
        let start = Instant::now();
        let mut errors = Vec::new();

        let mut push = |step: u32, name: &'static str, outcome: Option<TaggedError>| {
            if let Some(e) = outcome {
                warn!(step, name, error = %e, "shutdown step failed");
                errors.push(e);
            } else {
                info!(step, name, "shutdown step completed");
            }
        };

        push(1, "stop_accepting", run_step(start, deadline, 9, "stop_accepting", || self.step_stop_accepting()).await);
        push(2, "drain_jobs", run_step(start, deadline, 8, "drain_jobs", || self.step_drain_jobs()).await);
        push(3, "persist_sessions", run_step(start, deadline, 7, "persist_sessions", || self.step_persist_sessions()).await);
        push(4, "export_telemetry", run_step(start, deadline, 6, "export_telemetry", || self.step_export_telemetry()).await);
        push(5, "conversation_subsystem", run_step(start, deadline, 5, "conversation_subsystem", || self.step_noop()).await);
        push(6, "stop_job_manager", run_step(start, deadline, 4, "stop_job_manager", || self.step_stop_job_manager()).await);
        push(7, "stop_session_manager", run_step(start, deadline, 3, "stop_session_manager", || self.step_stop_session_manager()).await);
        push(8, "stop_transport", run_step(start, deadline, 2, "stop_transport", || self.step_stop_transport()).await);
        push(9, "stop_telemetry_exporters", run_step(start, deadline, 1, "stop_telemetry_exporters", || self.step_noop()).await);

        ShutdownReport { errors }
    }

    async fn step_stop_accepting(&self) -> Result<(), TaggedError> {
        self.transport.stop().await;
        Ok(())
    }

    async fn step_drain_jobs(&self) -> Result<(), TaggedError> {
        loop {
            let stats = self.jobs.stats().await?;
            if stats.pending + stats.running == 0 {
                return Ok(());
            }
            tokio::time::sleep(JOB_DRAIN_POLL_INTERVAL).await;
        }
    }

    async fn step_persist_sessions(&self) -> Result<(), TaggedError> {
        self.store.flush().await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))
    }

    async fn step_export_telemetry(&self) -> Result<(), TaggedError> {
        let snapshot = self.telemetry.export_metrics();
        info!(tool_count = snapshot.len(), "final telemetry snapshot exported");
        Ok(())
    }

    async fn step_stop_job_manager(&self) -> Result<(), TaggedError> {
        self.jobs.stop().await
    }

    async fn step_stop_session_manager(&self) -> Result<(), TaggedError> {
        self.sessions.garbage_collect().await?;
        self.sessions.stop().await
    }

    async fn step_stop_transport(&self) -> Result<(), TaggedError> {
        self.transport.stop().await; // idempotent; already stopped in step 1
        Ok(())
    }

    async fn step_noop(&self) -> Result<(), TaggedError> {
        Ok(())
    }
}

/// Runs `f` under a sub-deadline carved out of whatever remains of the
/// outer `deadline`, split evenly across the steps that haven't run yet
/// (`remaining_after_this_one` includes the step about to run).
async fn run_step<F, Fut>(start: Instant, deadline: Duration, remaining_after_this_one: u32, name: &'static str, f: F) -> Option<TaggedError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), TaggedError>>,
{
    let elapsed = start.elapsed();
    let remaining_budget = deadline.saturating_sub(elapsed);
    let budget = remaining_budget / remaining_after_this_one.max(1);
    match tokio::time::timeout(budget, f()).await {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(_) => Some(TaggedError::new(ErrorKind::Timeout, format!("shutdown step {name:?} exceeded its budget")).with_stage(name)),
    }
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
