// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job Manager: the async job queue, worker pool, and TTL
//! reaper. Workers share one `mpsc::Receiver` behind a `tokio::sync::Mutex`
//! (the standard "one consumer side, many tasks" idiom for a bounded
//! `tokio::mpsc` pool — the channel itself already serializes handoff, the
//! outer mutex just lets `N` tasks take turns owning the receive end).

use crate::locks::StripeLocks;
use async_trait::async_trait;
use ck_core::{Clock, ErrorKind, Job, JobId, JobStats, JobStatus, SessionId, SystemClock, TaggedError};
use ck_store::{delete_job, get_job, list_jobs, put_job, KvStore};
use parking_lot::Mutex as SyncMutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A job kind's concrete executor, resolved by `Job::kind`. Implementations must be safe for concurrent
/// execution across distinct job ids.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(
        &self,
        job_id: &JobId,
        session_id: Option<&SessionId>,
        input: Value,
        cancel: CancellationToken,
    ) -> Result<Value, TaggedError>;
}

pub struct JobManager<C: Clock = SystemClock> {
    store: Arc<dyn KvStore>,
    clock: C,
    locks: StripeLocks,
    executors: HashMap<String, Arc<dyn JobExecutor>>,
    queue_tx: mpsc::Sender<JobId>,
    queue_rx: Arc<AsyncMutex<mpsc::Receiver<JobId>>>,
    max_workers: usize,
    job_ttl: Duration,
    cancel: CancellationToken,
    worker_handles: SyncMutex<Vec<JoinHandle<()>>>,
    reaper_handle: SyncMutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl<C: Clock + 'static> JobManager<C> {
    pub fn new(
        store: Arc<dyn KvStore>,
        clock: C,
        executors: HashMap<String, Arc<dyn JobExecutor>>,
        max_workers: usize,
        queue_capacity: usize,
        job_ttl: Duration,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity.max(1));
        Self {
            store,
            clock,
            locks: StripeLocks::new(),
            executors,
            queue_tx,
            queue_rx: Arc::new(AsyncMutex::new(queue_rx)),
            max_workers: max_workers.max(1),
            job_ttl,
            cancel: CancellationToken::new(),
            worker_handles: SyncMutex::new(Vec::new()),
            reaper_handle: SyncMutex::new(None),
        }
    }

    /// `Create`: persists a fresh pending job and enqueues
    /// it. The taxonomy has no dedicated "busy" kind, so a full queue is reported as `Transient` — it is, by
    /// construction, a condition that resolves once a worker frees up, the
    /// same shape as the other `Transient` cases the orchestrator retries.
    pub async fn create(&self, kind: impl Into<String>, session_id: Option<SessionId>, input: Value) -> Result<JobId, TaggedError> {
        let job = Job::new(JobId::new(), kind, session_id, input, self.clock.epoch_ms());
        let job_id = job.id;
        put_job(self.store.as_ref(), &job).await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;

        if self.queue_tx.try_send(job_id).is_err() {
            delete_job(self.store.as_ref(), &job_id).await.ok();
            return Err(TaggedError::new(ErrorKind::Transient, "job queue is full"));
        }
        Ok(job_id)
    }

    pub async fn get(&self, id: &JobId) -> Result<Job, TaggedError> {
        let _guard = self.locks.lock(id.as_str()).await;
        get_job(self.store.as_ref(), id)
            .await
            .map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?
            .ok_or_else(|| TaggedError::not_found(format!("job {id} not found")))
    }

    pub async fn update<F>(&self, id: &JobId, mutator: F) -> Result<Job, TaggedError>
    where
        F: FnOnce(&mut Job, u64) -> Result<(), TaggedError>,
    {
        let _guard = self.locks.lock(id.as_str()).await;
        let mut job = get_job(self.store.as_ref(), id)
            .await
            .map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?
            .ok_or_else(|| TaggedError::not_found(format!("job {id} not found")))?;

        mutator(&mut job, self.clock.epoch_ms())?;
        put_job(self.store.as_ref(), &job).await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
        Ok(job)
    }

    pub async fn list(&self, session_id: Option<&SessionId>) -> Result<Vec<Job>, TaggedError> {
        let jobs = list_jobs(self.store.as_ref()).await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
        Ok(match session_id {
            Some(sid) => jobs.into_iter().filter(|j| j.session_id.as_ref() == Some(sid)).collect(),
            None => jobs,
        })
    }

    pub async fn stats(&self) -> Result<JobStats, TaggedError> {
        let jobs = list_jobs(self.store.as_ref()).await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
        let mut stats = JobStats::default();
        for job in jobs {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Canceled => stats.canceled += 1,
            }
        }
        Ok(stats)
    }

    /// `Start`: spins `max_workers` workers reading from
    /// the bounded queue.
    pub fn start(self: &Arc<Self>) {
        let mut handles = self.worker_handles.lock();
        for worker_id in 0..self.max_workers {
            let manager = Arc::clone(self);
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(async move { manager.worker_loop(worker_id, cancel).await }));
        }
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize, cancel: CancellationToken) {
        loop {
            let job_id = {
                let mut rx = self.queue_rx.lock().await;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    maybe = rx.recv() => maybe,
                }
            };
            let Some(job_id) = job_id else { break };
            self.process_job(job_id, worker_id).await;
        }
    }

    async fn process_job(&self, job_id: JobId, worker_id: usize) {
        let job = match self.update(&job_id, |job, now| job.transition(JobStatus::Running, now).map_err(Into::into)).await {
            Ok(job) => job,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "could not mark job running");
                return;
            }
        };

        let Some(executor) = self.executors.get(&job.kind).cloned() else {
            let _ = self
                .update(&job_id, |job, now| {
                    job.error = Some(format!("no executor registered for kind {:?}", job.kind));
                    job.transition(JobStatus::Failed, now).map_err(Into::into)
                })
                .await;
            return;
        };

        info!(job_id = %job_id, worker_id, kind = %job.kind, "job started");
        let result = executor.execute(&job_id, job.session_id.as_ref(), job.input.clone(), self.cancel.clone()).await;
        let canceled = self.cancel.is_cancelled();

        let update_result = match result {
            Ok(output) => {
                self.update(&job_id, move |job, now| {
                    job.output = Some(output);
                    job.transition(JobStatus::Completed, now).map_err(Into::into)
                })
                .await
            }
            // An error surfacing after the worker context was canceled is the
            // executor honoring cancellation, not a real failure.
            Err(e) if canceled => {
                self.update(&job_id, move |job, now| {
                    job.error = Some(e.message);
                    job.transition(JobStatus::Canceled, now).map_err(Into::into)
                })
                .await
            }
            Err(e) => {
                self.update(&job_id, move |job, now| {
                    job.error = Some(e.message);
                    job.transition(JobStatus::Failed, now).map_err(Into::into)
                })
                .await
            }
        };
        if let Err(e) = update_result {
            warn!(job_id = %job_id, error = %e, "could not persist job terminal state");
        }
    }

    /// `Stop`: cancels the worker context cooperatively,
    /// joins the workers, then drains any jobs still pending in the store
    /// (they may never have been claimed by a worker) as canceled.
    pub async fn stop(&self) -> Result<(), TaggedError> {
        self.cancel.cancel();
        let handles = std::mem::take(&mut *self.worker_handles.lock());
        for handle in handles {
            let _ = handle.await;
        }

        let jobs = list_jobs(self.store.as_ref()).await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
        for job in jobs {
            if job.status == JobStatus::Pending {
                self.update(&job.id, |job, now| job.transition(JobStatus::Canceled, now).map_err(Into::into)).await?;
            }
        }
        Ok(())
    }

    /// Spawns the TTL reaper: removes terminal jobs older
    /// than `JobTTL`. Applies uniformly to completed/failed/canceled jobs
    ///.
    pub fn start_reaper(self: &Arc<Self>, interval: Duration) {
        if let Some((token, _)) = self.reaper_handle.lock().take() {
            token.cancel();
        }
        let token = CancellationToken::new();
        let manager = Arc::clone(self);
        let child_token = token.clone();
        let job_ttl_ms = self.job_ttl.as_millis() as u64;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = child_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = manager.reap_once(job_ttl_ms).await {
                            warn!(error = %e, "job reaper sweep failed");
                        }
                    }
                }
            }
        });
        *self.reaper_handle.lock() = Some((token, handle));
    }

    async fn reap_once(&self, job_ttl_ms: u64) -> Result<usize, TaggedError> {
        let now = self.clock.epoch_ms();
        let jobs = list_jobs(self.store.as_ref()).await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
        let mut reaped = 0;
        for job in jobs {
            if job.status.is_terminal() {
                if let Some(completed_at) = job.completed_at_ms {
                    if now.saturating_sub(completed_at) >= job_ttl_ms {
                        delete_job(self.store.as_ref(), &job.id)
                            .await
                            .map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
                        reaped += 1;
                    }
                }
            }
        }
        Ok(reaped)
    }

    pub fn stop_reaper(&self) {
        if let Some((token, _)) = self.reaper_handle.lock().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
