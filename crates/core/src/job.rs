// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record: an asynchronous unit of tool work bound to a
//! session.

use crate::define_id;
use crate::error::TaggedError;
use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

define_id! {
    /// Fresh token per job.
    pub struct JobId("job-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled)
    }

    /// Whether `to` is a legal transition from `self`: pending → running →
    /// one terminal state only.
    fn can_transition_to(self, to: JobStatus) -> bool {
        matches!(
            (self, to),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Canceled)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Canceled)
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("illegal job status transition from {from:?} to {to:?}")]
    IllegalTransition { from: JobStatus, to: JobStatus },
    #[error("progress must be non-decreasing: {current} -> {next}")]
    ProgressRegression { current: u8, next: u8 },
}

pub const JOB_SCHEMA_VERSION: u32 = 1;

/// An asynchronous unit of tool work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub kind: String,
    pub status: JobStatus,
    pub input: serde_json::Value,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at_ms: u64,
    #[serde(default)]
    pub started_at_ms: Option<u64>,
    #[serde(default)]
    pub completed_at_ms: Option<u64>,
    #[serde(default)]
    pub progress: u8,
}

impl Job {
    pub fn new(
        id: JobId,
        kind: impl Into<String>,
        session_id: Option<SessionId>,
        input: serde_json::Value,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            schema_version: JOB_SCHEMA_VERSION,
            session_id,
            kind: kind.into(),
            status: JobStatus::Pending,
            input,
            output: None,
            error: None,
            created_at_ms: now_ms,
            started_at_ms: None,
            completed_at_ms: None,
            progress: 0,
        }
    }

    pub fn transition(&mut self, to: JobStatus, now_ms: u64) -> Result<(), JobError> {
        if self.status == to {
            return Ok(()); // idempotent re-application, e.g. double terminal write
        }
        if !self.status.can_transition_to(to) {
            return Err(JobError::IllegalTransition { from: self.status, to });
        }
        if to == JobStatus::Running {
            self.started_at_ms.get_or_insert(now_ms);
        }
        if to.is_terminal() {
            self.completed_at_ms = Some(now_ms);
        }
        self.status = to;
        Ok(())
    }

    pub fn set_progress(&mut self, progress: u8) -> Result<(), JobError> {
        let progress = progress.min(100);
        if progress < self.progress {
            return Err(JobError::ProgressRegression { current: self.progress, next: progress });
        }
        self.progress = progress;
        Ok(())
    }
}

impl From<JobError> for TaggedError {
    fn from(e: JobError) -> Self {
        TaggedError::invalid_argument(e.to_string())
    }
}

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct JobStats {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub canceled: usize,
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
